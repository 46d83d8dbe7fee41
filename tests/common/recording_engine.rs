//! Crypto engine double that records what finalization receives.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use signing_gateway::domain::document::{MimeType, SignedDocument};
use signing_gateway::domain::session::ContentTimestamp;
use signing_gateway::{CryptoEngine, EngineError, SigningSession};

#[derive(Default)]
pub struct RecordingEngine {
    pub finalize_calls: AtomicUsize,
    pub finalized_chains: Mutex<Vec<Vec<Vec<u8>>>>,
    /// Sleep inside finalization to widen race windows.
    pub finalize_delay: Option<Duration>,
}

impl RecordingEngine {
    pub fn slow(delay: Duration) -> Self {
        Self {
            finalize_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn finalize_count(&self) -> usize {
        self.finalize_calls.load(Ordering::SeqCst)
    }

    fn finalize(&self, session: &SigningSession) -> Result<SignedDocument, EngineError> {
        self.finalize_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.finalize_delay {
            std::thread::sleep(delay);
        }
        let signer = session
            .signer()
            .ok_or(EngineError::MissingInput("signer parameters"))?;
        self.finalized_chains.lock().unwrap().push(
            signer
                .certificate_chain
                .iter_der()
                .map(<[u8]>::to_vec)
                .collect(),
        );
        Ok(SignedDocument {
            bytes: b"signed".to_vec(),
            name: "recorded.bin".to_string(),
            mime_type: Some(MimeType::from_static("application/octet-stream")),
        })
    }
}

impl CryptoEngine for RecordingEngine {
    fn get_content_timestamp(
        &self,
        _session: &SigningSession,
    ) -> Result<ContentTimestamp, EngineError> {
        Ok(ContentTimestamp {
            token: b"token".to_vec(),
            generation_time: Utc::now(),
        })
    }

    fn get_data_to_sign(&self, _session: &SigningSession) -> Result<Vec<u8>, EngineError> {
        Ok(vec![0x42; 32])
    }

    fn sign_digest(&self, session: &SigningSession) -> Result<SignedDocument, EngineError> {
        self.finalize(session)
    }

    fn sign_document(&self, session: &SigningSession) -> Result<SignedDocument, EngineError> {
        self.finalize(session)
    }
}
