//! Crypto engine boundary.
//!
//! The coordinator never hashes, verifies or packages anything itself; it
//! calls a [`CryptoEngine`] at fixed transitions and receives an explicit
//! `Result` from every call.

use crate::domain::document::SignedDocument;
use crate::domain::session::{ContentTimestamp, SigningSession};

/// Failure reported by a crypto engine call.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("session is missing {0}")]
    MissingInput(&'static str),

    #[error("invalid signing certificate: {0}")]
    InvalidCertificate(String),

    #[error("signature value rejected: {0}")]
    SignatureRejected(String),

    #[error("content timestamp unavailable: {0}")]
    Timestamp(String),

    #[error("packaging failed: {0}")]
    Packaging(String),

    #[error("unsupported parameters: {0}")]
    Unsupported(String),
}

/// Cryptographic collaborator of the signing coordinator.
///
/// Every method reads the session as-is; the coordinator guarantees the
/// session is locked for the duration of the call.
pub trait CryptoEngine: Send + Sync {
    /// Obtain a content timestamp over the documents of the session.
    fn get_content_timestamp(
        &self,
        session: &SigningSession,
    ) -> Result<ContentTimestamp, EngineError>;

    /// Compute the to-be-signed bytes for the session's current parameters.
    ///
    /// An empty result is treated as a failure by the coordinator.
    fn get_data_to_sign(&self, session: &SigningSession) -> Result<Vec<u8>, EngineError>;

    /// Finalize a single-document (digest) session into a signed document.
    fn sign_digest(&self, session: &SigningSession) -> Result<SignedDocument, EngineError>;

    /// Finalize a multi-document session into a signed container.
    fn sign_document(&self, session: &SigningSession) -> Result<SignedDocument, EngineError>;

    /// Whether content timestamps come from a local mock source.
    fn is_mock_tsp_used(&self) -> bool {
        false
    }
}
