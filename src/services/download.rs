//! Download gate for finished signed documents.

use std::sync::Arc;

use crate::adapters::session_store::{lock_session, SessionKey, SessionStore};
use crate::domain::session::{SessionId, SessionState, SigningVariant};
use crate::infra::error::{GatewayError, GatewayResult};

/// Value of the binary transfer marker header.
pub const TRANSFER_ENCODING_BINARY: &str = "binary";

/// Everything needed to stream a signed document back as an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResponse {
    pub body: Vec<u8>,
    pub content_type: String,
    pub content_disposition: String,
    pub transfer_encoding: &'static str,
}

/// Exposes the signed document of a session once finalization succeeded.
///
/// Downloads do not consume the document: repeated downloads of the same
/// session return the same bytes.
pub struct DownloadGate {
    variant: SigningVariant,
    sessions: Arc<dyn SessionStore>,
}

impl DownloadGate {
    #[must_use]
    pub fn new(variant: SigningVariant, sessions: Arc<dyn SessionStore>) -> Self {
        Self { variant, sessions }
    }

    /// DocumentReady (or Downloaded) -> Downloaded.
    pub fn download(&self, id: &SessionId) -> GatewayResult<DownloadResponse> {
        let handle = self
            .sessions
            .get(&SessionKey::new(id.clone(), self.variant))
            .ok_or_else(|| {
                log::error!("Download requested for unknown session {id} ({})", self.variant);
                GatewayError::SessionNotFound
            })?;
        let mut session = lock_session(&handle)?;

        let document = match (session.state(), session.signed_document()) {
            (SessionState::DocumentReady | SessionState::Downloaded, Some(document)) => {
                document.clone()
            }
            (state, _) => {
                log::error!("Session {id}: download requested in state {state}, no signed document");
                return Err(GatewayError::DownloadNotReady(state));
            }
        };

        log::info!(
            "Session {id}: serving '{}' ({} bytes)",
            document.name,
            document.bytes.len()
        );
        session.mark_downloaded();

        Ok(DownloadResponse {
            content_type: document.content_type().to_string(),
            content_disposition: content_disposition(&document.name),
            transfer_encoding: TRANSFER_ENCODING_BINARY,
            body: document.bytes,
        })
    }
}

/// `attachment; filename="..."` with characters that would break the
/// quoted string replaced.
#[must_use]
pub fn content_disposition(file_name: &str) -> String {
    let sanitized: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("attachment; filename=\"{sanitized}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("report.pdf"),
            "attachment; filename=\"report.pdf\""
        );
        assert_eq!(
            content_disposition("a\"b\r\n.txt"),
            "attachment; filename=\"a_b__.txt\""
        );
    }
}
