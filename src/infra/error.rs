//! Error types for the remote signing workflow.

use thiserror::Error;

use crate::domain::session::SessionState;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors surfaced by the coordinator, download gate and their adapters
#[derive(Error, Debug, miette::Diagnostic)]
pub enum GatewayError {
    #[error("Invalid configuration: {}", .0.join("; "))]
    #[diagnostic(help("correct the listed form fields and submit the configuration again"))]
    InvalidConfiguration(Vec<String>),

    #[error("Out of order request: {operation} is not allowed in state {state}")]
    OutOfOrderRequest {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Digest preparation failed: {0}")]
    DigestPreparationFailed(String),

    #[error("Finalization failed: {0}")]
    FinalizationFailed(String),

    #[error("Signed document not ready for download (state {0})")]
    DownloadNotReady(SessionState),

    #[error("Unknown or expired signing session")]
    SessionNotFound,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub(crate) fn out_of_order(operation: &'static str, state: SessionState) -> Self {
        GatewayError::OutOfOrderRequest { operation, state }
    }
}

impl From<base64::DecodeError> for GatewayError {
    fn from(error: base64::DecodeError) -> Self {
        GatewayError::InvalidInput(format!("invalid base64: {error}"))
    }
}
