//! JSON views and error bodies exchanged with the browser.

use serde::{Deserialize, Serialize};
use warp::http::StatusCode;

use crate::domain::crypto::DigestAlgorithm;
use crate::domain::params::{ContainerType, SignatureForm, SignatureLevel};
use crate::domain::session::SigningVariant;
use crate::infra::error::GatewayError;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "SIGNING_SESSION";

/// Error body returned with every non-success status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Known error codes returned by the gateway.
pub mod error_codes {
    /// Configuration form rejected.
    pub const INVALID_CONFIGURATION: &str = "INVALID_CONFIGURATION";
    /// Call not allowed in the current session state.
    pub const OUT_OF_ORDER_REQUEST: &str = "OUT_OF_ORDER_REQUEST";
    /// Engine could not compute the data to sign.
    pub const DIGEST_PREPARATION_FAILED: &str = "DIGEST_PREPARATION_FAILED";
    /// Engine could not assemble the signed document.
    pub const FINALIZATION_FAILED: &str = "FINALIZATION_FAILED";
    /// No signed document stored for the session.
    pub const DOWNLOAD_NOT_READY: &str = "DOWNLOAD_NOT_READY";
    /// Missing, unknown or expired session cookie.
    pub const SESSION_NOT_FOUND: &str = "SESSION_NOT_FOUND";
    /// Malformed request.
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    /// Upload exceeds the configured limit.
    pub const PAYLOAD_TOO_LARGE: &str = "PAYLOAD_TOO_LARGE";
    /// No such route.
    pub const NOT_FOUND: &str = "NOT_FOUND";
    /// Unexpected server failure.
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

impl ErrorResponse {
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: code.into(),
            message: message.into(),
        }
    }
}

/// Error body plus the status it is served with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl From<&GatewayError> for ApiError {
    fn from(error: &GatewayError) -> Self {
        let (status, code) = match error {
            GatewayError::InvalidConfiguration(_) => {
                (StatusCode::BAD_REQUEST, error_codes::INVALID_CONFIGURATION)
            }
            GatewayError::InvalidInput(_) => (StatusCode::BAD_REQUEST, error_codes::BAD_REQUEST),
            GatewayError::OutOfOrderRequest { .. } => {
                (StatusCode::CONFLICT, error_codes::OUT_OF_ORDER_REQUEST)
            }
            GatewayError::SessionNotFound => (StatusCode::NOT_FOUND, error_codes::SESSION_NOT_FOUND),
            GatewayError::DownloadNotReady(_) => {
                (StatusCode::NOT_FOUND, error_codes::DOWNLOAD_NOT_READY)
            }
            GatewayError::DigestPreparationFailed(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                error_codes::DIGEST_PREPARATION_FAILED,
            ),
            GatewayError::FinalizationFailed(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                error_codes::FINALIZATION_FAILED,
            ),
            GatewayError::ConfigurationError(_) | GatewayError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL_ERROR)
            }
        };
        Self {
            status,
            body: ErrorResponse::new(code, error.to_string()),
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        Self::from(&error)
    }
}

/// Model of the configuration form: every option the browser may offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormModel {
    pub signature_forms: Vec<String>,
    pub digest_algos: Vec<String>,
    pub signature_levels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asic_container_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_digest_algorithm: Option<String>,
    pub download_nexu_url: String,
    pub is_mock_used: bool,
    /// Validation messages of a rejected submission.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl FormModel {
    #[must_use]
    pub fn for_variant(variant: SigningVariant, download_nexu_url: &str, is_mock_used: bool) -> Self {
        Self {
            signature_forms: names(SignatureForm::OFFERED.iter().map(SignatureForm::as_str)),
            digest_algos: names(
                variant
                    .allowed_digest_algorithms()
                    .iter()
                    .map(DigestAlgorithm::as_str),
            ),
            signature_levels: names(SignatureLevel::ALL.iter().map(SignatureLevel::as_str)),
            asic_container_types: variant
                .uses_container()
                .then(|| names(ContainerType::ALL.iter().map(ContainerType::as_str))),
            default_digest_algorithm: (!variant.uses_container())
                .then(|| DigestAlgorithm::Sha256.as_str().to_string()),
            download_nexu_url: download_nexu_url.to_string(),
            is_mock_used,
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }
}

fn names(items: impl Iterator<Item = &'static str>) -> Vec<String> {
    items.map(str::to_string).collect()
}

/// View returned after a successful configuration: where the browser talks
/// to the signing agent and which digest it must use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureProcessView {
    pub root_url: String,
    pub nexu_url: String,
    pub digest_algorithm: String,
}
