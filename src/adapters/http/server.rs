//! Request handlers of the signing gateway.
//!
//! Handlers are synchronous and transport agnostic: they take decoded
//! request values plus the raw session cookie and return either a response
//! body or an [`ApiError`]. `routes` wires them into warp filters.

use std::sync::Arc;

use super::protocol::{ApiError, FormModel, SignatureProcessView};
use crate::adapters::session_store::SessionStore;
use crate::domain::contract::{
    ConfigurationForm, DataToSignParams, GetDataToSignResponse, SignDocumentResponse,
    SignatureValueParams,
};
use crate::domain::crypto::DigestAlgorithm;
use crate::domain::session::{SessionId, SigningVariant};
use crate::infra::config::GatewayConfiguration;
use crate::infra::error::GatewayError;
use crate::services::coordinator::SigningCoordinator;
use crate::services::download::{DownloadGate, DownloadResponse};
use crate::services::engine::CryptoEngine;

/// Coordinator and download gate of one variant.
pub struct Workflow {
    pub coordinator: SigningCoordinator,
    pub downloads: DownloadGate,
}

impl Workflow {
    fn new(
        variant: SigningVariant,
        engine: Arc<dyn CryptoEngine>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            coordinator: SigningCoordinator::new(variant, engine, sessions.clone()),
            downloads: DownloadGate::new(variant, sessions),
        }
    }
}

/// Shared state for the gateway handlers.
pub struct GatewayState {
    single: Workflow,
    multi: Workflow,
    nexu_url: String,
    download_nexu_url: String,
    max_upload_bytes: u64,
}

/// Outcome of a rejected configuration submission.
#[derive(Debug)]
pub enum ConfigureRejection {
    /// Form redisplayed with validation messages; the session is untouched.
    Form(FormModel),
    Error(ApiError),
}

impl GatewayState {
    #[must_use]
    pub fn new(
        config: &GatewayConfiguration,
        engine: Arc<dyn CryptoEngine>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            single: Workflow::new(SigningVariant::SingleDocument, engine.clone(), sessions.clone()),
            multi: Workflow::new(SigningVariant::MultiDocument, engine, sessions),
            nexu_url: config.nexu_url.clone(),
            download_nexu_url: config.download_nexu_url.clone(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    #[must_use]
    pub fn workflow(&self, variant: SigningVariant) -> &Workflow {
        match variant {
            SigningVariant::SingleDocument => &self.single,
            SigningVariant::MultiDocument => &self.multi,
        }
    }

    #[must_use]
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    fn form_model(&self, variant: SigningVariant) -> FormModel {
        FormModel::for_variant(
            variant,
            &self.download_nexu_url,
            self.workflow(variant).coordinator.is_mock_tsp_used(),
        )
    }
}

/// Resolve the session cookie of a call that needs an existing session.
fn require_session(cookie: Option<&str>) -> Result<SessionId, ApiError> {
    cookie
        .and_then(SessionId::parse)
        .ok_or_else(|| ApiError::from(GatewayError::SessionNotFound))
}

/// Handle the show-form call.
#[must_use]
pub fn handle_show_form(state: &GatewayState, variant: SigningVariant) -> FormModel {
    state.form_model(variant)
}

/// Handle a configuration submission.
///
/// Returns the session id to store in the cookie together with the view
/// the browser continues with.
pub fn handle_configure(
    state: &GatewayState,
    variant: SigningVariant,
    cookie: Option<&str>,
    form: &ConfigurationForm,
) -> Result<(SessionId, SignatureProcessView), ConfigureRejection> {
    let existing = cookie.and_then(SessionId::parse);
    match state
        .workflow(variant)
        .coordinator
        .configure(existing.as_ref(), form)
    {
        Ok(id) => {
            let digest_algorithm = form
                .digest_algorithm
                .as_deref()
                .and_then(|literal| DigestAlgorithm::parse(literal).ok())
                .map(|algo| algo.as_str().to_string())
                .unwrap_or_default();
            Ok((
                id,
                SignatureProcessView {
                    root_url: variant.root_url().to_string(),
                    nexu_url: state.nexu_url.clone(),
                    digest_algorithm,
                },
            ))
        }
        Err(GatewayError::InvalidConfiguration(errors)) => {
            Err(ConfigureRejection::Form(state.form_model(variant).with_errors(errors)))
        }
        Err(e) => Err(ConfigureRejection::Error(ApiError::from(e))),
    }
}

/// Handle the get-data-to-sign call.
pub fn handle_get_data_to_sign(
    state: &GatewayState,
    variant: SigningVariant,
    cookie: Option<&str>,
    params: &DataToSignParams,
) -> Result<GetDataToSignResponse, ApiError> {
    let id = require_session(cookie)?;
    log::debug!(
        "get-data-to-sign: session={id}, chain_len={}, encryption={}",
        params.certificate_chain.len(),
        params.encryption_algorithm
    );
    Ok(state
        .workflow(variant)
        .coordinator
        .get_data_to_sign(&id, params)?)
}

/// Handle the sign-document call.
pub fn handle_sign_document(
    state: &GatewayState,
    variant: SigningVariant,
    cookie: Option<&str>,
    params: &SignatureValueParams,
) -> Result<SignDocumentResponse, ApiError> {
    let id = require_session(cookie)?;
    Ok(state
        .workflow(variant)
        .coordinator
        .sign_document(&id, params)?)
}

/// Handle the download call.
pub fn handle_download(
    state: &GatewayState,
    variant: SigningVariant,
    cookie: Option<&str>,
) -> Result<DownloadResponse, ApiError> {
    let id = require_session(cookie).inspect_err(|_| {
        log::error!("Download requested without a valid session cookie ({variant})");
    })?;
    Ok(state.workflow(variant).downloads.download(&id)?)
}
