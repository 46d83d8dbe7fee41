//! `SigningCoordinator` drives the remote signing state machine.
//!
//! ```text
//! Draft -> Configured -> DataReady -> SignatureReceived -> DocumentReady -> Downloaded
//! ```
//!
//! Each edge is one method. Every method locks the session handle, checks
//! the current state, calls the crypto engine if the edge needs it and
//! advances the state before the lock is released, so two requests racing
//! on one session are serialized and the loser sees the advanced state.
//!
//! Policies beyond the plain edges:
//! - configuring is allowed from any state and starts the session over
//! - preparing data to sign is allowed from `Configured` and `DataReady`;
//!   a repeated preparation recomputes and overwrites the payload and date
//! - a signature value the engine cannot finalize is discarded and the
//!   session returns to `DataReady`

use std::sync::Arc;

use chrono::Utc;

use crate::adapters::session_store::{lock_session, SessionKey, SessionStore};
use crate::domain::contract::{
    ConfigurationForm, DataToSignParams, GetDataToSignResponse, SignDocumentResponse,
    SignatureValueParams,
};
use crate::domain::crypto::{DataToSign, SignatureValue};
use crate::domain::session::{
    SessionId, SessionState, SignerParameters, SigningSession, SigningVariant,
};
use crate::infra::error::{GatewayError, GatewayResult};
use crate::services::engine::CryptoEngine;

/// Relative URL returned to the client once the document is ready.
pub const DOWNLOAD_URL: &str = "download";

/// State machine for one workflow variant.
pub struct SigningCoordinator {
    variant: SigningVariant,
    engine: Arc<dyn CryptoEngine>,
    sessions: Arc<dyn SessionStore>,
}

impl SigningCoordinator {
    #[must_use]
    pub fn new(
        variant: SigningVariant,
        engine: Arc<dyn CryptoEngine>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            variant,
            engine,
            sessions,
        }
    }

    #[must_use]
    pub fn variant(&self) -> SigningVariant {
        self.variant
    }

    #[must_use]
    pub fn is_mock_tsp_used(&self) -> bool {
        self.engine.is_mock_tsp_used()
    }

    fn key(&self, id: &SessionId) -> SessionKey {
        SessionKey::new(id.clone(), self.variant)
    }

    /// Whether the store holds a session for `id` under any variant.
    fn is_known(&self, id: &SessionId) -> bool {
        SigningVariant::ALL
            .into_iter()
            .any(|variant| self.sessions.get(&SessionKey::new(id.clone(), variant)).is_some())
    }

    /// Draft (or any state) -> Configured.
    ///
    /// Validates the form before touching the session, so an invalid form
    /// never creates or advances a session. Returns the session id to use
    /// for the rest of the workflow. `existing` is only reused when the
    /// store already holds a session for it; otherwise a fresh id is issued.
    pub fn configure(
        &self,
        existing: Option<&SessionId>,
        form: &ConfigurationForm,
    ) -> GatewayResult<SessionId> {
        let configuration = form.validate(self.variant).inspect_err(|e| {
            log::debug!("Rejected {} configuration: {e}", self.variant);
        })?;

        let id = match existing {
            Some(id) if self.is_known(id) => id.clone(),
            Some(_) => {
                log::warn!("Ignoring unknown session id from client, issuing a new one");
                SessionId::generate()
            }
            None => SessionId::generate(),
        };
        let handle = self.sessions.get_or_create(&self.key(&id));
        let mut session = lock_session(&handle)?;

        if session.state() > SessionState::Configured {
            log::info!(
                "Session {id} reconfigured from state {}, discarding previous progress",
                session.state()
            );
        }
        log::info!(
            "Session {id} configured: form={}, level={}, digest={}{}",
            configuration.signature_form,
            configuration.signature_level,
            configuration.digest_algorithm,
            configuration
                .container_type()
                .map(|c| format!(", container={c}"))
                .unwrap_or_default()
        );
        session.record_configuration(configuration);
        Ok(id)
    }

    /// Configured (or DataReady) -> DataReady.
    ///
    /// Sets the signing date, obtains a content timestamp when requested and
    /// asks the engine for the data to sign. On failure the session is left
    /// exactly as it was before the call.
    pub fn get_data_to_sign(
        &self,
        id: &SessionId,
        params: &DataToSignParams,
    ) -> GatewayResult<GetDataToSignResponse> {
        let handle = self
            .sessions
            .get(&self.key(id))
            .ok_or(GatewayError::SessionNotFound)?;
        let mut session = lock_session(&handle)?;

        match session.state() {
            SessionState::Configured => {}
            SessionState::DataReady => {
                log::info!("Session {id}: data to sign requested again, recomputing");
            }
            state => return Err(GatewayError::out_of_order("get-data-to-sign", state)),
        }

        let signer = params.decode()?;
        let previous = session.clone();

        match self.prepare(&mut session, signer) {
            Ok(data_to_sign) => {
                log::info!(
                    "Session {id}: issued {} bytes of data to sign ({})",
                    data_to_sign.len(),
                    data_to_sign.algorithm()
                );
                let response = GetDataToSignResponse {
                    data_to_sign: data_to_sign.to_base64(),
                };
                session.record_data_to_sign(data_to_sign);
                Ok(response)
            }
            Err(e) => {
                log::warn!("Session {id}: {e}");
                *session = previous;
                Err(e)
            }
        }
    }

    fn prepare(
        &self,
        session: &mut SigningSession,
        signer: SignerParameters,
    ) -> GatewayResult<DataToSign> {
        let configuration = session
            .configuration()
            .cloned()
            .ok_or_else(|| {
                GatewayError::Internal("configured session has no configuration".to_string())
            })?;

        session.stage_preparation(signer, Utc::now());

        if configuration.add_content_timestamp {
            let timestamp = self
                .engine
                .get_content_timestamp(session)
                .map_err(|e| GatewayError::DigestPreparationFailed(e.to_string()))?;
            log::debug!(
                "Session {}: content timestamp of {} bytes at {}",
                session.id(),
                timestamp.token.len(),
                timestamp.generation_time
            );
            session.record_content_timestamp(timestamp);
        }

        let bytes = self
            .engine
            .get_data_to_sign(session)
            .map_err(|e| GatewayError::DigestPreparationFailed(e.to_string()))?;

        DataToSign::new(configuration.digest_algorithm, bytes).map_err(|_| {
            GatewayError::DigestPreparationFailed("engine returned no data to sign".to_string())
        })
    }

    /// DataReady -> SignatureReceived.
    ///
    /// The value is stored unverified; verification belongs to finalization.
    pub fn receive_signature_value(
        &self,
        id: &SessionId,
        params: &SignatureValueParams,
    ) -> GatewayResult<()> {
        let handle = self
            .sessions
            .get(&self.key(id))
            .ok_or(GatewayError::SessionNotFound)?;
        let mut session = lock_session(&handle)?;

        if session.state() != SessionState::DataReady {
            return Err(GatewayError::out_of_order("sign-document", session.state()));
        }
        let value = params.decode()?;
        Self::accept_signature_value(&mut session, value)
    }

    /// SignatureReceived -> DocumentReady.
    pub fn finalize(&self, id: &SessionId) -> GatewayResult<SignDocumentResponse> {
        let handle = self
            .sessions
            .get(&self.key(id))
            .ok_or(GatewayError::SessionNotFound)?;
        let mut session = lock_session(&handle)?;
        self.finalize_locked(&mut session)
    }

    /// DataReady -> SignatureReceived -> DocumentReady under one lock, as
    /// issued by the sign-document call.
    pub fn sign_document(
        &self,
        id: &SessionId,
        params: &SignatureValueParams,
    ) -> GatewayResult<SignDocumentResponse> {
        let handle = self
            .sessions
            .get(&self.key(id))
            .ok_or(GatewayError::SessionNotFound)?;
        let mut session = lock_session(&handle)?;

        if session.state() != SessionState::DataReady {
            return Err(GatewayError::out_of_order("sign-document", session.state()));
        }
        let value = params.decode()?;
        Self::accept_signature_value(&mut session, value)?;
        self.finalize_locked(&mut session)
    }

    fn accept_signature_value(
        session: &mut SigningSession,
        value: SignatureValue,
    ) -> GatewayResult<()> {
        if session.state() != SessionState::DataReady {
            return Err(GatewayError::out_of_order("sign-document", session.state()));
        }
        if !session.data_to_sign().is_some_and(|d| !d.is_empty()) {
            return Err(GatewayError::out_of_order("sign-document", session.state()));
        }
        log::debug!(
            "Session {}: received signature value of {} bytes",
            session.id(),
            value.as_slice().len()
        );
        session.record_signature_value(value);
        Ok(())
    }

    fn finalize_locked(&self, session: &mut SigningSession) -> GatewayResult<SignDocumentResponse> {
        if session.state() != SessionState::SignatureReceived || session.signature_value().is_none()
        {
            return Err(GatewayError::out_of_order("finalize", session.state()));
        }

        let result = match self.variant {
            SigningVariant::SingleDocument => self.engine.sign_digest(session),
            SigningVariant::MultiDocument => self.engine.sign_document(session),
        };

        match result {
            Ok(document) if !document.bytes.is_empty() => {
                log::info!(
                    "Session {}: signed document '{}' ready ({} bytes, {})",
                    session.id(),
                    document.name,
                    document.bytes.len(),
                    document.content_type()
                );
                session.record_signed_document(document);
                Ok(SignDocumentResponse {
                    url_to_download: DOWNLOAD_URL.to_string(),
                })
            }
            Ok(_) => {
                session.discard_signature_value();
                Err(GatewayError::FinalizationFailed(
                    "engine produced an empty document".to_string(),
                ))
            }
            Err(e) => {
                log::warn!("Session {}: finalization failed: {e}", session.id());
                session.discard_signature_value();
                Err(GatewayError::FinalizationFailed(e.to_string()))
            }
        }
    }
}
