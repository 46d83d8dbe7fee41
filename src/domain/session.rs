//! Signing session model.
//!
//! A [`SigningSession`] is the per-browser-session context of one workflow
//! variant. Fields are only mutated through the `pub(crate)` recorders
//! below, each of which leaves the session in a state consistent with the
//! field invariants:
//! - `signing_date` is set iff `data_to_sign` is set
//! - `signature_value` is only set while `data_to_sign` is set
//! - `signed_document` is only set from a session with a signature value

use std::fmt;

use chrono::{DateTime, Utc};

use super::crypto::{
    CertChain, DataToSign, DigestAlgorithm, EncryptionAlgorithm, SignatureValue,
    SigningCertificate,
};
use super::document::{DigestDocument, FileDocument, SignedDocument};
use super::params::{ContainerType, SignatureForm, SignatureLevel};

/// Opaque session identifier carried by the client (cookie value).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Fresh identifier with 128 random bits, hex encoded.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::fill(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Accepts an identifier previously issued by [`SessionId::generate`].
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        (value.len() == 32 && value.chars().all(|c| c.is_ascii_hexdigit()))
            .then(|| Self(value.to_ascii_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Workflow variant. Both share the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningVariant {
    /// Sign a client-computed digest of one document.
    SingleDocument,
    /// Sign uploaded documents and package them in an ASiC container.
    MultiDocument,
}

impl SigningVariant {
    pub const ALL: [SigningVariant; 2] =
        [SigningVariant::SingleDocument, SigningVariant::MultiDocument];

    #[must_use]
    pub fn allowed_digest_algorithms(&self) -> &'static [DigestAlgorithm] {
        match self {
            SigningVariant::SingleDocument => &[
                DigestAlgorithm::Sha1,
                DigestAlgorithm::Sha256,
                DigestAlgorithm::Sha384,
                DigestAlgorithm::Sha512,
            ],
            SigningVariant::MultiDocument => &DigestAlgorithm::ALL,
        }
    }

    #[must_use]
    pub fn allows_digest_algorithm(&self, algo: DigestAlgorithm) -> bool {
        self.allowed_digest_algorithms().contains(&algo)
    }

    #[must_use]
    pub fn uses_container(&self) -> bool {
        matches!(self, SigningVariant::MultiDocument)
    }

    /// Route prefix of the variant's endpoint group.
    #[must_use]
    pub fn root_url(&self) -> &'static str {
        match self {
            SigningVariant::SingleDocument => "sign-a-digest",
            SigningVariant::MultiDocument => "sign-multiple-documents",
        }
    }
}

impl fmt::Display for SigningVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningVariant::SingleDocument => f.write_str("single-document"),
            SigningVariant::MultiDocument => f.write_str("multi-document"),
        }
    }
}

/// Workflow states, in protocol order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionState {
    Draft,
    Configured,
    DataReady,
    SignatureReceived,
    DocumentReady,
    Downloaded,
}

impl SessionState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Draft => "draft",
            SessionState::Configured => "configured",
            SessionState::DataReady => "data_ready",
            SessionState::SignatureReceived => "signature_received",
            SessionState::DocumentReady => "document_ready",
            SessionState::Downloaded => "downloaded",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What is being signed, per variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignedContent {
    Digest(DigestDocument),
    Files {
        container: ContainerType,
        documents: Vec<FileDocument>,
    },
}

/// Validated configuration submitted on the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningConfiguration {
    pub signature_form: SignatureForm,
    pub signature_level: SignatureLevel,
    pub digest_algorithm: DigestAlgorithm,
    pub add_content_timestamp: bool,
    pub content: SignedContent,
}

impl SigningConfiguration {
    #[must_use]
    pub fn variant(&self) -> SigningVariant {
        match self.content {
            SignedContent::Digest(_) => SigningVariant::SingleDocument,
            SignedContent::Files { .. } => SigningVariant::MultiDocument,
        }
    }

    #[must_use]
    pub fn container_type(&self) -> Option<ContainerType> {
        match &self.content {
            SignedContent::Digest(_) => None,
            SignedContent::Files { container, .. } => Some(*container),
        }
    }
}

/// Signer-side parameters supplied with the get-data-to-sign call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerParameters {
    pub signing_certificate: SigningCertificate,
    pub certificate_chain: CertChain,
    pub encryption_algorithm: EncryptionAlgorithm,
}

/// Content timestamp token obtained before the data to sign is computed.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentTimestamp {
    pub token: Vec<u8>,
    pub generation_time: DateTime<Utc>,
}

impl fmt::Debug for ContentTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ContentTimestamp(len={}, time={})",
            self.token.len(),
            self.generation_time
        )
    }
}

/// In-progress signing context of one session and variant.
#[derive(Debug, Clone)]
pub struct SigningSession {
    id: SessionId,
    variant: SigningVariant,
    state: SessionState,
    configuration: Option<SigningConfiguration>,
    signer: Option<SignerParameters>,
    signing_date: Option<DateTime<Utc>>,
    content_timestamp: Option<ContentTimestamp>,
    data_to_sign: Option<DataToSign>,
    signature_value: Option<SignatureValue>,
    signed_document: Option<SignedDocument>,
}

impl SigningSession {
    #[must_use]
    pub fn new(id: SessionId, variant: SigningVariant) -> Self {
        Self {
            id,
            variant,
            state: SessionState::Draft,
            configuration: None,
            signer: None,
            signing_date: None,
            content_timestamp: None,
            data_to_sign: None,
            signature_value: None,
            signed_document: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }
    #[must_use]
    pub fn variant(&self) -> SigningVariant {
        self.variant
    }
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }
    #[must_use]
    pub fn configuration(&self) -> Option<&SigningConfiguration> {
        self.configuration.as_ref()
    }
    #[must_use]
    pub fn signer(&self) -> Option<&SignerParameters> {
        self.signer.as_ref()
    }
    #[must_use]
    pub fn signing_date(&self) -> Option<DateTime<Utc>> {
        self.signing_date
    }
    #[must_use]
    pub fn content_timestamp(&self) -> Option<&ContentTimestamp> {
        self.content_timestamp.as_ref()
    }
    #[must_use]
    pub fn data_to_sign(&self) -> Option<&DataToSign> {
        self.data_to_sign.as_ref()
    }
    #[must_use]
    pub fn signature_value(&self) -> Option<&SignatureValue> {
        self.signature_value.as_ref()
    }
    #[must_use]
    pub fn signed_document(&self) -> Option<&SignedDocument> {
        self.signed_document.as_ref()
    }

    /// Store a configuration and drop everything derived from a previous one.
    pub(crate) fn record_configuration(&mut self, configuration: SigningConfiguration) {
        self.configuration = Some(configuration);
        self.signer = None;
        self.signing_date = None;
        self.content_timestamp = None;
        self.data_to_sign = None;
        self.signature_value = None;
        self.signed_document = None;
        self.state = SessionState::Configured;
    }

    /// Stage the signer parameters and signing date for a preparation run.
    ///
    /// Any previously issued data to sign is dropped together with its date.
    pub(crate) fn stage_preparation(
        &mut self,
        signer: SignerParameters,
        signing_date: DateTime<Utc>,
    ) {
        self.signer = Some(signer);
        self.signing_date = Some(signing_date);
        self.content_timestamp = None;
        self.data_to_sign = None;
    }

    pub(crate) fn record_content_timestamp(&mut self, timestamp: ContentTimestamp) {
        self.content_timestamp = Some(timestamp);
    }

    pub(crate) fn record_data_to_sign(&mut self, data_to_sign: DataToSign) {
        self.data_to_sign = Some(data_to_sign);
        self.state = SessionState::DataReady;
    }

    pub(crate) fn record_signature_value(&mut self, value: SignatureValue) {
        self.signature_value = Some(value);
        self.state = SessionState::SignatureReceived;
    }

    /// Drop a signature value the engine could not finalize.
    pub(crate) fn discard_signature_value(&mut self) {
        self.signature_value = None;
        self.state = SessionState::DataReady;
    }

    pub(crate) fn record_signed_document(&mut self, document: SignedDocument) {
        self.signed_document = Some(document);
        self.state = SessionState::DocumentReady;
    }

    pub(crate) fn mark_downloaded(&mut self) {
        self.state = SessionState::Downloaded;
    }
}
