//! Signing Gateway Library
//!
//! Server side of a two-phase remote signing workflow. The gateway prepares
//! the data to sign for a document (or a set of documents), hands it to an
//! external signing agent that holds the private key, receives the raw
//! signature value back and assembles the signed artifact.
//!
//! Two variants share one state machine:
//! - `sign-a-digest`: the client submits a document digest
//! - `sign-multiple-documents`: the client uploads files that are packaged
//!   into an ASiC container

pub mod adapters;
pub mod domain;
pub mod infra;
pub mod services;

pub use adapters::http::{build_routes, GatewayState};
pub use adapters::session_store::{InMemorySessionStore, SessionHandle, SessionStore};
pub use domain::contract::{
    ConfigurationForm, DataToSignParams, GetDataToSignResponse, SignDocumentResponse,
    SignatureValueParams,
};
pub use domain::crypto::{DigestAlgorithm, EncryptionAlgorithm};
pub use domain::params::{ContainerType, ParseError, SignatureForm, SignatureLevel};
pub use domain::session::{SessionId, SessionState, SigningSession, SigningVariant};
pub use infra::config::{ConfigManager, ExportFormat, GatewayConfiguration};
pub use infra::error::{GatewayError, GatewayResult};
pub use services::{
    CryptoEngine, DownloadGate, EngineError, LocalCryptoEngine, MockTspSource, SigningCoordinator,
};
