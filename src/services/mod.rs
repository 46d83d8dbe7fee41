//! Service layer module root.
//! Contains the workflow state machine, the download gate and the crypto
//! engine seam with its reference implementation.

pub mod coordinator;
pub mod download;
pub mod engine;
pub mod local_engine;
pub mod tsp;

pub use coordinator::{SigningCoordinator, DOWNLOAD_URL};
pub use download::{DownloadGate, DownloadResponse};
pub use engine::{CryptoEngine, EngineError};
pub use local_engine::LocalCryptoEngine;
pub use tsp::MockTspSource;
