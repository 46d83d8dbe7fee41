//! Local mock timestamp source for content timestamps.
//!
//! Issues self-describing tokens without contacting a timestamp authority.
//! Tokens carry no signature and are only suitable for development setups.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::domain::crypto::DigestAlgorithm;
use crate::domain::session::ContentTimestamp;
use crate::services::engine::EngineError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MockTimestampToken<'a> {
    policy: &'a str,
    serial_number: u64,
    gen_time: String,
    message_imprint_algorithm: &'a str,
    message_imprint: String,
}

/// Timestamp source that answers locally.
pub struct MockTspSource {
    imprint_algorithm: DigestAlgorithm,
    next_serial: AtomicU64,
}

impl Default for MockTspSource {
    fn default() -> Self {
        Self::new(DigestAlgorithm::Sha256)
    }
}

impl MockTspSource {
    pub const POLICY: &'static str = "mock-tsp";

    #[must_use]
    pub fn new(imprint_algorithm: DigestAlgorithm) -> Self {
        Self {
            imprint_algorithm,
            next_serial: AtomicU64::new(1),
        }
    }

    /// Timestamp `data` as of `at`.
    pub fn timestamp(&self, data: &[u8], at: DateTime<Utc>) -> Result<ContentTimestamp, EngineError> {
        let token = MockTimestampToken {
            policy: Self::POLICY,
            serial_number: self.next_serial.fetch_add(1, Ordering::Relaxed),
            gen_time: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            message_imprint_algorithm: self.imprint_algorithm.as_str(),
            message_imprint: hex::encode(self.imprint_algorithm.digest(data)),
        };
        let token = serde_json::to_vec(&token)
            .map_err(|e| EngineError::Timestamp(format!("token encoding failed: {e}")))?;
        Ok(ContentTimestamp {
            token,
            generation_time: at,
        })
    }
}
