use std::fmt;

use super::DigestAlgorithm;

/// To-be-signed payload issued to the signing agent, paired with the digest
/// algorithm the agent is expected to sign it with.
///
/// Invariant: never empty.
#[derive(Clone, Eq, PartialEq)]
pub struct DataToSign {
    algo: DigestAlgorithm,
    bytes: Box<[u8]>,
}

impl DataToSign {
    pub fn new(algo: DigestAlgorithm, bytes: Vec<u8>) -> Result<Self, DataToSignError> {
        if bytes.is_empty() {
            return Err(DataToSignError::Empty);
        }
        Ok(Self {
            algo,
            bytes: bytes.into_boxed_slice(),
        })
    }

    #[must_use]
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algo
    }
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
    #[must_use]
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

impl fmt::Debug for DataToSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DataToSign(algo={:?}, len={})",
            self.algo,
            self.bytes.len()
        )
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DataToSignError {
    #[error("data to sign is empty")]
    Empty,
}
