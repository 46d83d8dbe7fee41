use std::fmt;
use std::str::FromStr;

use openssl::pkey::Id;

use crate::domain::params::{normalize_literal, ParseError, ParseErrorKind};

/// Public-key algorithm of the signing certificate, as reported by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncryptionAlgorithm {
    Rsa,
    Dsa,
    Ecdsa,
}

impl EncryptionAlgorithm {
    pub fn parse(literal: &str) -> Result<Self, ParseError> {
        match normalize_literal(literal).as_str() {
            "RSA" => Ok(Self::Rsa),
            "DSA" => Ok(Self::Dsa),
            "ECDSA" | "EC" => Ok(Self::Ecdsa),
            _ => Err(ParseError::new(ParseErrorKind::EncryptionAlgorithm, literal)),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EncryptionAlgorithm::Rsa => "RSA",
            EncryptionAlgorithm::Dsa => "DSA",
            EncryptionAlgorithm::Ecdsa => "ECDSA",
        }
    }

    /// Whether an OpenSSL key type belongs to this algorithm.
    #[must_use]
    pub fn matches_key(&self, id: Id) -> bool {
        match self {
            EncryptionAlgorithm::Rsa => id == Id::RSA || id == Id::RSA_PSS,
            EncryptionAlgorithm::Dsa => id == Id::DSA,
            EncryptionAlgorithm::Ecdsa => id == Id::EC,
        }
    }
}

impl FromStr for EncryptionAlgorithm {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for EncryptionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw signature value produced by the external signing agent.
///
/// For ECDSA the bytes are the DER encoded Ecdsa-Sig-Value.
#[derive(Clone, Eq, PartialEq)]
pub struct SignatureValue {
    bytes: Box<[u8]>,
}

impl SignatureValue {
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for SignatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureValue(len={})", self.bytes.len())
    }
}
