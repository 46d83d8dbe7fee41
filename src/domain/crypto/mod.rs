//! Foundational cryptographic domain types.
//!
//! Provides strongly-typed wrappers for the artifacts exchanged with the
//! signing agent:
//! - Digest algorithms with size information and hashing
//! - Signing certificate and the ordered certificate chain
//! - The issued to-be-signed payload
//! - Encryption algorithm and raw signature value

mod cert;
mod data_to_sign;
mod hash;
mod signature;

pub use cert::{CertChain, ChainCertificate, SigningCertificate};
pub use data_to_sign::{DataToSign, DataToSignError};
pub use hash::DigestAlgorithm;
pub use signature::{EncryptionAlgorithm, SignatureValue};
