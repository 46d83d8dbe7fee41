//! Shared fixtures for integration tests.
//!
//! Throwaway keys and self-signed certificates are generated with OpenSSL;
//! [`TestAgent`] plays the external signing agent.

#![allow(dead_code)]

pub mod recording_engine;

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::sign::Signer;
use openssl::x509::{X509NameBuilder, X509};
use signing_gateway::domain::document::FileDocument;
use signing_gateway::{
    ConfigurationForm, CryptoEngine, DataToSignParams, DigestAlgorithm, DownloadGate,
    InMemorySessionStore, SignatureValueParams, SigningCoordinator, SigningVariant,
};

pub fn b64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub fn unb64(encoded: &str) -> Vec<u8> {
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .expect("valid base64")
}

/// Key pair with a self-signed certificate.
pub struct TestAgent {
    pub key: PKey<Private>,
    pub cert: X509,
    pub encryption_algorithm: &'static str,
}

impl TestAgent {
    pub fn rsa(common_name: &str) -> Self {
        let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
        Self::self_signed(key, common_name, "RSA")
    }

    pub fn ecdsa(common_name: &str) -> Self {
        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
        let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();
        Self::self_signed(key, common_name, "ECDSA")
    }

    fn self_signed(key: PKey<Private>, common_name: &str, encryption: &'static str) -> Self {
        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_text("CN", common_name).unwrap();
        let name = name.build();

        let mut serial = BigNum::new().unwrap();
        serial.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();

        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        builder
            .set_serial_number(&serial.to_asn1_integer().unwrap())
            .unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&key).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(30).unwrap())
            .unwrap();
        builder.sign(&key, MessageDigest::sha256()).unwrap();

        Self {
            key,
            cert: builder.build(),
            encryption_algorithm: encryption,
        }
    }

    pub fn cert_der(&self) -> Vec<u8> {
        self.cert.to_der().unwrap()
    }

    /// Request body announcing this agent's certificate and `chain`.
    pub fn data_to_sign_params(&self, chain: &[Vec<u8>]) -> DataToSignParams {
        DataToSignParams {
            signing_certificate: b64(&self.cert_der()),
            certificate_chain: chain.iter().map(|der| b64(der)).collect(),
            encryption_algorithm: self.encryption_algorithm.to_string(),
        }
    }

    /// Hash-then-sign `data`, the way the signing agent does.
    pub fn sign(&self, data: &[u8], algo: DigestAlgorithm) -> Vec<u8> {
        let mut signer = Signer::new(algo.message_digest(), &self.key).unwrap();
        signer.update(data).unwrap();
        signer.sign_to_vec().unwrap()
    }

    /// Sign the base64 payload returned by get-data-to-sign.
    pub fn signature_params(&self, data_to_sign_b64: &str, algo: DigestAlgorithm) -> SignatureValueParams {
        SignatureValueParams {
            signature_value: b64(&self.sign(&unb64(data_to_sign_b64), algo)),
        }
    }
}

/// Coordinator and download gate sharing one in-memory store.
pub struct Harness {
    pub coordinator: SigningCoordinator,
    pub downloads: DownloadGate,
    pub store: Arc<InMemorySessionStore>,
}

impl Harness {
    pub fn new(variant: SigningVariant, engine: Arc<dyn CryptoEngine>) -> Self {
        let store = Arc::new(InMemorySessionStore::new(Duration::from_secs(600)));
        Self {
            coordinator: SigningCoordinator::new(variant, engine.clone(), store.clone()),
            downloads: DownloadGate::new(variant, store.clone()),
            store,
        }
    }
}

/// Single-document form signing `content` under `document_name`.
pub fn digest_form(
    level: &str,
    algo: DigestAlgorithm,
    document_name: &str,
    content: &[u8],
) -> ConfigurationForm {
    ConfigurationForm {
        signature_form: Some("CAdES".to_string()),
        signature_level: Some(level.to_string()),
        digest_algorithm: Some(algo.as_str().to_string()),
        document_name: Some(document_name.to_string()),
        digest_to_sign: Some(b64(&algo.digest(content))),
        ..ConfigurationForm::default()
    }
}

/// Multi-document form packaging `documents` into `container`.
pub fn container_form(
    container: &str,
    algo: DigestAlgorithm,
    documents: &[(&str, &[u8])],
) -> ConfigurationForm {
    ConfigurationForm {
        signature_form: Some("XAdES".to_string()),
        signature_level: Some("XAdES-BASELINE-B".to_string()),
        digest_algorithm: Some(algo.as_str().to_string()),
        container_type: Some(container.to_string()),
        documents: documents
            .iter()
            .map(|(name, bytes)| FileDocument {
                name: (*name).to_string(),
                bytes: bytes.to_vec(),
                mime_type: None,
            })
            .collect(),
        ..ConfigurationForm::default()
    }
}
