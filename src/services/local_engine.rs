//! Reference `CryptoEngine` backed by OpenSSL.
//!
//! The to-be-signed payload is the session digest algorithm applied to a
//! canonical, length-prefixed encoding of every signature parameter, the
//! signing certificate, the chain in submitted order, the signing time, the
//! optional content timestamp and the digests of the signed documents. The
//! signing agent signs that payload (hash-then-sign with the same digest
//! algorithm); finalization recomputes it, verifies the signature value
//! against the certificate's public key and emits:
//! - single document: a JSON signature envelope named after the document
//! - multi document: a ZIP container with a `mimetype` entry, the documents
//!   and `META-INF/signature.json`

use std::io::{Cursor, Write};
use std::path::Path;

use base64::Engine;
use chrono::SecondsFormat;
use openssl::sign::Verifier;
use openssl::x509::X509;
use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::domain::crypto::{EncryptionAlgorithm, SigningCertificate};
use crate::domain::document::{FileDocument, MimeType, SignedDocument, MIMETYPE_ENTRY};
use crate::domain::params::ContainerType;
use crate::domain::session::{SignedContent, SigningConfiguration, SigningSession};
use crate::services::engine::{CryptoEngine, EngineError};
use crate::services::tsp::MockTspSource;

/// MIME type of the JSON signature envelope.
pub const ENVELOPE_MIME_TYPE: &str = "application/json";

/// Name of the signature entry inside a container.
pub const CONTAINER_SIGNATURE_ENTRY: &str = "META-INF/signature.json";

/// Length-prefixed field writer; the encoding is unambiguous for any input.
#[derive(Default)]
struct CanonicalWriter {
    buf: Vec<u8>,
}

impl CanonicalWriter {
    fn field(&mut self, tag: &str, value: &[u8]) -> Result<(), EngineError> {
        let tag_len = u16::try_from(tag.len())
            .map_err(|_| EngineError::Unsupported(format!("field tag too long: {tag}")))?;
        let value_len = u32::try_from(value.len())
            .map_err(|_| EngineError::Unsupported(format!("field {tag} too large")))?;
        self.buf.extend_from_slice(&tag_len.to_be_bytes());
        self.buf.extend_from_slice(tag.as_bytes());
        self.buf.extend_from_slice(&value_len.to_be_bytes());
        self.buf.extend_from_slice(value);
        Ok(())
    }

    fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignedDataObject {
    name: String,
    digest: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignatureEnvelope<'a> {
    signature_form: &'a str,
    signature_level: &'a str,
    digest_algorithm: &'a str,
    encryption_algorithm: &'a str,
    signing_time: String,
    signing_certificate: String,
    certificate_chain: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_timestamp: Option<String>,
    signed_data_objects: Vec<SignedDataObject>,
    data_to_sign: String,
    signature_value: String,
}

/// OpenSSL-backed engine with an optional local timestamp source.
pub struct LocalCryptoEngine {
    tsp: Option<MockTspSource>,
}

impl Default for LocalCryptoEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalCryptoEngine {
    /// Engine answering content timestamp requests with [`MockTspSource`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            tsp: Some(MockTspSource::default()),
        }
    }

    /// Engine that refuses content timestamp requests.
    #[must_use]
    pub fn without_timestamps() -> Self {
        Self { tsp: None }
    }

    fn configuration(session: &SigningSession) -> Result<&SigningConfiguration, EngineError> {
        session
            .configuration()
            .ok_or(EngineError::MissingInput("configuration"))
    }

    /// (name, digest) of every signed data object, in submission order.
    fn data_objects(configuration: &SigningConfiguration) -> Vec<(String, Vec<u8>)> {
        match &configuration.content {
            SignedContent::Digest(document) => {
                vec![(document.name.clone(), document.digest.clone())]
            }
            SignedContent::Files { documents, .. } => documents
                .iter()
                .map(|d| {
                    (
                        d.entry_name().to_string(),
                        configuration.digest_algorithm.digest(&d.bytes),
                    )
                })
                .collect(),
        }
    }

    fn canonical_attributes(session: &SigningSession) -> Result<Vec<u8>, EngineError> {
        let configuration = Self::configuration(session)?;
        let signer = session
            .signer()
            .ok_or(EngineError::MissingInput("signer parameters"))?;
        let signing_date = session
            .signing_date()
            .ok_or(EngineError::MissingInput("signing date"))?;

        let mut w = CanonicalWriter::default();
        w.field("signature-form", configuration.signature_form.as_str().as_bytes())?;
        w.field("signature-level", configuration.signature_level.as_str().as_bytes())?;
        w.field("digest-algorithm", configuration.digest_algorithm.as_str().as_bytes())?;
        w.field(
            "encryption-algorithm",
            signer.encryption_algorithm.as_str().as_bytes(),
        )?;
        w.field(
            "signing-time",
            signing_date
                .to_rfc3339_opts(SecondsFormat::Millis, true)
                .as_bytes(),
        )?;
        w.field("signing-certificate", signer.signing_certificate.as_der())?;
        for der in signer.certificate_chain.iter_der() {
            w.field("chain-certificate", der)?;
        }
        if let Some(timestamp) = session.content_timestamp() {
            w.field("content-timestamp", &timestamp.token)?;
        }
        if let Some(container) = configuration.container_type() {
            w.field("container-type", container.as_str().as_bytes())?;
        }
        for (name, digest) in Self::data_objects(configuration) {
            w.field("document-name", name.as_bytes())?;
            w.field("document-digest", &digest)?;
        }
        Ok(w.into_bytes())
    }

    fn compute_data_to_sign(session: &SigningSession) -> Result<Vec<u8>, EngineError> {
        let configuration = Self::configuration(session)?;
        let attributes = Self::canonical_attributes(session)?;
        Ok(configuration.digest_algorithm.digest(&attributes))
    }

    fn parse_certificate(
        certificate: &SigningCertificate,
        encryption: EncryptionAlgorithm,
    ) -> Result<X509, EngineError> {
        let cert = X509::from_der(certificate.as_der())
            .map_err(|e| EngineError::InvalidCertificate(format!("not a DER certificate: {e}")))?;
        let key = cert
            .public_key()
            .map_err(|e| EngineError::InvalidCertificate(format!("no usable public key: {e}")))?;
        if !encryption.matches_key(key.id()) {
            return Err(EngineError::Unsupported(format!(
                "certificate key does not match encryption algorithm {encryption}"
            )));
        }
        Ok(cert)
    }

    /// Recompute, compare and verify; returns the envelope bytes.
    fn verified_envelope(&self, session: &SigningSession) -> Result<Vec<u8>, EngineError> {
        let configuration = Self::configuration(session)?;
        let signer = session
            .signer()
            .ok_or(EngineError::MissingInput("signer parameters"))?;
        let issued = session
            .data_to_sign()
            .ok_or(EngineError::MissingInput("data to sign"))?;
        let signature = session
            .signature_value()
            .ok_or(EngineError::MissingInput("signature value"))?;

        if Self::compute_data_to_sign(session)? != issued.as_slice() {
            return Err(EngineError::SignatureRejected(
                "session parameters no longer match the issued data to sign".to_string(),
            ));
        }

        let cert = Self::parse_certificate(&signer.signing_certificate, signer.encryption_algorithm)?;
        let key = cert
            .public_key()
            .map_err(|e| EngineError::InvalidCertificate(e.to_string()))?;
        let verified = Verifier::new(configuration.digest_algorithm.message_digest(), &key)
            .and_then(|mut verifier| {
                verifier.update(issued.as_slice())?;
                verifier.verify(signature.as_slice())
            })
            // Malformed signature encodings surface as OpenSSL errors.
            .unwrap_or(false);
        if !verified {
            return Err(EngineError::SignatureRejected(
                "signature value does not verify against the signing certificate".to_string(),
            ));
        }

        let b64 = &base64::engine::general_purpose::STANDARD;
        let signing_date = session
            .signing_date()
            .ok_or(EngineError::MissingInput("signing date"))?;
        let envelope = SignatureEnvelope {
            signature_form: configuration.signature_form.as_str(),
            signature_level: configuration.signature_level.as_str(),
            digest_algorithm: configuration.digest_algorithm.as_str(),
            encryption_algorithm: signer.encryption_algorithm.as_str(),
            signing_time: signing_date.to_rfc3339_opts(SecondsFormat::Millis, true),
            signing_certificate: b64.encode(signer.signing_certificate.as_der()),
            certificate_chain: signer
                .certificate_chain
                .iter_der()
                .map(|der| b64.encode(der))
                .collect(),
            content_timestamp: session.content_timestamp().map(|t| b64.encode(&t.token)),
            signed_data_objects: Self::data_objects(configuration)
                .into_iter()
                .map(|(name, digest)| SignedDataObject {
                    name,
                    digest: b64.encode(digest),
                })
                .collect(),
            data_to_sign: b64.encode(issued.as_slice()),
            signature_value: b64.encode(signature.as_slice()),
        };
        serde_json::to_vec_pretty(&envelope)
            .map_err(|e| EngineError::Packaging(format!("envelope encoding failed: {e}")))
    }
}

impl CryptoEngine for LocalCryptoEngine {
    fn get_content_timestamp(
        &self,
        session: &SigningSession,
    ) -> Result<crate::domain::session::ContentTimestamp, EngineError> {
        let tsp = self
            .tsp
            .as_ref()
            .ok_or_else(|| EngineError::Timestamp("no timestamp source configured".to_string()))?;
        let configuration = Self::configuration(session)?;
        let imprint: Vec<u8> = Self::data_objects(configuration)
            .into_iter()
            .flat_map(|(_, digest)| digest)
            .collect();
        let at = session.signing_date().unwrap_or_else(chrono::Utc::now);
        tsp.timestamp(&imprint, at)
    }

    fn get_data_to_sign(&self, session: &SigningSession) -> Result<Vec<u8>, EngineError> {
        let signer = session
            .signer()
            .ok_or(EngineError::MissingInput("signer parameters"))?;
        Self::parse_certificate(&signer.signing_certificate, signer.encryption_algorithm)?;
        Self::compute_data_to_sign(session)
    }

    fn sign_digest(&self, session: &SigningSession) -> Result<SignedDocument, EngineError> {
        let SignedContent::Digest(document) = &Self::configuration(session)?.content else {
            return Err(EngineError::Unsupported(
                "digest signing requires a single-document session".to_string(),
            ));
        };
        let envelope = self.verified_envelope(session)?;
        Ok(SignedDocument {
            bytes: envelope,
            name: document.name.clone(),
            mime_type: Some(MimeType::from_static(ENVELOPE_MIME_TYPE)),
        })
    }

    fn sign_document(&self, session: &SigningSession) -> Result<SignedDocument, EngineError> {
        let SignedContent::Files {
            container,
            documents,
        } = &Self::configuration(session)?.content
        else {
            return Err(EngineError::Unsupported(
                "container signing requires a multi-document session".to_string(),
            ));
        };
        let envelope = self.verified_envelope(session)?;
        let bytes = package_container(*container, documents, &envelope)
            .map_err(|e| EngineError::Packaging(e.to_string()))?;
        Ok(SignedDocument {
            bytes,
            name: container_name(*container, documents),
            mime_type: Some(MimeType::from_static(container.mime_type())),
        })
    }

    fn is_mock_tsp_used(&self) -> bool {
        self.tsp.is_some()
    }
}

fn container_name(container: ContainerType, documents: &[FileDocument]) -> String {
    let stem = documents
        .first()
        .and_then(|d| Path::new(d.entry_name()).file_stem())
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("container");
    format!("{stem}.{}", container.extension())
}

fn package_container(
    container: ContainerType,
    documents: &[FileDocument],
    envelope: &[u8],
) -> Result<Vec<u8>, zip::result::ZipError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    // The mimetype entry must come first and stay uncompressed.
    writer.start_file(MIMETYPE_ENTRY, stored)?;
    writer.write_all(container.mime_type().as_bytes())?;

    for document in documents {
        writer.start_file(document.entry_name(), deflated)?;
        writer.write_all(&document.bytes)?;
    }

    writer.start_file(CONTAINER_SIGNATURE_ENTRY, deflated)?;
    writer.write_all(envelope)?;

    Ok(writer.finish()?.into_inner())
}
