//! Request and response contract of the signing workflow.
//!
//! Raw request bodies are kept as strings and validated here into the typed
//! domain model; nothing is coerced implicitly.

use std::collections::HashSet;

use base64::Engine;
use serde::{Deserialize, Serialize};

use super::crypto::{CertChain, DigestAlgorithm, EncryptionAlgorithm, SignatureValue, SigningCertificate};
use super::document::{DigestDocument, FileDocument, MIMETYPE_ENTRY};
use super::params::{ContainerType, SignatureForm, SignatureLevel};
use super::session::{SignedContent, SignerParameters, SigningConfiguration, SigningVariant};
use crate::infra::error::{GatewayError, GatewayResult};

/// Raw configuration form as submitted by the browser.
///
/// `documents` is filled from multipart file parts by the HTTP adapter and
/// is only used by the multi-document variant.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationForm {
    pub signature_form: Option<String>,
    pub signature_level: Option<String>,
    pub digest_algorithm: Option<String>,
    pub container_type: Option<String>,
    pub add_content_timestamp: Option<String>,
    pub document_name: Option<String>,
    pub digest_to_sign: Option<String>,
    #[serde(skip)]
    pub documents: Vec<FileDocument>,
}

impl ConfigurationForm {
    /// Checkbox semantics: present and truthy.
    #[must_use]
    pub fn wants_content_timestamp(&self) -> bool {
        self.add_content_timestamp
            .as_deref()
            .map(str::trim)
            .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "on" | "1" | "yes"))
    }

    /// Assign a text field by its wire name. Returns `false` for unknown
    /// names so multipart readers can skip them.
    pub fn set_text_field(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "signatureForm" => &mut self.signature_form,
            "signatureLevel" => &mut self.signature_level,
            "digestAlgorithm" => &mut self.digest_algorithm,
            "containerType" => &mut self.container_type,
            "addContentTimestamp" => &mut self.add_content_timestamp,
            "documentName" => &mut self.document_name,
            "digestToSign" => &mut self.digest_to_sign,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    /// Validate the form for `variant`, collecting every problem found.
    pub fn validate(&self, variant: SigningVariant) -> GatewayResult<SigningConfiguration> {
        let mut errors = Vec::new();

        let signature_form = match required(&self.signature_form, "signatureForm", &mut errors)
            .map(SignatureForm::parse)
        {
            Some(Ok(form)) if form.is_offered() => Some(form),
            Some(Ok(form)) => {
                errors.push(format!("signature form {form} is not offered"));
                None
            }
            Some(Err(e)) => {
                errors.push(e.to_string());
                None
            }
            None => None,
        };

        let signature_level = parse_field(
            required(&self.signature_level, "signatureLevel", &mut errors),
            SignatureLevel::parse,
            &mut errors,
        );

        let digest_algorithm = match parse_field(
            required(&self.digest_algorithm, "digestAlgorithm", &mut errors),
            DigestAlgorithm::parse,
            &mut errors,
        ) {
            Some(algo) if variant.allows_digest_algorithm(algo) => Some(algo),
            Some(algo) => {
                errors.push(format!(
                    "digest algorithm {algo} is not available for {variant} signing"
                ));
                None
            }
            None => None,
        };

        let content = match variant {
            SigningVariant::SingleDocument => self.digest_content(digest_algorithm, &mut errors),
            SigningVariant::MultiDocument => self.file_content(&mut errors),
        };

        match (signature_form, signature_level, digest_algorithm, content) {
            (Some(signature_form), Some(signature_level), Some(digest_algorithm), Some(content))
                if errors.is_empty() =>
            {
                Ok(SigningConfiguration {
                    signature_form,
                    signature_level,
                    digest_algorithm,
                    add_content_timestamp: self.wants_content_timestamp(),
                    content,
                })
            }
            _ => Err(GatewayError::InvalidConfiguration(errors)),
        }
    }

    fn digest_content(
        &self,
        digest_algorithm: Option<DigestAlgorithm>,
        errors: &mut Vec<String>,
    ) -> Option<SignedContent> {
        if self.container_type.as_deref().is_some_and(|c| !c.trim().is_empty()) {
            errors.push("containerType is not accepted for single-document signing".to_string());
        }

        let name = required(&self.document_name, "documentName", errors).map(str::to_string);
        let digest = required(&self.digest_to_sign, "digestToSign", errors).and_then(|encoded| {
            match base64::engine::general_purpose::STANDARD.decode(encoded) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    errors.push(format!("digestToSign is not valid base64: {e}"));
                    None
                }
            }
        });

        if let (Some(digest), Some(algo)) = (&digest, digest_algorithm) {
            if digest.len() != algo.digest_size() {
                errors.push(format!(
                    "digestToSign has {} bytes, {algo} digests have {}",
                    digest.len(),
                    algo.digest_size()
                ));
                return None;
            }
        }

        Some(SignedContent::Digest(DigestDocument {
            name: name?,
            digest: digest?,
        }))
    }

    fn file_content(&self, errors: &mut Vec<String>) -> Option<SignedContent> {
        let container = parse_field(
            required(&self.container_type, "containerType", errors),
            ContainerType::parse,
            errors,
        );

        if self.documents.is_empty() {
            errors.push("at least one document to sign is required".to_string());
            return None;
        }
        if self.documents.iter().any(|d| d.entry_name().trim().is_empty()) {
            errors.push("every document to sign needs a file name".to_string());
            return None;
        }
        let mut entries = HashSet::new();
        for document in &self.documents {
            let entry = document.entry_name();
            if entry.eq_ignore_ascii_case(MIMETYPE_ENTRY) {
                errors.push(format!("'{}' is a reserved container entry name", document.name));
                return None;
            }
            if !entries.insert(entry) {
                errors.push(format!("more than one document is named '{entry}'"));
                return None;
            }
        }

        let container = container?;
        if container == ContainerType::AsicS && self.documents.len() != 1 {
            errors.push(format!(
                "{container} holds exactly one document, {} were submitted",
                self.documents.len()
            ));
            return None;
        }

        Some(SignedContent::Files {
            container,
            documents: self.documents.clone(),
        })
    }
}

fn required<'a>(
    value: &'a Option<String>,
    field: &str,
    errors: &mut Vec<String>,
) -> Option<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            errors.push(format!("{field} is required"));
            None
        }
    }
}

fn parse_field<T, E: ToString>(
    value: Option<&str>,
    parse: impl FnOnce(&str) -> Result<T, E>,
    errors: &mut Vec<String>,
) -> Option<T> {
    match parse(value?) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            errors.push(e.to_string());
            None
        }
    }
}

/// Body of the get-data-to-sign call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataToSignParams {
    /// Base64 DER signing certificate.
    pub signing_certificate: String,
    /// Base64 DER certificates, leaf to root.
    #[serde(default)]
    pub certificate_chain: Vec<String>,
    pub encryption_algorithm: String,
}

impl DataToSignParams {
    /// Decode into signer parameters, keeping the chain order as submitted.
    pub fn decode(&self) -> GatewayResult<SignerParameters> {
        let engine = &base64::engine::general_purpose::STANDARD;

        let certificate = engine.decode(self.signing_certificate.trim())?;
        if certificate.is_empty() {
            return Err(GatewayError::InvalidInput(
                "signingCertificate is required".to_string(),
            ));
        }

        let chain = self
            .certificate_chain
            .iter()
            .enumerate()
            .map(|(index, encoded)| {
                engine.decode(encoded.trim()).map_err(|e| {
                    GatewayError::InvalidInput(format!(
                        "certificateChain[{index}] is not valid base64: {e}"
                    ))
                })
            })
            .collect::<GatewayResult<CertChain>>()?;

        let encryption_algorithm = EncryptionAlgorithm::parse(&self.encryption_algorithm)
            .map_err(|e| GatewayError::InvalidInput(e.to_string()))?;

        Ok(SignerParameters {
            signing_certificate: SigningCertificate::from_der(certificate),
            certificate_chain: chain,
            encryption_algorithm,
        })
    }
}

/// Response of the get-data-to-sign call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetDataToSignResponse {
    /// Base64 to-be-signed payload.
    pub data_to_sign: String,
}

/// Body of the sign-document call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureValueParams {
    /// Base64 raw signature value.
    pub signature_value: String,
}

impl SignatureValueParams {
    pub fn decode(&self) -> GatewayResult<SignatureValue> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(self.signature_value.trim())?;
        if bytes.is_empty() {
            return Err(GatewayError::InvalidInput(
                "signatureValue is required".to_string(),
            ));
        }
        Ok(SignatureValue::new(bytes))
    }
}

/// Response of the sign-document call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignDocumentResponse {
    pub url_to_download: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn digest_form() -> ConfigurationForm {
        ConfigurationForm {
            signature_form: Some("CAdES".to_string()),
            signature_level: Some("CAdES-BASELINE-B".to_string()),
            digest_algorithm: Some("SHA256".to_string()),
            document_name: Some("contract.pdf".to_string()),
            digest_to_sign: Some(b64(&[7u8; 32])),
            ..ConfigurationForm::default()
        }
    }

    fn file(name: &str) -> FileDocument {
        FileDocument {
            name: name.to_string(),
            bytes: b"hello".to_vec(),
            mime_type: None,
        }
    }

    #[test]
    fn test_valid_digest_form() {
        let config = digest_form()
            .validate(SigningVariant::SingleDocument)
            .unwrap();
        assert_eq!(config.signature_form, SignatureForm::CAdES);
        assert_eq!(config.digest_algorithm, DigestAlgorithm::Sha256);
        assert!(!config.add_content_timestamp);
        assert_eq!(config.variant(), SigningVariant::SingleDocument);
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        let err = ConfigurationForm::default()
            .validate(SigningVariant::SingleDocument)
            .unwrap_err();
        let GatewayError::InvalidConfiguration(messages) = err else {
            panic!("expected InvalidConfiguration");
        };
        for field in ["signatureForm", "signatureLevel", "digestAlgorithm", "documentName", "digestToSign"] {
            assert!(
                messages.iter().any(|m| m.contains(field)),
                "missing message for {field}: {messages:?}"
            );
        }
    }

    #[test]
    fn test_sha224_only_for_multi_document() {
        let mut form = digest_form();
        form.digest_algorithm = Some("SHA224".to_string());
        form.digest_to_sign = Some(b64(&[7u8; 28]));
        assert!(matches!(
            form.validate(SigningVariant::SingleDocument),
            Err(GatewayError::InvalidConfiguration(_))
        ));

        let multi = ConfigurationForm {
            signature_form: Some("XAdES".to_string()),
            signature_level: Some("XAdES-BASELINE-B".to_string()),
            digest_algorithm: Some("SHA224".to_string()),
            container_type: Some("ASiC-E".to_string()),
            documents: vec![file("a.txt"), file("b.txt")],
            ..ConfigurationForm::default()
        };
        let config = multi.validate(SigningVariant::MultiDocument).unwrap();
        assert_eq!(config.container_type(), Some(ContainerType::AsicE));
    }

    #[test]
    fn test_digest_length_must_match_algorithm() {
        let mut form = digest_form();
        form.digest_to_sign = Some(b64(&[7u8; 20]));
        assert!(form.validate(SigningVariant::SingleDocument).is_err());
    }

    #[test]
    fn test_unrecognized_container_type_rejected() {
        let form = ConfigurationForm {
            signature_form: Some("CAdES".to_string()),
            signature_level: Some("CAdES-BASELINE-B".to_string()),
            digest_algorithm: Some("SHA256".to_string()),
            container_type: Some("ASiC-Z".to_string()),
            documents: vec![file("a.txt")],
            ..ConfigurationForm::default()
        };
        let GatewayError::InvalidConfiguration(messages) =
            form.validate(SigningVariant::MultiDocument).unwrap_err()
        else {
            panic!("expected InvalidConfiguration");
        };
        assert!(messages.iter().any(|m| m.contains("ASiC-Z")));
    }

    #[test]
    fn test_asic_s_requires_single_document() {
        let form = ConfigurationForm {
            signature_form: Some("CAdES".to_string()),
            signature_level: Some("CAdES-BASELINE-B".to_string()),
            digest_algorithm: Some("SHA256".to_string()),
            container_type: Some("ASiC-S".to_string()),
            documents: vec![file("a.txt"), file("b.txt")],
            ..ConfigurationForm::default()
        };
        assert!(form.validate(SigningVariant::MultiDocument).is_err());
    }

    #[test]
    fn test_colliding_entry_names_rejected() {
        let container_form = |documents: Vec<FileDocument>| ConfigurationForm {
            signature_form: Some("XAdES".to_string()),
            signature_level: Some("XAdES-BASELINE-B".to_string()),
            digest_algorithm: Some("SHA256".to_string()),
            container_type: Some("ASiC-E".to_string()),
            documents,
            ..ConfigurationForm::default()
        };

        for documents in [
            vec![file("a.txt"), file("a.txt")],
            vec![file("x/a.txt"), file("y\\a.txt")],
            vec![file("mimetype")],
            vec![file("b.txt"), file("dir/")],
        ] {
            let names: Vec<String> = documents.iter().map(|d| d.name.clone()).collect();
            let err = container_form(documents)
                .validate(SigningVariant::MultiDocument)
                .unwrap_err();
            assert!(
                matches!(err, GatewayError::InvalidConfiguration(_)),
                "{names:?}: {err:?}"
            );
        }

        let ok = container_form(vec![file("x/a.txt"), file("y/b.txt")]);
        assert!(ok.validate(SigningVariant::MultiDocument).is_ok());
    }

    #[test]
    fn test_container_type_rejected_for_digest_variant() {
        let mut form = digest_form();
        form.container_type = Some("ASiC-E".to_string());
        assert!(form.validate(SigningVariant::SingleDocument).is_err());
    }

    #[test]
    fn test_checkbox_values() {
        let mut form = digest_form();
        form.add_content_timestamp = Some("on".to_string());
        assert!(form.wants_content_timestamp());
        form.add_content_timestamp = Some("false".to_string());
        assert!(!form.wants_content_timestamp());
    }

    #[test]
    fn test_data_to_sign_params_keep_chain_order() {
        let params = DataToSignParams {
            signing_certificate: b64(&[0x30, 0x01]),
            certificate_chain: vec![b64(&[3]), b64(&[1]), b64(&[2])],
            encryption_algorithm: "RSA".to_string(),
        };
        let decoded = params.decode().unwrap();
        let chain: Vec<&[u8]> = decoded.certificate_chain.iter_der().collect();
        assert_eq!(chain, vec![&[3u8][..], &[1u8][..], &[2u8][..]]);
        assert_eq!(decoded.encryption_algorithm, EncryptionAlgorithm::Rsa);
    }

    #[test]
    fn test_data_to_sign_params_reject_bad_chain_entry() {
        let params = DataToSignParams {
            signing_certificate: b64(&[0x30, 0x01]),
            certificate_chain: vec![b64(&[3]), "%%%".to_string()],
            encryption_algorithm: "RSA".to_string(),
        };
        let err = params.decode().unwrap_err();
        assert!(err.to_string().contains("certificateChain[1]"));
    }

    #[test]
    fn test_signature_value_must_not_be_empty() {
        let params = SignatureValueParams {
            signature_value: String::new(),
        };
        assert!(matches!(params.decode(), Err(GatewayError::InvalidInput(_))));
    }
}
