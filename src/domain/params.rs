//! Signature parameter enumerations.
//!
//! Every enum offered on a configuration form has an explicit `parse`
//! function returning the typed value or a [`ParseError`] naming the
//! rejected literal. Parsing is case-insensitive and treats `-` and `_` as
//! the same separator; nothing else is coerced.

use std::fmt;
use std::str::FromStr;

/// Which enumeration a literal failed to parse as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    SignatureForm,
    SignatureLevel,
    DigestAlgorithm,
    EncryptionAlgorithm,
    ContainerType,
}

impl ParseErrorKind {
    #[must_use]
    pub fn field_name(&self) -> &'static str {
        match self {
            ParseErrorKind::SignatureForm => "signatureForm",
            ParseErrorKind::SignatureLevel => "signatureLevel",
            ParseErrorKind::DigestAlgorithm => "digestAlgorithm",
            ParseErrorKind::EncryptionAlgorithm => "encryptionAlgorithm",
            ParseErrorKind::ContainerType => "containerType",
        }
    }
}

/// A literal that is not a member of the requested enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized {} value '{literal}'", .kind.field_name())]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub literal: String,
}

impl ParseError {
    #[must_use]
    pub fn new(kind: ParseErrorKind, literal: impl Into<String>) -> Self {
        Self {
            kind,
            literal: literal.into(),
        }
    }
}

/// Canonical comparison form of an enum literal.
pub(crate) fn normalize_literal(literal: &str) -> String {
    literal.trim().to_ascii_uppercase().replace('-', "_")
}

/// Signature packaging family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureForm {
    CAdES,
    XAdES,
    PAdES,
}

impl SignatureForm {
    /// Forms offered by the remote signing workflows.
    pub const OFFERED: [SignatureForm; 2] = [SignatureForm::CAdES, SignatureForm::XAdES];

    pub fn parse(literal: &str) -> Result<Self, ParseError> {
        match normalize_literal(literal).as_str() {
            "CADES" => Ok(Self::CAdES),
            "XADES" => Ok(Self::XAdES),
            "PADES" => Ok(Self::PAdES),
            _ => Err(ParseError::new(ParseErrorKind::SignatureForm, literal)),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureForm::CAdES => "CAdES",
            SignatureForm::XAdES => "XAdES",
            SignatureForm::PAdES => "PAdES",
        }
    }

    #[must_use]
    pub fn is_offered(&self) -> bool {
        Self::OFFERED.contains(self)
    }
}

/// Baseline profile level, e.g. `XAdES-BASELINE-B`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureLevel {
    CadesBaselineB,
    CadesBaselineT,
    CadesBaselineLt,
    CadesBaselineLta,
    XadesBaselineB,
    XadesBaselineT,
    XadesBaselineLt,
    XadesBaselineLta,
}

impl SignatureLevel {
    pub const ALL: [SignatureLevel; 8] = [
        SignatureLevel::CadesBaselineB,
        SignatureLevel::CadesBaselineT,
        SignatureLevel::CadesBaselineLt,
        SignatureLevel::CadesBaselineLta,
        SignatureLevel::XadesBaselineB,
        SignatureLevel::XadesBaselineT,
        SignatureLevel::XadesBaselineLt,
        SignatureLevel::XadesBaselineLta,
    ];

    pub fn parse(literal: &str) -> Result<Self, ParseError> {
        let normalized = normalize_literal(literal);
        Self::ALL
            .into_iter()
            .find(|level| normalize_literal(level.as_str()) == normalized)
            .ok_or_else(|| ParseError::new(ParseErrorKind::SignatureLevel, literal))
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureLevel::CadesBaselineB => "CAdES-BASELINE-B",
            SignatureLevel::CadesBaselineT => "CAdES-BASELINE-T",
            SignatureLevel::CadesBaselineLt => "CAdES-BASELINE-LT",
            SignatureLevel::CadesBaselineLta => "CAdES-BASELINE-LTA",
            SignatureLevel::XadesBaselineB => "XAdES-BASELINE-B",
            SignatureLevel::XadesBaselineT => "XAdES-BASELINE-T",
            SignatureLevel::XadesBaselineLt => "XAdES-BASELINE-LT",
            SignatureLevel::XadesBaselineLta => "XAdES-BASELINE-LTA",
        }
    }
}

/// ASiC container kinds for multi-document signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerType {
    /// Simple container: one signed data object.
    AsicS,
    /// Extended container: any number of signed data objects.
    AsicE,
}

impl ContainerType {
    pub const ALL: [ContainerType; 2] = [ContainerType::AsicS, ContainerType::AsicE];

    pub fn parse(literal: &str) -> Result<Self, ParseError> {
        match normalize_literal(literal).as_str() {
            "ASIC_S" => Ok(Self::AsicS),
            "ASIC_E" => Ok(Self::AsicE),
            _ => Err(ParseError::new(ParseErrorKind::ContainerType, literal)),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerType::AsicS => "ASiC-S",
            ContainerType::AsicE => "ASiC-E",
        }
    }

    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        match self {
            ContainerType::AsicS => "application/vnd.etsi.asic-s+zip",
            ContainerType::AsicE => "application/vnd.etsi.asic-e+zip",
        }
    }

    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            ContainerType::AsicS => "asics",
            ContainerType::AsicE => "asice",
        }
    }
}

macro_rules! impl_literal_traits {
    ($($ty:ty),*) => {
        $(
            impl FromStr for $ty {
                type Err = ParseError;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    Self::parse(s)
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

impl_literal_traits!(SignatureForm, SignatureLevel, ContainerType);
