//! Documents flowing through a signing session: what the user submitted and
//! the finished artifact handed back by the engine.

use std::fmt;

/// Fallback content type for artifacts without a declared MIME type.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// First entry of every ASiC container; no document may take its name.
pub const MIMETYPE_ENTRY: &str = "mimetype";

/// A `type/subtype` media type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeType(String);

impl MimeType {
    /// Accepts `type/subtype` with optional parameters; returns `None` otherwise.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let essence = value.split(';').next().unwrap_or_default().trim();
        let (kind, subtype) = essence.split_once('/')?;
        if kind.is_empty() || subtype.is_empty() || value.chars().any(char::is_control) {
            return None;
        }
        Some(Self(value.to_string()))
    }

    /// Construct from a compile-time known media type.
    #[must_use]
    pub fn from_static(value: &'static str) -> Self {
        Self(value.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Single-document variant input: the document is never uploaded, only its
/// digest computed client side with the session's digest algorithm.
#[derive(Clone, PartialEq, Eq)]
pub struct DigestDocument {
    pub name: String,
    pub digest: Vec<u8>,
}

impl fmt::Debug for DigestDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DigestDocument(name={:?}, digest_len={})",
            self.name,
            self.digest.len()
        )
    }
}

/// Multi-document variant input: an uploaded file.
#[derive(Clone, PartialEq, Eq)]
pub struct FileDocument {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime_type: Option<MimeType>,
}

impl FileDocument {
    /// Container entry name: the upload's file name without any directory
    /// part a browser may have sent.
    #[must_use]
    pub fn entry_name(&self) -> &str {
        self.name.rsplit(['/', '\\']).next().unwrap_or(&self.name)
    }
}

impl fmt::Debug for FileDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FileDocument(name={:?}, len={}, mime={:?})",
            self.name,
            self.bytes.len(),
            self.mime_type.as_ref().map(MimeType::as_str)
        )
    }
}

/// Finished artifact produced by finalization.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedDocument {
    pub bytes: Vec<u8>,
    pub name: String,
    pub mime_type: Option<MimeType>,
}

impl SignedDocument {
    /// Declared content type or `application/octet-stream`.
    #[must_use]
    pub fn content_type(&self) -> &str {
        self.mime_type.as_ref().map_or(OCTET_STREAM, MimeType::as_str)
    }
}

impl fmt::Debug for SignedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SignedDocument(name={:?}, len={}, mime={:?})",
            self.name,
            self.bytes.len(),
            self.mime_type.as_ref().map(MimeType::as_str)
        )
    }
}
