use std::fmt;

/// DER-encoded signing certificate as supplied by the signing agent.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningCertificate {
    der: Box<[u8]>,
}

/// One DER-encoded certificate of the supplied chain.
#[derive(Clone, PartialEq, Eq)]
pub struct ChainCertificate {
    der: Box<[u8]>,
}

/// Certificate chain exactly as the signing agent ordered it (leaf to root).
///
/// The chain is never sorted, deduplicated or trimmed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CertChain {
    certs: Vec<ChainCertificate>,
}

impl SigningCertificate {
    #[must_use]
    pub fn from_der(der: Vec<u8>) -> Self {
        Self {
            der: der.into_boxed_slice(),
        }
    }
    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }
}

impl ChainCertificate {
    #[must_use]
    pub fn from_der(der: Vec<u8>) -> Self {
        Self {
            der: der.into_boxed_slice(),
        }
    }
    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }
}

impl CertChain {
    #[must_use]
    pub fn new(certs: Vec<ChainCertificate>) -> Self {
        Self { certs }
    }
    #[must_use]
    pub fn certificates(&self) -> &[ChainCertificate] {
        &self.certs
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.certs.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }
    pub fn iter_der(&self) -> impl Iterator<Item = &[u8]> {
        self.certs.iter().map(ChainCertificate::as_der)
    }
}

impl FromIterator<Vec<u8>> for CertChain {
    fn from_iter<I: IntoIterator<Item = Vec<u8>>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(ChainCertificate::from_der).collect())
    }
}

impl fmt::Debug for SigningCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningCertificate(len={})", self.der.len())
    }
}
impl fmt::Debug for ChainCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainCertificate(len={})", self.der.len())
    }
}
impl fmt::Debug for CertChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CertChain(len={})", self.certs.len())
    }
}
