//! Provides structure that represents the certificate chain presented for validation.

use alloc::vec::Vec;

use x509_cert::Certificate;

use crate::{util::error::*, PDVCertificate};

/// `CertificateChain` is used to represent the certificates presented for validation, leaf first,
/// i.e., `certificates\[0\]` is the leaf, `certificates\[1\]` issued the leaf, and so on until the
/// last element, which either is or was issued by a trust anchor.
///
/// Validators see the chain in the opposite order via [`CertificateChain::iter_anchor_to_leaf`].
#[derive(Clone, Debug, Eq, PartialEq)]
#[readonly::make]
pub struct CertificateChain {
    /// `certificates` contains the chain, leaf first
    #[readonly]
    pub certificates: Vec<PDVCertificate>,
}

impl CertificateChain {
    /// instantiates a new CertificateChain from certificates ordered leaf first
    pub fn new(certificates: Vec<PDVCertificate>) -> CertificateChain {
        CertificateChain { certificates }
    }

    /// instantiates a new CertificateChain from decoded certificates ordered leaf first
    pub fn from_certificates(certificates: Vec<Certificate>) -> Result<CertificateChain> {
        let certificates = certificates
            .into_iter()
            .map(PDVCertificate::try_from)
            .collect::<core::result::Result<Vec<_>, _>>()?;
        Ok(CertificateChain { certificates })
    }

    /// number of certificates in the chain
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// true if the chain contains no certificates
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// the leaf (target) certificate
    pub fn leaf(&self) -> Option<&PDVCertificate> {
        self.certificates.first()
    }

    /// the certificate closest to the trust anchor
    pub fn root_most(&self) -> Option<&PDVCertificate> {
        self.certificates.last()
    }

    /// iterates over the chain beginning with the certificate closest to the trust anchor
    pub fn iter_anchor_to_leaf(&self) -> impl Iterator<Item = &PDVCertificate> + '_ {
        self.certificates.iter().rev()
    }
}
