//! Requires subject and authority key identifiers to be present and non-critical

use alloc::format;

use const_oid::db::rfc5912::{ID_CE_AUTHORITY_KEY_IDENTIFIER, ID_CE_SUBJECT_KEY_IDENTIFIER};

use crate::util::error::*;
use crate::util::pdv_utilities::is_self_issued;
use crate::validator::cert_validator::*;
use crate::validator::pdv_extension::*;
use crate::{CertificateValidationContext, PDVCertificate};

/// `KeyIdentifierValidator` requires a non-critical SubjectKeyIdentifier extension in every certificate
/// and a non-critical AuthorityKeyIdentifier extension in the certificate issued by the trust anchor.
pub struct KeyIdentifierValidator {
    current_cert_index: usize,
}

impl KeyIdentifierValidator {
    /// Instantiates a validator.
    pub fn new(_ctx: &CertificateValidationContext, _path_length: usize) -> Self {
        KeyIdentifierValidator {
            current_cert_index: 0,
        }
    }
}

/// Maps the criticality of an AuthorityKeyIdentifier extension to a result. `place` names where the
/// extension was expected.
fn require_aki(criticality: Option<bool>, place: &str) -> Result<()> {
    match criticality {
        None => Err(Error::CertificateChain(format!(
            "Missing AuthorityKeyIdentifier extension in {}.",
            place
        ))),
        Some(true) => Err(Error::CertificateChain(format!(
            "AuthorityKeyIdentifier extension must not be critical in {}.",
            place
        ))),
        Some(false) => Ok(()),
    }
}

impl CertificateValidator for KeyIdentifierValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::KeyIdentifier
    }

    fn check(&mut self, cert: &PDVCertificate, unclaimed: &mut ObjectIdentifierSet) -> Result<()> {
        unclaimed.remove(&ID_CE_SUBJECT_KEY_IDENTIFIER);
        unclaimed.remove(&ID_CE_AUTHORITY_KEY_IDENTIFIER);
        let index = self.current_cert_index;
        self.current_cert_index += 1;

        match cert.extension_criticality(&ID_CE_SUBJECT_KEY_IDENTIFIER) {
            None => Err(Error::CertificateChain(format!(
                "Missing SubjectKeyIdentifier extension in certificate at index {}.",
                index
            ))),
            Some(true) => Err(Error::CertificateChain(format!(
                "SubjectKeyIdentifier extension must not be critical in certificate at index {}.",
                index
            ))),
            Some(false) => Ok(()),
        }
    }

    fn check_trust_anchor(&mut self, link: &TrustAnchorLink<'_>) -> Result<()> {
        if let Some(ta_cert) = link.anchor.certificate() {
            if !is_self_issued(ta_cert) {
                require_aki(
                    is_critical(
                        ta_cert.tbs_certificate.extensions.as_deref(),
                        &ID_CE_AUTHORITY_KEY_IDENTIFIER,
                    ),
                    "trust anchor",
                )?;
            }
        }
        match link.child {
            Some(child) => require_aki(
                child.extension_criticality(&ID_CE_AUTHORITY_KEY_IDENTIFIER),
                &format!("certificate at index {}", link.child_index),
            ),
            None => Ok(()),
        }
    }
}
