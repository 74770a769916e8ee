//! Requires each certificate's issuer name to match the subject name of the certificate above it

use alloc::format;

use x509_cert::name::Name;

use crate::util::error::*;
use crate::util::pdv_utilities::compare_names;
use crate::validator::cert_validator::*;
use crate::validator::pdv_extension::*;
use crate::{CertificateValidationContext, PDVCertificate};

/// `NameChainingValidator` implements RFC 5280 section 6.1.3 (a)(4). The first certificate is
/// compared with the trust anchor name unless the anchor itself is walked.
pub struct NameChainingValidator {
    current_cert_index: usize,
    working_issuer_name: Option<Name>,
}

impl NameChainingValidator {
    /// Instantiates a validator.
    pub fn new(_ctx: &CertificateValidationContext, _path_length: usize) -> Self {
        NameChainingValidator {
            current_cert_index: 0,
            working_issuer_name: None,
        }
    }
}

impl CertificateValidator for NameChainingValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::NameChaining
    }

    fn check(&mut self, cert: &PDVCertificate, _unclaimed: &mut ObjectIdentifierSet) -> Result<()> {
        let index = self.current_cert_index;
        self.current_cert_index += 1;
        let tbs = &cert.decoded_cert.tbs_certificate;

        let previous = self.working_issuer_name.replace(tbs.subject.clone());
        match previous {
            Some(issuer_name) if !compare_names(&issuer_name, &tbs.issuer) => {
                Err(Error::CertificateChain(format!(
                    "Issuer of certificate at index {} does not match subject of its issuer.",
                    index
                )))
            }
            _ => Ok(()),
        }
    }

    fn check_trust_anchor(&mut self, link: &TrustAnchorLink<'_>) -> Result<()> {
        if !link.walked {
            self.working_issuer_name = Some(link.anchor.name()?.clone());
        }
        Ok(())
    }
}
