//! Enforces the keyUsage extension in CA certificates and the extKeyUsage extension in the leaf

use alloc::format;

use const_oid::db::rfc5280::ANY_EXTENDED_KEY_USAGE;
use const_oid::db::rfc5912::{ID_CE_EXT_KEY_USAGE, ID_CE_KEY_USAGE, ID_CE_SUBJECT_ALT_NAME};
use x509_cert::ext::pkix::KeyUsages;

use crate::util::error::*;
use crate::validator::cert_validator::*;
use crate::validator::pdv_extension::*;
use crate::{CertificateValidationContext, PDVCertificate};

/// `KeyUsageValidator` requires keyCertSign and cRLSign in every certificate above the leaf and,
/// when the context names expected extended key usages, checks the leaf's extKeyUsage extension.
///
/// The subjectAltName extension is claimed here too. Its contents are checked by
/// [`NameConstraintsValidator`](crate::NameConstraintsValidator).
pub struct KeyUsageValidator {
    path_length: usize,
    current_cert_index: usize,
    expected_ekus: ObjectIdentifierSet,
}

impl KeyUsageValidator {
    /// Instantiates a validator for a chain with path_length walked certificates.
    pub fn new(ctx: &CertificateValidationContext, path_length: usize) -> Self {
        KeyUsageValidator {
            path_length,
            current_cert_index: 0,
            expected_ekus: ctx.expected_ekus.clone(),
        }
    }

    fn check_leaf_eku(&self, cert: &PDVCertificate, index: usize) -> Result<()> {
        if self.expected_ekus.is_empty() || self.expected_ekus.contains(&ANY_EXTENDED_KEY_USAGE) {
            return Ok(());
        }
        if let Some(PDVExtension::ExtendedKeyUsage(ekus)) =
            cert.get_extension(&ID_CE_EXT_KEY_USAGE)?
        {
            let acceptable = ekus
                .0
                .iter()
                .any(|eku| *eku == ANY_EXTENDED_KEY_USAGE || self.expected_ekus.contains(eku));
            if !acceptable {
                return Err(Error::KeyUsage(format!(
                    "Extended key usage violation at cert index {}.",
                    index
                )));
            }
        }
        Ok(())
    }
}

impl CertificateValidator for KeyUsageValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::KeyUsage
    }

    fn check(&mut self, cert: &PDVCertificate, unclaimed: &mut ObjectIdentifierSet) -> Result<()> {
        unclaimed.remove(&ID_CE_KEY_USAGE);
        unclaimed.remove(&ID_CE_EXT_KEY_USAGE);
        unclaimed.remove(&ID_CE_SUBJECT_ALT_NAME);
        let index = self.current_cert_index;
        self.current_cert_index += 1;

        if index + 1 >= self.path_length {
            return self.check_leaf_eku(cert, index);
        }

        // (n)  If a key usage extension is present, verify that the keyCertSign bit is set.
        let ku = match cert.get_extension(&ID_CE_KEY_USAGE)? {
            Some(PDVExtension::KeyUsage(ku)) => ku,
            _ => {
                return Err(Error::KeyUsage(format!(
                    "Missing KeyUsage extension at cert index {}.",
                    index
                )))
            }
        };
        for bit in [KeyUsages::KeyCertSign, KeyUsages::CRLSign] {
            if !ku.0.contains(bit) {
                return Err(Error::KeyUsage(format!(
                    "Missing KeyUsage {:?} at cert index {}.",
                    bit, index
                )));
            }
        }
        Ok(())
    }
}
