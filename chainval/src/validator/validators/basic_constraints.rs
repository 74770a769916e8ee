//! Enforces the basicConstraints extension per RFC 5280 section 6.1.4 (k), (l) and (m)

use alloc::format;

use const_oid::db::rfc5912::ID_CE_BASIC_CONSTRAINTS;

use crate::util::error::*;
use crate::util::pdv_utilities::is_self_issued;
use crate::validator::cert_validator::*;
use crate::validator::pdv_extension::*;
use crate::{CertificateValidationContext, PDVCertificate};

/// `BasicConstraintsValidator` requires every certificate other than the leaf to be a CA certificate
/// and tracks the remaining path length.
pub struct BasicConstraintsValidator {
    path_length: usize,
    current_cert_index: usize,
    remaining_path_length: Option<u8>,
    enforce_trust_anchor_constraints: bool,
}

impl BasicConstraintsValidator {
    /// Instantiates a validator for a chain with path_length walked certificates.
    pub fn new(ctx: &CertificateValidationContext, path_length: usize) -> Self {
        BasicConstraintsValidator {
            path_length,
            current_cert_index: 0,
            remaining_path_length: None,
            enforce_trust_anchor_constraints: ctx.enforce_trust_anchor_constraints,
        }
    }
}

impl CertificateValidator for BasicConstraintsValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::BasicConstraints
    }

    fn check(&mut self, cert: &PDVCertificate, unclaimed: &mut ObjectIdentifierSet) -> Result<()> {
        unclaimed.remove(&ID_CE_BASIC_CONSTRAINTS);
        let index = self.current_cert_index;
        self.current_cert_index += 1;

        if index + 1 >= self.path_length {
            return Ok(());
        }

        // (k)  verify that the basicConstraints extension is present and that cA is set to TRUE
        let bc = match cert.get_extension(&ID_CE_BASIC_CONSTRAINTS)? {
            Some(PDVExtension::BasicConstraints(bc)) => bc,
            _ => {
                return Err(Error::BasicConstraints(format!(
                    "Missing basicConstraints extension at cert index {}.",
                    index
                )))
            }
        };
        if cert.extension_criticality(&ID_CE_BASIC_CONSTRAINTS) != Some(true) {
            return Err(Error::BasicConstraints(format!(
                "basicConstraints extension must be critical at cert index {}.",
                index
            )));
        }
        if !bc.ca {
            return Err(Error::BasicConstraints(format!(
                "Missing CA flag at cert index {}.",
                index
            )));
        }

        // (l)  If the certificate was not self-issued, verify that max_path_length is greater than
        //      zero and decrement max_path_length by 1.
        if !is_self_issued(&cert.decoded_cert) {
            if let Some(remaining) = self.remaining_path_length {
                if remaining == 0 {
                    return Err(Error::BasicConstraints(format!(
                        "pathLenConstraint violated at cert index {}.",
                        index
                    )));
                }
                self.remaining_path_length = Some(remaining - 1);
            }
        }

        // (m)  If pathLenConstraint is present in the certificate and is less than max_path_length,
        //      set max_path_length to the value of pathLenConstraint.
        if let Some(pl) = bc.path_len_constraint {
            self.remaining_path_length = Some(match self.remaining_path_length {
                Some(remaining) => remaining.min(pl),
                None => pl,
            });
        }
        Ok(())
    }

    fn check_trust_anchor(&mut self, link: &TrustAnchorLink<'_>) -> Result<()> {
        if !link.walked && self.enforce_trust_anchor_constraints {
            self.remaining_path_length = link.anchor.path_length_constraint();
        }
        Ok(())
    }
}
