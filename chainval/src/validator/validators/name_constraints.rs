//! Enforces the nameConstraints extension per RFC 5280 section 6.1.3 (b) and (c) and 6.1.4 (g)

use alloc::format;
use alloc::vec::Vec;

use const_oid::db::rfc5912::{ID_CE_NAME_CONSTRAINTS, ID_CE_SUBJECT_ALT_NAME};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::SubjectAltName;

use crate::util::error::*;
use crate::util::pdv_utilities::{general_name_to_string, is_self_issued};
use crate::validator::cert_validator::*;
use crate::validator::general_names::*;
use crate::validator::name_constraints_set::*;
use crate::validator::pdv_extension::*;
use crate::{CertificateValidationContext, PDVCertificate};

/// `NameConstraintsValidator` accumulates the name constraints asserted along the chain and checks
/// the names of each subsequent certificate against them.
///
/// The names checked are the subject DN (when not empty), any emailAddress attributes in the
/// subject and each SubjectAltName entry. Self-issued intermediate certificates are exempt.
pub struct NameConstraintsValidator {
    path_length: usize,
    current_cert_index: usize,
    previous_name_constraints: Option<NameConstraintsState>,
    enforce_trust_anchor_constraints: bool,
}

impl NameConstraintsValidator {
    /// Instantiates a validator for a chain with path_length walked certificates.
    pub fn new(ctx: &CertificateValidationContext, path_length: usize) -> Self {
        NameConstraintsValidator {
            path_length,
            current_cert_index: 0,
            previous_name_constraints: None,
            enforce_trust_anchor_constraints: ctx.enforce_trust_anchor_constraints,
        }
    }

    /// Folds a NameConstraints extension into the accumulated state. On first admission the
    /// extension must be critical.
    fn absorb(&mut self, incoming: NameConstraintsState) -> Result<()> {
        match &mut self.previous_name_constraints {
            Some(previous) => previous.merge_with(&incoming),
            None => {
                if !incoming.critical {
                    return Err(Error::NameConstraints(
                        "NameConstraints extension must be critical.".into(),
                    ));
                }
                self.previous_name_constraints = Some(incoming);
                Ok(())
            }
        }
    }
}

fn malformed_san(index: usize) -> Error {
    Error::NameConstraints(format!(
        "Malformed SubjectAltName entry in certificate at index {}.",
        index
    ))
}

/// `names_to_check` returns the names in cert that are subject to name constraints.
fn names_to_check(cert: &PDVCertificate, san: Option<&SubjectAltName>) -> Vec<GeneralName> {
    let subject = &cert.decoded_cert.tbs_certificate.subject;
    let mut names = Vec::new();
    if !subject.0.is_empty() {
        names.push(GeneralName::DirectoryName(subject.clone()));
    }
    names.extend(subject_email_addresses(subject));
    if let Some(san) = san {
        names.extend(san.0.iter().cloned());
    }
    names
}

impl CertificateValidator for NameConstraintsValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::NameConstraints
    }

    fn check(&mut self, cert: &PDVCertificate, unclaimed: &mut ObjectIdentifierSet) -> Result<()> {
        unclaimed.remove(&ID_CE_NAME_CONSTRAINTS);
        let index = self.current_cert_index;
        self.current_cert_index += 1;
        let is_leaf = index + 1 >= self.path_length;

        if let Some(previous) = &self.previous_name_constraints {
            if previous.has_malformed_names() {
                return Err(Error::NameConstraints(format!(
                    "Invalid GeneralName in name constraints inherited by cert index {}.",
                    index
                )));
            }
        }

        let san = match cert.get_extension(&ID_CE_SUBJECT_ALT_NAME) {
            Ok(Some(PDVExtension::SubjectAltName(san))) => Some(san),
            Ok(_) => None,
            Err(_) => return Err(malformed_san(index)),
        };
        if let Some(san) = san {
            if san
                .0
                .iter()
                .any(|gn| !general_name_is_well_formed(gn, NameUsage::SubjectAltName))
            {
                return Err(malformed_san(index));
            }
        }

        // (b) and (c) apply to the leaf and to certificates that are not self-issued
        if let Some(previous) = &self.previous_name_constraints {
            if is_leaf || !is_self_issued(&cert.decoded_cert) {
                for name in names_to_check(cert, san) {
                    if !previous.permits(&name) {
                        return Err(Error::NameConstraints(format!(
                            "Name {} is not within permitted subtrees at cert index {}.",
                            general_name_to_string(&name),
                            index
                        )));
                    }
                    if previous.excludes(&name) {
                        return Err(Error::NameConstraints(format!(
                            "Name {} is within excluded subtrees at cert index {}.",
                            general_name_to_string(&name),
                            index
                        )));
                    }
                }
            }
        }

        let nc = cert.get_extension(&ID_CE_NAME_CONSTRAINTS).map_err(|_| {
            Error::NameConstraints(format!(
                "Invalid NameConstraints extension in certificate at index {}.",
                index
            ))
        })?;
        if let Some(PDVExtension::NameConstraints(nc)) = nc {
            if is_leaf {
                return Err(Error::NameConstraints(
                    "Leaf certificate must not contain a NameConstraints extension.".into(),
                ));
            }
            // (g)  If a name constraints extension is included in the certificate, modify the
            //      permitted_subtrees and excluded_subtrees state variables.
            let critical = cert.extension_criticality(&ID_CE_NAME_CONSTRAINTS) == Some(true);
            self.absorb(NameConstraintsState::from_extension(nc, critical))?;
        }
        Ok(())
    }

    fn check_trust_anchor(&mut self, link: &TrustAnchorLink<'_>) -> Result<()> {
        if link.walked || !self.enforce_trust_anchor_constraints {
            return Ok(());
        }
        if let Some(PDVExtension::NameConstraints(nc)) =
            link.anchor.get_extension(&ID_CE_NAME_CONSTRAINTS)?
        {
            // constraints conveyed by a trust anchor are authoritative regardless of criticality
            self.previous_name_constraints = Some(NameConstraintsState::from_extension(nc, true));
        }
        Ok(())
    }
}
