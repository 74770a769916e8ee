//! Tracks the set of valid certificate policies along a chain

use alloc::collections::BTreeSet;
use alloc::format;

use const_oid::db::rfc5280::ANY_POLICY;
use const_oid::db::rfc5912::{
    ID_CE_CERTIFICATE_POLICIES, ID_CE_INHIBIT_ANY_POLICY, ID_CE_POLICY_CONSTRAINTS,
    ID_CE_POLICY_MAPPINGS,
};

use crate::util::error::*;
use crate::util::pdv_utilities::is_self_issued;
use crate::validator::cert_validator::*;
use crate::validator::pdv_extension::*;
use crate::{CertificateValidationContext, PDVCertificate};

/// `PolicyValidator` maintains the set of policies that are valid for the portion of the chain
/// processed so far, along with the explicit_policy, inhibit_any_policy and policy_mapping counters
/// from RFC 5280 section 6.1.2.
///
/// This is a flattened rendition of the valid_policy_tree: only the set of valid policy OIDs is kept,
/// without qualifiers or the expected_policy_set of each node.
pub struct PolicyValidator {
    path_length: usize,
    current_cert_index: usize,
    skip_trust_anchor: bool,
    valid_policy_set: Option<ObjectIdentifierSet>,
    explicit_policy: u32,
    inhibit_any_policy: u32,
    policy_mapping: u32,
}

impl PolicyValidator {
    /// Instantiates a validator for a chain with path_length walked certificates.
    pub fn new(ctx: &CertificateValidationContext, path_length: usize) -> Self {
        // RFC 5280 6.1.2 (d), (e) and (f)
        let initial = |inhibited: bool| {
            if inhibited {
                0
            } else {
                u32::try_from(path_length).unwrap_or(u32::MAX).saturating_add(1)
            }
        };
        PolicyValidator {
            path_length,
            current_cert_index: 0,
            skip_trust_anchor: false,
            valid_policy_set: Some(ctx.initial_policies.clone()),
            explicit_policy: initial(ctx.explicit_policy_required),
            inhibit_any_policy: initial(ctx.any_policy_inhibited),
            policy_mapping: initial(ctx.policy_mapping_inhibited),
        }
    }

    /// Excludes a walked trust anchor from processing. The counters were initialized from a path
    /// length that includes it, so each drops by one to reflect n + 1.
    fn skip_walked_trust_anchor(&mut self) {
        self.skip_trust_anchor = true;
        self.explicit_policy = self.explicit_policy.saturating_sub(1);
        self.inhibit_any_policy = self.inhibit_any_policy.saturating_sub(1);
        self.policy_mapping = self.policy_mapping.saturating_sub(1);
    }

    /// RFC 5280 6.1.3 (d) and (e)
    fn process_policies(&mut self, cert: &PDVCertificate, is_leaf: bool) -> Result<()> {
        let valid = match &self.valid_policy_set {
            Some(valid) => valid,
            None => return Ok(()),
        };

        let policies = match cert.get_extension(&ID_CE_CERTIFICATE_POLICIES)? {
            Some(PDVExtension::CertificatePolicies(cp)) => cp,
            _ => {
                self.valid_policy_set = None;
                return Ok(());
            }
        };

        let asserts_any = policies.0.iter().any(|p| p.policy_identifier == ANY_POLICY);
        let honor_any = asserts_any
            && (self.inhibit_any_policy > 0 || (!is_leaf && is_self_issued(&cert.decoded_cert)));

        let mut next = BTreeSet::new();
        for p in policies.0.iter() {
            let oid = p.policy_identifier;
            if oid != ANY_POLICY && (valid.contains(&oid) || valid.contains(&ANY_POLICY)) {
                next.insert(oid);
            }
        }
        if honor_any {
            next.extend(valid.iter().copied());
        }

        self.valid_policy_set = if next.is_empty() { None } else { Some(next) };
        Ok(())
    }

    /// RFC 5280 6.1.4 (a) and (b)
    fn process_mappings(&mut self, cert: &PDVCertificate) -> Result<()> {
        let mappings = match cert.get_extension(&ID_CE_POLICY_MAPPINGS)? {
            Some(PDVExtension::PolicyMappings(pm)) => pm,
            _ => return Ok(()),
        };
        let valid = match &mut self.valid_policy_set {
            Some(valid) => valid,
            None => return Ok(()),
        };

        for m in mappings.0.iter() {
            let (issuer, subject) = (m.issuer_domain_policy, m.subject_domain_policy);
            if issuer == ANY_POLICY || subject == ANY_POLICY {
                continue;
            }
            if self.policy_mapping > 0 {
                if valid.remove(&issuer) || valid.contains(&ANY_POLICY) {
                    valid.insert(subject);
                }
            } else {
                valid.remove(&issuer);
            }
        }
        if valid.is_empty() {
            self.valid_policy_set = None;
        }
        Ok(())
    }

    /// RFC 5280 6.1.4 (h), (i) and (j)
    fn update_counters(&mut self, cert: &PDVCertificate) -> Result<()> {
        if !is_self_issued(&cert.decoded_cert) {
            self.explicit_policy = self.explicit_policy.saturating_sub(1);
            self.inhibit_any_policy = self.inhibit_any_policy.saturating_sub(1);
            self.policy_mapping = self.policy_mapping.saturating_sub(1);
        }
        if let Some(PDVExtension::PolicyConstraints(pc)) =
            cert.get_extension(&ID_CE_POLICY_CONSTRAINTS)?
        {
            if let Some(rep) = pc.require_explicit_policy {
                self.explicit_policy = self.explicit_policy.min(rep);
            }
            if let Some(ipm) = pc.inhibit_policy_mapping {
                self.policy_mapping = self.policy_mapping.min(ipm);
            }
        }
        if let Some(PDVExtension::InhibitAnyPolicy(iap)) =
            cert.get_extension(&ID_CE_INHIBIT_ANY_POLICY)?
        {
            self.inhibit_any_policy = self.inhibit_any_policy.min(iap.0);
        }
        Ok(())
    }
}

impl CertificateValidator for PolicyValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::Policy
    }

    fn check(&mut self, cert: &PDVCertificate, unclaimed: &mut ObjectIdentifierSet) -> Result<()> {
        unclaimed.remove(&ID_CE_CERTIFICATE_POLICIES);
        unclaimed.remove(&ID_CE_POLICY_MAPPINGS);
        unclaimed.remove(&ID_CE_POLICY_CONSTRAINTS);
        unclaimed.remove(&ID_CE_INHIBIT_ANY_POLICY);
        let index = self.current_cert_index;
        self.current_cert_index += 1;

        // policies asserted by a trust anchor are not processed
        if index == 0 && self.skip_trust_anchor {
            return Ok(());
        }

        let is_leaf = index + 1 >= self.path_length;
        self.process_policies(cert, is_leaf)?;

        if !is_leaf {
            self.process_mappings(cert)?;
            return self.update_counters(cert);
        }

        // 6.1.5 wrap-up procedure
        self.explicit_policy = self.explicit_policy.saturating_sub(1);
        if let Some(PDVExtension::PolicyConstraints(pc)) =
            cert.get_extension(&ID_CE_POLICY_CONSTRAINTS)?
        {
            if pc.require_explicit_policy == Some(0) {
                self.explicit_policy = 0;
            }
        }
        if self.explicit_policy == 0 && self.valid_policy_set.is_none() {
            return Err(Error::CertificateChain(format!(
                "No valid certificate policy at cert index {}.",
                index
            )));
        }
        Ok(())
    }

    fn check_trust_anchor(&mut self, link: &TrustAnchorLink<'_>) -> Result<()> {
        if link.walked {
            self.skip_walked_trust_anchor();
        }
        Ok(())
    }
}
