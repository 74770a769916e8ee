//! Structures and functions related to configuring certificate chain validation

use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use std::path::Path;

use const_oid::db::rfc5280::ANY_POLICY;
use log::error;
use serde::{Deserialize, Serialize};

use crate::util::error::*;
use crate::util::time_of_interest::TimeOfInterest;
use crate::validator::pdv_extension::ObjectIdentifierSet;
use crate::PDVTrustAnchorChoice;

/// `CertificateValidationContext` carries the inputs to chain validation other than the chain itself.
///
/// The context can be serialized to and from JSON. Trust anchors are not serialized and must be
/// supplied separately, i.e., via [`CertificateValidationContext::new`] or by assigning
/// `trust_anchors` after [`read_context`](CertificateValidationContext::read_context).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateValidationContext {
    /// Trust anchors against which chains are validated
    #[serde(skip)]
    pub trust_anchors: Vec<PDVTrustAnchorChoice>,
    /// Time at which validity periods are evaluated. A disabled time skips the check.
    pub date: TimeOfInterest,
    /// When true, the root-most certificate of a chain may itself be a configured trust anchor
    pub allow_included_trust_anchor: bool,
    /// Extended key usages acceptable for the leaf certificate. Empty means any.
    #[serde(with = "oid_set")]
    pub expected_ekus: ObjectIdentifierSet,
    /// When true, a chain must end with at least one valid certificate policy
    pub explicit_policy_required: bool,
    /// Policies acceptable to the relying party
    #[serde(with = "oid_set")]
    pub initial_policies: ObjectIdentifierSet,
    /// When true, anyPolicy is not honored in non-self-issued intermediate certificates
    pub any_policy_inhibited: bool,
    /// When true, policy mappings are not honored
    pub policy_mapping_inhibited: bool,
    /// When true, constraints expressed by trust anchors are enforced
    pub enforce_trust_anchor_constraints: bool,
}

impl Default for CertificateValidationContext {
    fn default() -> Self {
        CertificateValidationContext {
            trust_anchors: Vec::new(),
            date: TimeOfInterest::now(),
            allow_included_trust_anchor: true,
            expected_ekus: BTreeSet::new(),
            explicit_policy_required: false,
            initial_policies: BTreeSet::from([ANY_POLICY]),
            any_policy_inhibited: false,
            policy_mapping_inhibited: false,
            enforce_trust_anchor_constraints: false,
        }
    }
}

impl CertificateValidationContext {
    /// Instantiates a context with default settings and the given trust anchors.
    pub fn new(trust_anchors: Vec<PDVTrustAnchorChoice>) -> Self {
        CertificateValidationContext {
            trust_anchors,
            ..Default::default()
        }
    }

    /// `read_context` reads a context from a file containing JSON. Trust anchors are left empty.
    pub fn read_context(path: &Path) -> Result<Self> {
        let json = std::fs::read(path)?;
        match serde_json::from_slice(&json) {
            Ok(ctx) => Ok(ctx),
            Err(e) => {
                error!(
                    "Failed to parse validation context from {}: {}",
                    path.display(),
                    e
                );
                Err(Error::ParseError)
            }
        }
    }
}

/// Serializes a set of object identifiers as a list of dotted decimal strings.
mod oid_set {
    use alloc::string::{String, ToString};
    use alloc::vec::Vec;
    use core::str::FromStr;

    use der::asn1::ObjectIdentifier;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use crate::validator::pdv_extension::ObjectIdentifierSet;

    pub fn serialize<S: Serializer>(
        set: &ObjectIdentifierSet,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(set.iter().map(|oid| oid.to_string()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<ObjectIdentifierSet, D::Error> {
        let strings: Vec<String> = Vec::deserialize(deserializer)?;
        strings
            .iter()
            .map(|s| ObjectIdentifier::from_str(s).map_err(D::Error::custom))
            .collect()
    }
}
