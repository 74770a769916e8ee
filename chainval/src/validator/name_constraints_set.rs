//! Structures and functions related to processing name constraints

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use const_oid::db::rfc3280::EMAIL_ADDRESS;
use der::asn1::Ia5String;
use log::debug;
use x509_cert::ext::pkix::{name::GeneralName, NameConstraints};
use x509_cert::name::Name;

use crate::util::error::*;
use crate::util::pdv_utilities::get_value_from_rdn;
use crate::validator::general_names::*;

/// The `NameConstraintsState` structure tracks the permitted and excluded subtrees accumulated while
/// walking a chain.
///
/// A `permitted` value of None means every name is permitted; an `excluded` value of None means no
/// name is excluded. Name types for which an intersection of permitted subtrees became empty are
/// held in `excluded_name_types` and no name of such a type is permitted thereafter.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NameConstraintsState {
    /// permitted subtrees, if any have been asserted
    pub permitted: Option<GeneralSubtreeSet>,
    /// excluded subtrees, if any have been asserted
    pub excluded: Option<GeneralSubtreeSet>,
    /// name types for which no name is permitted
    pub excluded_name_types: BTreeSet<GeneralNameType>,
    /// criticality of the NameConstraints extension(s) that contributed to this state
    pub critical: bool,
}

impl NameConstraintsState {
    /// Instantiates a state from a decoded NameConstraints extension.
    pub fn from_extension(nc: &NameConstraints, critical: bool) -> NameConstraintsState {
        NameConstraintsState {
            permitted: nc
                .permitted_subtrees
                .as_ref()
                .map(|p| GeneralSubtreeSet::from(p.clone())),
            excluded: nc
                .excluded_subtrees
                .as_ref()
                .map(|e| GeneralSubtreeSet::from(e.clone())),
            excluded_name_types: BTreeSet::new(),
            critical,
        }
    }

    /// `merge_with` folds other into self: excluded subtrees are unioned and permitted subtrees are
    /// intersected. Both self and other must be critical.
    pub fn merge_with(&mut self, other: &NameConstraintsState) -> Result<()> {
        if !self.critical || !other.critical {
            return Err(Error::NameConstraints(
                "NameConstraints extension must be critical.".into(),
            ));
        }

        if let Some(other_excluded) = &other.excluded {
            match &mut self.excluded {
                Some(excluded) => excluded.union_with(other_excluded),
                None => self.excluded = Some(other_excluded.clone()),
            }
        }

        if let Some(other_permitted) = &other.permitted {
            match &mut self.permitted {
                Some(permitted) => {
                    let emptied = permitted.intersect_and_return_exclusions(other_permitted);
                    self.excluded_name_types.extend(emptied);
                }
                None => self.permitted = Some(other_permitted.clone()),
            }
        }

        self.excluded_name_types
            .extend(other.excluded_name_types.iter().copied());
        Ok(())
    }

    /// true if any permitted or excluded subtree has a malformed base
    pub fn has_malformed_names(&self) -> bool {
        self.permitted.iter().any(|p| p.has_malformed())
            || self.excluded.iter().any(|e| e.has_malformed())
    }

    /// `permits` returns true if name falls within the permitted subtrees of its type, or if no
    /// permitted subtrees of its type have been asserted.
    pub fn permits(&self, name: &GeneralName) -> bool {
        let t = GeneralNameType::from(name);
        if self.excluded_name_types.contains(&t) {
            return false;
        }
        match &self.permitted {
            Some(permitted) => {
                let mut of_type = permitted.of_type(t).peekable();
                of_type.peek().is_none() || of_type.any(|s| name_within_subtree(name, s))
            }
            None => true,
        }
    }

    /// `excludes` returns true if name falls within any excluded subtree
    pub fn excludes(&self, name: &GeneralName) -> bool {
        match &self.excluded {
            Some(excluded) => excluded
                .of_type(GeneralNameType::from(name))
                .any(|s| name_within_subtree(name, s)),
            None => false,
        }
    }
}

/// `subject_email_addresses` returns the emailAddress attributes found in name as rfc822Name values.
pub fn subject_email_addresses(name: &Name) -> Vec<GeneralName> {
    let mut retval = Vec::new();
    for rdn in name.0.iter() {
        for atav in rdn.0.iter() {
            if atav.oid != EMAIL_ADDRESS {
                continue;
            }
            match get_value_from_rdn(atav).map(|v| Ia5String::new(&v)) {
                Ok(Ok(addr)) => retval.push(GeneralName::Rfc822Name(addr)),
                _ => debug!("Ignoring emailAddress attribute that could not be read as IA5String"),
            }
        }
    }
    retval
}
