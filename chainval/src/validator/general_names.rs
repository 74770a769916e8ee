//! Comparison and combination of GeneralSubtree values per name type
//!
//! Name constraints are sets of [`GeneralSubtree`] values of mixed name types. The functions here
//! relate two subtrees of the same type (equal, narrower, wider or disjoint) and use that relation
//! to intersect and union sets of subtrees. The algebra is pairwise: results are not re-minimized
//! transitively, so a set may retain entries that a later entry subsumes.

use alloc::collections::BTreeSet;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use x509_cert::ext::pkix::{constraints::name::GeneralSubtree, name::GeneralName};

use crate::util::pdv_utilities::descended_from_dn;

/// Relationship of one general subtree to another.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NameRelation {
    /// Both subtrees describe the same name space
    Match,
    /// The first subtree is strictly contained within the second
    Narrows,
    /// The first subtree strictly contains the second
    Widens,
    /// The subtrees are of the same name type but are unrelated
    SameType,
    /// The subtrees are of different name types
    DiffType,
}

/// Field-less discriminant of [`GeneralName`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub enum GeneralNameType {
    /// otherName
    OtherName,
    /// rfc822Name
    Rfc822Name,
    /// dNSName
    DnsName,
    /// directoryName
    DirectoryName,
    /// ediPartyName
    EdiPartyName,
    /// uniformResourceIdentifier
    UniformResourceIdentifier,
    /// iPAddress
    IpAddress,
    /// registeredID
    RegisteredId,
}

impl From<&GeneralName> for GeneralNameType {
    fn from(gn: &GeneralName) -> Self {
        match gn {
            GeneralName::OtherName(_) => GeneralNameType::OtherName,
            GeneralName::Rfc822Name(_) => GeneralNameType::Rfc822Name,
            GeneralName::DnsName(_) => GeneralNameType::DnsName,
            GeneralName::DirectoryName(_) => GeneralNameType::DirectoryName,
            GeneralName::EdiPartyName(_) => GeneralNameType::EdiPartyName,
            GeneralName::UniformResourceIdentifier(_) => GeneralNameType::UniformResourceIdentifier,
            GeneralName::IpAddress(_) => GeneralNameType::IpAddress,
            GeneralName::RegisteredId(_) => GeneralNameType::RegisteredId,
        }
    }
}

/// Where a general name appears, which determines the syntax it must follow.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NameUsage {
    /// A name asserted in a SubjectAltName extension (or subject emailAddress attribute)
    SubjectAltName,
    /// The base of a permitted or excluded subtree in a NameConstraints extension
    ConstraintBase,
}

lazy_static! {
    static ref DNS_LABEL: Regex = Regex::new("^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").unwrap();
    static ref LOCAL_PART: Regex =
        Regex::new(r"^[a-zA-Z0-9!#$%&'*+/=?^_`{|}~.-]+$").unwrap();
}

/// `is_hostname` returns true if every dot-separated label of host is a valid DNS label. When
/// allow_wildcard is true, the left-most label may be `*`.
fn is_hostname(host: &str, allow_wildcard: bool) -> bool {
    let host = host.strip_suffix('.').unwrap_or(host).to_lowercase();
    if host.is_empty() || host.len() > 253 {
        return false;
    }
    host.split('.').enumerate().all(|(i, label)| {
        DNS_LABEL.is_match(label) || (allow_wildcard && i == 0 && label == "*")
    })
}

/// `is_email` returns true if addr is a mailbox of the form `local@host`.
pub fn is_email(addr: &str) -> bool {
    match addr.rsplit_once('@') {
        Some((local, host)) => LOCAL_PART.is_match(local) && is_hostname(host, false),
        None => false,
    }
}

/// `is_mask` returns true if the bytes form a contiguous network mask, i.e., leading ones then zeros.
fn is_mask(mask: &[u8]) -> bool {
    let mut seen_zero = false;
    for byte in mask {
        for bit in (0..8).rev() {
            let set = byte & (1 << bit) != 0;
            if set && seen_zero {
                return false;
            }
            if !set {
                seen_zero = true;
            }
        }
    }
    true
}

/// `general_name_is_well_formed` checks the per-type syntax of a general name. The rules differ
/// for names asserted in a SubjectAltName and for the base of a name constraint:
///
/// - rfc822Name: a mailbox in a SAN; a mailbox, host or `.domain` in a constraint
/// - dNSName: a hostname (optionally with a leading `*` label) in a SAN; a hostname, `.domain` or
///   the empty string in a constraint
/// - uniformResourceIdentifier: an absolute URI with a host in a SAN; a host or `.domain` in a constraint
/// - iPAddress: 4 or 16 bytes in a SAN; 8 or 32 bytes with a contiguous mask in a constraint
///
/// Other name types are accepted as decoded.
pub fn general_name_is_well_formed(gn: &GeneralName, usage: NameUsage) -> bool {
    match gn {
        GeneralName::Rfc822Name(rfc822) => {
            let s = rfc822.as_str();
            match usage {
                NameUsage::SubjectAltName => is_email(s),
                NameUsage::ConstraintBase => {
                    if s.contains('@') {
                        is_email(s)
                    } else {
                        is_hostname(s.strip_prefix('.').unwrap_or(s), false)
                    }
                }
            }
        }
        GeneralName::DnsName(dns) => {
            let s = dns.as_str();
            match usage {
                NameUsage::SubjectAltName => is_hostname(s, true),
                NameUsage::ConstraintBase => {
                    s.is_empty() || is_hostname(s.strip_prefix('.').unwrap_or(s), false)
                }
            }
        }
        GeneralName::UniformResourceIdentifier(uri) => {
            let s = uri.as_str();
            match usage {
                NameUsage::SubjectAltName => match Url::parse(s) {
                    Ok(url) => url.host_str().map(|h| !h.is_empty()).unwrap_or(false),
                    Err(_) => false,
                },
                NameUsage::ConstraintBase => {
                    is_hostname(s.strip_prefix('.').unwrap_or(s), false)
                }
            }
        }
        GeneralName::IpAddress(ip) => {
            let b = ip.as_bytes();
            match usage {
                NameUsage::SubjectAltName => b.len() == 4 || b.len() == 16,
                NameUsage::ConstraintBase => match b.len() {
                    8 | 32 => is_mask(&b[b.len() / 2..]),
                    _ => false,
                },
            }
        }
        _ => true,
    }
}

//-----------------------------------------------------------------------------
// Per-type containment
//-----------------------------------------------------------------------------

/// A host-based name space.
#[derive(Clone, Debug, Eq, PartialEq)]
enum HostSpace {
    /// Every host
    Any,
    /// The host itself and, when subdomains is true, every host beneath it
    Host { host: String, subdomains: bool },
    /// Every host strictly beneath the domain
    Domain(String),
}

impl HostSpace {
    fn parse(s: &str, bare_host_covers_subdomains: bool) -> HostSpace {
        let s = s.strip_suffix('.').unwrap_or(s).to_lowercase();
        if s.is_empty() {
            HostSpace::Any
        } else if let Some(domain) = s.strip_prefix('.') {
            HostSpace::Domain(domain.to_string())
        } else {
            HostSpace::Host {
                host: s,
                subdomains: bare_host_covers_subdomains,
            }
        }
    }

    /// true if the space described by self includes the space described by other
    fn covers(&self, other: &HostSpace) -> bool {
        match (self, other) {
            (HostSpace::Any, _) => true,
            (_, HostSpace::Any) => false,
            (HostSpace::Host { host, subdomains }, HostSpace::Host { host: o, subdomains: os }) => {
                if *subdomains {
                    host == o || is_subdomain(o, host)
                } else {
                    host == o && !os
                }
            }
            (HostSpace::Host { host, subdomains }, HostSpace::Domain(o)) => {
                *subdomains && (host == o || is_subdomain(o, host))
            }
            (HostSpace::Domain(d), HostSpace::Host { host, .. }) => is_subdomain(host, d),
            (HostSpace::Domain(d), HostSpace::Domain(o)) => d == o || is_subdomain(o, d),
        }
    }
}

/// true if name is strictly beneath domain, i.e., `www.example.com` is beneath `example.com`
fn is_subdomain(name: &str, domain: &str) -> bool {
    name.len() > domain.len() + 1
        && name.ends_with(domain)
        && name.as_bytes()[name.len() - domain.len() - 1] == b'.'
}

/// An email name space.
#[derive(Clone, Debug, Eq, PartialEq)]
enum MailSpace {
    /// A single mailbox
    Mailbox { local: String, host: String },
    /// Every mailbox on the host
    Host(String),
    /// Every mailbox on any host beneath the domain
    Domain(String),
}

impl MailSpace {
    fn parse(s: &str) -> MailSpace {
        if let Some((local, host)) = s.rsplit_once('@') {
            MailSpace::Mailbox {
                local: local.to_string(),
                host: host.to_lowercase(),
            }
        } else if let Some(domain) = s.strip_prefix('.') {
            MailSpace::Domain(domain.to_lowercase())
        } else {
            MailSpace::Host(s.to_lowercase())
        }
    }

    fn covers(&self, other: &MailSpace) -> bool {
        match (self, other) {
            (MailSpace::Mailbox { .. }, _) => self == other,
            (MailSpace::Host(h), MailSpace::Mailbox { host, .. }) => h == host,
            (MailSpace::Host(h), MailSpace::Host(o)) => h == o,
            (MailSpace::Host(_), MailSpace::Domain(_)) => false,
            (MailSpace::Domain(d), MailSpace::Mailbox { host, .. }) => {
                d.is_empty() || is_subdomain(host, d)
            }
            (MailSpace::Domain(d), MailSpace::Host(o)) => d.is_empty() || is_subdomain(o, d),
            (MailSpace::Domain(d), MailSpace::Domain(o)) => {
                d.is_empty() || d == o || is_subdomain(o, d)
            }
        }
    }
}

/// Returns the host portion of a URI, or the value itself when it is a bare host or `.domain`.
fn uri_host(uri: &str) -> Option<String> {
    if uri.contains(':') {
        Url::parse(uri)
            .ok()
            .and_then(|url| url.host_str().map(|h| h.trim_matches(['[', ']']).to_string()))
    } else {
        Some(uri.to_string())
    }
}

/// An IP host or subnet, as raw address bytes and mask bytes of equal length.
struct IpSpace<'a> {
    addr: &'a [u8],
    mask: Option<&'a [u8]>,
}

impl<'a> IpSpace<'a> {
    fn parse(b: &'a [u8]) -> Option<IpSpace<'a>> {
        match b.len() {
            4 | 16 => Some(IpSpace { addr: b, mask: None }),
            8 | 32 => Some(IpSpace {
                addr: &b[..b.len() / 2],
                mask: Some(&b[b.len() / 2..]),
            }),
            _ => None,
        }
    }

    fn covers(&self, other: &IpSpace<'_>) -> bool {
        if self.addr.len() != other.addr.len() {
            return false;
        }
        match (self.mask, other.mask) {
            (None, None) => self.addr == other.addr,
            (None, Some(_)) => false,
            (Some(mask), None) => masked_equal(self.addr, other.addr, mask),
            (Some(mask), Some(other_mask)) => {
                // every bit of self's mask must be set in other's mask
                mask.iter().zip(other_mask).all(|(m, o)| m & o == *m)
                    && masked_equal(self.addr, other.addr, mask)
            }
        }
    }
}

fn masked_equal(l: &[u8], r: &[u8], mask: &[u8]) -> bool {
    l.iter()
        .zip(r)
        .zip(mask)
        .all(|((l, r), m)| l & m == r & m)
}

/// Combines the two containment tests into a relation.
fn relation_from_cover(a_covers_b: bool, b_covers_a: bool) -> NameRelation {
    match (a_covers_b, b_covers_a) {
        (true, true) => NameRelation::Match,
        (false, true) => NameRelation::Narrows,
        (true, false) => NameRelation::Widens,
        (false, false) => NameRelation::SameType,
    }
}

/// `general_name_relation` relates general name a to general name b.
///
/// - dNSName and uniformResourceIdentifier: domain-suffix containment, where `example.com` covers
///   the host and its subdomains, `.example.com` covers subdomains only and the empty string covers
///   all hosts. The host is extracted from a full URI.
/// - rfc822Name: `.example.com` covers mailboxes on any host beneath the domain, `example.com`
///   covers mailboxes on exactly that host and full addresses compare for equality.
/// - directoryName: one name narrows another if the other is an RDN-ordered prefix of it.
/// - iPAddress: hosts compare for equality, subnets through their masks and a host narrows a
///   subnet when the masked host equals the subnet's network.
/// - all other types: equal or unrelated.
pub fn general_name_relation(a: &GeneralName, b: &GeneralName) -> NameRelation {
    match (a, b) {
        (GeneralName::DnsName(a), GeneralName::DnsName(b)) => {
            let a = HostSpace::parse(a.as_str(), true);
            let b = HostSpace::parse(b.as_str(), true);
            relation_from_cover(a.covers(&b), b.covers(&a))
        }
        (GeneralName::UniformResourceIdentifier(a), GeneralName::UniformResourceIdentifier(b)) => {
            match (uri_host(a.as_str()), uri_host(b.as_str())) {
                (Some(a), Some(b)) => {
                    let a = HostSpace::parse(&a, true);
                    let b = HostSpace::parse(&b, true);
                    relation_from_cover(a.covers(&b), b.covers(&a))
                }
                _ => NameRelation::SameType,
            }
        }
        (GeneralName::Rfc822Name(a), GeneralName::Rfc822Name(b)) => {
            let a = MailSpace::parse(a.as_str());
            let b = MailSpace::parse(b.as_str());
            relation_from_cover(a.covers(&b), b.covers(&a))
        }
        (GeneralName::DirectoryName(a), GeneralName::DirectoryName(b)) => {
            relation_from_cover(
                descended_from_dn(a, b, 0, None),
                descended_from_dn(b, a, 0, None),
            )
        }
        (GeneralName::IpAddress(a), GeneralName::IpAddress(b)) => {
            match (IpSpace::parse(a.as_bytes()), IpSpace::parse(b.as_bytes())) {
                (Some(a), Some(b)) => relation_from_cover(a.covers(&b), b.covers(&a)),
                _ => NameRelation::SameType,
            }
        }
        _ => {
            if GeneralNameType::from(a) != GeneralNameType::from(b) {
                NameRelation::DiffType
            } else if a == b {
                NameRelation::Match
            } else {
                NameRelation::SameType
            }
        }
    }
}

/// `subtree_relation` relates subtree a to subtree b. See [`general_name_relation`].
pub fn subtree_relation(a: &GeneralSubtree, b: &GeneralSubtree) -> NameRelation {
    general_name_relation(&a.base, &b.base)
}

/// `name_within_subtree` returns true if name is equal to or contained within subtree. For
/// directory names the minimum and maximum fields of the subtree are honored.
pub fn name_within_subtree(name: &GeneralName, subtree: &GeneralSubtree) -> bool {
    match (name, &subtree.base) {
        (GeneralName::DirectoryName(dn), GeneralName::DirectoryName(base)) => {
            descended_from_dn(base, dn, subtree.minimum, subtree.maximum)
        }
        (GeneralName::UniformResourceIdentifier(uri), GeneralName::UniformResourceIdentifier(_))
            if uri_host(uri.as_str()).is_none() =>
        {
            false
        }
        _ => matches!(
            general_name_relation(name, &subtree.base),
            NameRelation::Match | NameRelation::Narrows
        ),
    }
}

//-----------------------------------------------------------------------------
// Sets of subtrees
//-----------------------------------------------------------------------------

/// A list of general subtrees of mixed name types.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GeneralSubtreeSet {
    /// subtrees in the set
    pub trees: Vec<GeneralSubtree>,
}

impl From<Vec<GeneralSubtree>> for GeneralSubtreeSet {
    fn from(trees: Vec<GeneralSubtree>) -> Self {
        GeneralSubtreeSet { trees }
    }
}

impl GeneralSubtreeSet {
    /// number of subtrees in the set
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// true if the set contains no subtrees
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// name types present in the set
    pub fn name_types(&self) -> BTreeSet<GeneralNameType> {
        self.trees
            .iter()
            .map(|t| GeneralNameType::from(&t.base))
            .collect()
    }

    /// subtrees of the given type
    pub fn of_type(&self, t: GeneralNameType) -> impl Iterator<Item = &GeneralSubtree> + '_ {
        self.trees
            .iter()
            .filter(move |s| GeneralNameType::from(&s.base) == t)
    }

    /// true if the set holds a subtree whose base fails [`general_name_is_well_formed`]
    pub fn has_malformed(&self) -> bool {
        self.trees
            .iter()
            .any(|t| !general_name_is_well_formed(&t.base, NameUsage::ConstraintBase))
    }

    /// `intersect_and_return_exclusions` replaces self with the intersection of self and other and
    /// returns the name types that both sets constrained but whose intersection is empty.
    ///
    /// Types present in only one of the sets are carried over unchanged. For each type-matching
    /// pair the narrower subtree is kept (one copy when they match) and unrelated pairs contribute
    /// nothing.
    pub fn intersect_and_return_exclusions(
        &mut self,
        other: &GeneralSubtreeSet,
    ) -> BTreeSet<GeneralNameType> {
        let self_types = self.name_types();
        let other_types = other.name_types();
        let mut exclusions = BTreeSet::new();
        let mut result: Vec<GeneralSubtree> = Vec::new();

        fn push(result: &mut Vec<GeneralSubtree>, t: &GeneralSubtree) {
            if !result.contains(t) {
                result.push(t.clone());
            }
        }

        for t in self_types.union(&other_types) {
            match (self_types.contains(t), other_types.contains(t)) {
                (true, false) => self.of_type(*t).for_each(|s| push(&mut result, s)),
                (false, true) => other.of_type(*t).for_each(|s| push(&mut result, s)),
                _ => {
                    let before = result.len();
                    for a in self.of_type(*t) {
                        for b in other.of_type(*t) {
                            match subtree_relation(a, b) {
                                NameRelation::Match | NameRelation::Narrows => push(&mut result, a),
                                NameRelation::Widens => push(&mut result, b),
                                NameRelation::SameType | NameRelation::DiffType => {}
                            }
                        }
                    }
                    if result.len() == before {
                        exclusions.insert(*t);
                    }
                }
            }
        }

        self.trees = result;
        exclusions
    }

    /// `union_with` adds the subtrees from other to self. Where a type-matching pair is related, the
    /// wider subtree is kept; unrelated subtrees are kept side by side.
    pub fn union_with(&mut self, other: &GeneralSubtreeSet) {
        for b in &other.trees {
            let mut absorbed = false;
            let mut narrower = Vec::new();
            for (i, a) in self.trees.iter().enumerate() {
                match subtree_relation(a, b) {
                    NameRelation::Match | NameRelation::Widens => {
                        absorbed = true;
                        break;
                    }
                    NameRelation::Narrows => narrower.push(i),
                    NameRelation::SameType | NameRelation::DiffType => {}
                }
            }
            if absorbed {
                continue;
            }
            for i in narrower.into_iter().rev() {
                self.trees.remove(i);
            }
            self.trees.push(b.clone());
        }
    }
}
