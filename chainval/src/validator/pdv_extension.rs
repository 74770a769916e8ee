//! Typed, OID-keyed registry of the certificate extensions used during chain validation

use alloc::collections::{BTreeMap, BTreeSet};

use const_oid::db::rfc5912::{
    ID_CE_AUTHORITY_KEY_IDENTIFIER, ID_CE_BASIC_CONSTRAINTS, ID_CE_CERTIFICATE_POLICIES,
    ID_CE_EXT_KEY_USAGE, ID_CE_INHIBIT_ANY_POLICY, ID_CE_KEY_USAGE, ID_CE_NAME_CONSTRAINTS,
    ID_CE_POLICY_CONSTRAINTS, ID_CE_POLICY_MAPPINGS, ID_CE_SUBJECT_ALT_NAME,
    ID_CE_SUBJECT_KEY_IDENTIFIER,
};
use der::{asn1::ObjectIdentifier, Decode};
use x509_cert::ext::pkix::*;
use x509_cert::ext::Extension;

use crate::util::error::*;

/// `ObjectIdentifierSet` is a typedef for a set of ObjectIdentifier values, i.e., the critical
/// extensions of a certificate that remain unclaimed by validators.
pub type ObjectIdentifierSet = BTreeSet<ObjectIdentifier>;

/// `EXTS_OF_INTEREST` provides a list of extensions that will be automatically parsed when preparing
/// a [`PDVCertificate`](crate::PDVCertificate) instance. These extensions are subsequently available
/// via get_extension without re-parsing.
pub const EXTS_OF_INTEREST: &[ObjectIdentifier] = &[
    ID_CE_SUBJECT_KEY_IDENTIFIER,
    ID_CE_AUTHORITY_KEY_IDENTIFIER,
    ID_CE_BASIC_CONSTRAINTS,
    ID_CE_NAME_CONSTRAINTS,
    ID_CE_SUBJECT_ALT_NAME,
    ID_CE_EXT_KEY_USAGE,
    ID_CE_KEY_USAGE,
    ID_CE_POLICY_CONSTRAINTS,
    ID_CE_CERTIFICATE_POLICIES,
    ID_CE_POLICY_MAPPINGS,
    ID_CE_INHIBIT_ANY_POLICY,
];

/// The [`ExtensionProcessing`] trait provides a common means of extracting extensions from objects that
/// feature extensions, like Certificate or TrustAnchorChoice, and that retain copies of the
/// decoded extension structures, like `PDVCertificate` or `PDVTrustAnchorChoice`.
///
/// Prior to validating a chain, the parse_extensions method should be used to parse the extensions
/// that validators consume. The decoded extensions are cached and accessed via get_extension.
pub trait ExtensionProcessing {
    /// `get_extension` takes an ObjectIdentifier that identifies an extension type and returns
    /// a previously parsed PDVExtension instance containing the decoded extension if the extension was present.
    /// An extension that is present but could not be decoded yields an error.
    fn get_extension(&self, oid: &ObjectIdentifier) -> Result<Option<&'_ PDVExtension>>;

    /// `parse_extension` takes an ObjectIdentifier that identifies an extension type and returns
    /// a `PDVExtension` containing the decoded extension if the extension was present.
    fn parse_extension(&'_ mut self, oid: &ObjectIdentifier) -> Result<Option<&'_ PDVExtension>>;

    /// `parse_extensions` parses each extension identified in oids. Extensions that fail to parse
    /// are absent from the cache and are reported by get_extension.
    fn parse_extensions(&'_ mut self, oids: &[ObjectIdentifier]) {
        for oid in oids {
            let _r = self.parse_extension(oid);
        }
    }
}

/// [`ParsedExtensions`] is a typedef of a BTreeMap map that associates [`PDVExtension`] objects with object
/// identifier values. This is used to avoid parsing extensions repeatedly when validating a chain.
pub type ParsedExtensions = BTreeMap<ObjectIdentifier, PDVExtension>;

/// [`PDVExtension`] provides a wrapper for supported extension types.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PDVExtension {
    /// Parsed BasicConstraints extension
    BasicConstraints(BasicConstraints),
    /// Parsed SubjectKeyIdentifier extension
    SubjectKeyIdentifier(SubjectKeyIdentifier),
    /// Parsed AuthorityKeyIdentifier extension
    AuthorityKeyIdentifier(AuthorityKeyIdentifier),
    /// Parsed ExtendedKeyUsage extension
    ExtendedKeyUsage(ExtendedKeyUsage),
    /// Parsed KeyUsage extension
    KeyUsage(KeyUsage),
    /// Parsed SubjectAltName extension
    SubjectAltName(SubjectAltName),
    /// Parsed NameConstraints extension
    NameConstraints(NameConstraints),
    /// Parsed CertificatePolicies extension
    CertificatePolicies(CertificatePolicies),
    /// Parsed PolicyMappings extension
    PolicyMappings(PolicyMappings),
    /// Parsed PolicyConstraints extension
    PolicyConstraints(PolicyConstraints),
    /// Parsed InhibitAnyPolicy extension
    InhibitAnyPolicy(InhibitAnyPolicy),
}

/// `decode_extension` decodes the value of a raw extension into the [`PDVExtension`] variant
/// registered for its OID. `Ok(None)` is returned for OIDs with no registered type.
pub(crate) fn decode_extension(ext: &Extension) -> Result<Option<PDVExtension>> {
    macro_rules! decode_as {
        ($t:ident) => {
            Ok(Some(PDVExtension::$t($t::from_der(
                ext.extn_value.as_bytes(),
            )?)))
        };
    }

    match ext.extn_id {
        ID_CE_BASIC_CONSTRAINTS => decode_as!(BasicConstraints),
        ID_CE_SUBJECT_KEY_IDENTIFIER => decode_as!(SubjectKeyIdentifier),
        ID_CE_AUTHORITY_KEY_IDENTIFIER => decode_as!(AuthorityKeyIdentifier),
        ID_CE_EXT_KEY_USAGE => decode_as!(ExtendedKeyUsage),
        ID_CE_KEY_USAGE => decode_as!(KeyUsage),
        ID_CE_SUBJECT_ALT_NAME => decode_as!(SubjectAltName),
        ID_CE_NAME_CONSTRAINTS => decode_as!(NameConstraints),
        ID_CE_CERTIFICATE_POLICIES => decode_as!(CertificatePolicies),
        ID_CE_POLICY_MAPPINGS => decode_as!(PolicyMappings),
        ID_CE_POLICY_CONSTRAINTS => decode_as!(PolicyConstraints),
        ID_CE_INHIBIT_ANY_POLICY => decode_as!(InhibitAnyPolicy),
        _ => Ok(None),
    }
}

/// `parse_from_extensions` looks up oid in exts and caches the decoded result in pe. Shared by the
/// certificate and trust anchor wrappers.
pub(crate) fn parse_from_extensions<'a>(
    pe: &'a mut ParsedExtensions,
    exts: Option<&[Extension]>,
    oid: &ObjectIdentifier,
) -> Result<Option<&'a PDVExtension>> {
    if !pe.contains_key(oid) {
        let raw = match exts.and_then(|exts| exts.iter().find(|ext| ext.extn_id == *oid)) {
            Some(raw) => raw,
            None => return Ok(None),
        };
        match decode_extension(raw)? {
            Some(ext) => {
                pe.insert(*oid, ext);
            }
            None => return Ok(None),
        }
    }
    Ok(pe.get(oid))
}

/// `get_from_extensions` returns the cached decoding of oid. When nothing is cached but exts holds
/// the extension, the raw value is decoded again so that a decoding failure is reported rather than
/// mistaken for an absent extension.
pub(crate) fn get_from_extensions<'a>(
    pe: &'a ParsedExtensions,
    exts: Option<&[Extension]>,
    oid: &ObjectIdentifier,
) -> Result<Option<&'a PDVExtension>> {
    if let Some(ext) = pe.get(oid) {
        return Ok(Some(ext));
    }
    match exts.and_then(|exts| exts.iter().find(|ext| ext.extn_id == *oid)) {
        Some(raw) => decode_extension(raw).map(|_| None),
        None => Ok(None),
    }
}

/// `is_critical` returns the criticality flag of the extension identified by oid, or None if absent.
pub fn is_critical(exts: Option<&[Extension]>, oid: &ObjectIdentifier) -> Option<bool> {
    exts.and_then(|exts| exts.iter().find(|ext| ext.extn_id == *oid))
        .map(|ext| ext.critical)
}
