//! Helpers for synthesizing certificates. Signatures and keys are placeholders since chain validation
//! does not verify signatures.

#![allow(dead_code)]

use core::str::FromStr;
use core::time::Duration;

use chainval::*;
use const_oid::db::rfc5912::{
    ID_CE_AUTHORITY_KEY_IDENTIFIER, ID_CE_BASIC_CONSTRAINTS, ID_CE_KEY_USAGE,
    ID_CE_NAME_CONSTRAINTS, ID_CE_SUBJECT_ALT_NAME, ID_CE_SUBJECT_KEY_IDENTIFIER,
    SHA_256_WITH_RSA_ENCRYPTION,
};
use const_oid::ObjectIdentifier;
use der::asn1::{BitString, Ia5String, OctetString, UtcTime};
use der::{Decode, Encode};
use flagset::FlagSet;
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::ext::pkix::constraints::name::GeneralSubtree;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{
    AuthorityKeyIdentifier, BasicConstraints, KeyUsage, KeyUsages, NameConstraints,
    SubjectAltName, SubjectKeyIdentifier,
};
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::{Time, Validity};
use x509_cert::{Certificate, TbsCertificate, Version};

pub const JAN_2020: u64 = 1_577_836_800;
pub const JAN_2030: u64 = 1_893_456_000;
/// 2023-11-14T22:13:20Z
pub const TIME_OF_INTEREST: u64 = 1_700_000_000;

pub const ROOT: &str = "CN=Test Root,O=Test,C=US";
pub const ICA: &str = "CN=Test Intermediate,O=Test,C=US";
pub const ICA2: &str = "CN=Test Intermediate 2,O=Test,C=US";
pub const LEAF: &str = "CN=Test Leaf,O=Test,C=US";

pub fn name(s: &str) -> Name {
    Name::from_str(s).unwrap()
}

pub fn utc(secs: u64) -> Time {
    Time::UtcTime(UtcTime::from_unix_duration(Duration::from_secs(secs)).unwrap())
}

pub fn key_id(id: u8) -> OctetString {
    OctetString::new(vec![id; 20]).unwrap()
}

pub fn dns(s: &str) -> GeneralName {
    GeneralName::DnsName(Ia5String::new(s).unwrap())
}

pub fn email(s: &str) -> GeneralName {
    GeneralName::Rfc822Name(Ia5String::new(s).unwrap())
}

pub fn ip(b: &[u8]) -> GeneralName {
    GeneralName::IpAddress(OctetString::new(b.to_vec()).unwrap())
}

pub fn dir_name(s: &str) -> GeneralName {
    GeneralName::DirectoryName(name(s))
}

pub fn subtree(base: GeneralName) -> GeneralSubtree {
    GeneralSubtree {
        base,
        minimum: 0,
        maximum: None,
    }
}

/// Builds certificates from parts, replacing extensions that are set more than once.
#[derive(Clone)]
pub struct CertBuilder {
    issuer: Name,
    subject: Name,
    serial: SerialNumber,
    not_before: Time,
    not_after: Time,
    extensions: Vec<Extension>,
}

impl CertBuilder {
    pub fn new(issuer: &str, subject: &str) -> Self {
        CertBuilder {
            issuer: name(issuer),
            subject: name(subject),
            serial: SerialNumber::new(&[0x01, 0x02, 0x03]).unwrap(),
            not_before: utc(JAN_2020),
            not_after: utc(JAN_2030),
            extensions: Vec::new(),
        }
    }

    /// a CA certificate with critical basicConstraints and keyUsage and non-critical key identifiers
    pub fn ca(issuer: &str, subject: &str, kid: u8, issuer_kid: u8) -> Self {
        CertBuilder::new(issuer, subject)
            .basic_constraints(true, None)
            .key_usage(KeyUsages::KeyCertSign | KeyUsages::CRLSign)
            .ski(kid)
            .aki(issuer_kid)
    }

    /// a self-signed trust anchor
    pub fn root(subject: &str, kid: u8) -> Self {
        CertBuilder::new(subject, subject)
            .basic_constraints(true, None)
            .key_usage(KeyUsages::KeyCertSign | KeyUsages::CRLSign)
            .ski(kid)
    }

    /// an end entity certificate
    pub fn leaf(issuer: &str, subject: &str, kid: u8, issuer_kid: u8) -> Self {
        CertBuilder::new(issuer, subject)
            .key_usage(KeyUsages::DigitalSignature.into())
            .ski(kid)
            .aki(issuer_kid)
    }

    pub fn subject_name(mut self, subject: Name) -> Self {
        self.subject = subject;
        self
    }

    pub fn serial(mut self, serial: SerialNumber) -> Self {
        self.serial = serial;
        self
    }

    /// sets a serial number from its DER encoding, which permits values SerialNumber::new rejects
    pub fn serial_der(self, encoded: &[u8]) -> Self {
        self.serial(SerialNumber::from_der(encoded).unwrap())
    }

    pub fn validity(mut self, not_before: u64, not_after: u64) -> Self {
        self.not_before = utc(not_before);
        self.not_after = utc(not_after);
        self
    }

    pub fn extension<T: Encode>(mut self, oid: ObjectIdentifier, critical: bool, value: &T) -> Self {
        self.extensions.retain(|e| e.extn_id != oid);
        self.extensions.push(Extension {
            extn_id: oid,
            critical,
            extn_value: OctetString::new(value.to_der().unwrap()).unwrap(),
        });
        self
    }

    pub fn without(mut self, oid: ObjectIdentifier) -> Self {
        self.extensions.retain(|e| e.extn_id != oid);
        self
    }

    pub fn basic_constraints(self, ca: bool, path_len_constraint: Option<u8>) -> Self {
        self.extension(
            ID_CE_BASIC_CONSTRAINTS,
            true,
            &BasicConstraints {
                ca,
                path_len_constraint,
            },
        )
    }

    pub fn key_usage(self, bits: FlagSet<KeyUsages>) -> Self {
        self.extension(ID_CE_KEY_USAGE, true, &KeyUsage(bits))
    }

    pub fn ski(self, kid: u8) -> Self {
        self.extension(
            ID_CE_SUBJECT_KEY_IDENTIFIER,
            false,
            &SubjectKeyIdentifier(key_id(kid)),
        )
    }

    pub fn aki(self, kid: u8) -> Self {
        self.extension(
            ID_CE_AUTHORITY_KEY_IDENTIFIER,
            false,
            &AuthorityKeyIdentifier {
                key_identifier: Some(key_id(kid)),
                authority_cert_issuer: None,
                authority_cert_serial_number: None,
            },
        )
    }

    pub fn san(self, names: Vec<GeneralName>, critical: bool) -> Self {
        self.extension(ID_CE_SUBJECT_ALT_NAME, critical, &SubjectAltName(names))
    }

    pub fn name_constraints(
        self,
        permitted: Vec<GeneralName>,
        excluded: Vec<GeneralName>,
        critical: bool,
    ) -> Self {
        let subtrees = |names: Vec<GeneralName>| {
            if names.is_empty() {
                None
            } else {
                Some(names.into_iter().map(subtree).collect::<Vec<_>>())
            }
        };
        self.extension(
            ID_CE_NAME_CONSTRAINTS,
            critical,
            &NameConstraints {
                permitted_subtrees: subtrees(permitted),
                excluded_subtrees: subtrees(excluded),
            },
        )
    }

    pub fn build(self) -> Certificate {
        let alg = AlgorithmIdentifierOwned {
            oid: SHA_256_WITH_RSA_ENCRYPTION,
            parameters: None,
        };
        Certificate {
            tbs_certificate: TbsCertificate {
                version: Version::V3,
                serial_number: self.serial,
                signature: alg.clone(),
                issuer: self.issuer,
                validity: Validity {
                    not_before: self.not_before,
                    not_after: self.not_after,
                },
                subject: self.subject,
                subject_public_key_info: SubjectPublicKeyInfoOwned {
                    algorithm: alg.clone(),
                    subject_public_key: BitString::from_bytes(&[0x00; 16]).unwrap(),
                },
                issuer_unique_id: None,
                subject_unique_id: None,
                extensions: if self.extensions.is_empty() {
                    None
                } else {
                    Some(self.extensions)
                },
            },
            signature_algorithm: alg,
            signature: BitString::from_bytes(&[0x00; 16]).unwrap(),
        }
    }

    pub fn pdv(self) -> PDVCertificate {
        PDVCertificate::try_from(self.build()).unwrap()
    }
}

pub fn trust_anchor(cert: Certificate) -> PDVTrustAnchorChoice {
    PDVTrustAnchorChoice::try_from(cert).unwrap()
}

/// a context with the given anchors and a fixed time of interest
pub fn context(anchors: Vec<Certificate>) -> CertificateValidationContext {
    let mut ctx = CertificateValidationContext::new(anchors.into_iter().map(trust_anchor).collect());
    ctx.date = TimeOfInterest::from_unix_secs(TIME_OF_INTEREST).unwrap();
    ctx
}

/// a chain, leaf first
pub fn chain(certs: Vec<CertBuilder>) -> CertificateChain {
    CertificateChain::from_certificates(certs.into_iter().map(|c| c.build()).collect()).unwrap()
}

/// root (key id 1) -> intermediate (key id 2) -> leaf (key id 3)
pub fn three_tier() -> (CertBuilder, CertBuilder, CertBuilder) {
    (
        CertBuilder::root(ROOT, 1),
        CertBuilder::ca(ROOT, ICA, 2, 1),
        CertBuilder::leaf(ICA, LEAF, 3, 2),
    )
}

/// messages of the failures in result, in order
pub fn messages(result: &CertificateValidationResult) -> Vec<String> {
    result
        .validator_failures
        .iter()
        .map(|f| f.error_message())
        .collect()
}

/// asserts that result holds exactly one failure, from validator, with message
pub fn assert_single_failure(
    result: &CertificateValidationResult,
    validator: ValidatorKind,
    cert_index: usize,
    message: &str,
) {
    assert_eq!(
        1,
        result.validator_failures.len(),
        "unexpected failures: {:?}",
        messages(result)
    );
    let failure = &result.validator_failures[0];
    assert_eq!(validator, failure.validator);
    assert_eq!(cert_index, failure.cert_index);
    assert_eq!(message, failure.error_message());
}
