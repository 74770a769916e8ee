//! Wrapper around trust anchors that caches the extensions used during chain validation

use alloc::vec::Vec;

use const_oid::db::rfc5912::{
    ID_CE_BASIC_CONSTRAINTS, ID_CE_CERTIFICATE_POLICIES, ID_CE_NAME_CONSTRAINTS,
    ID_CE_SUBJECT_KEY_IDENTIFIER,
};
use der::{asn1::ObjectIdentifier, Decode, Encode};
use x509_cert::anchor::TrustAnchorChoice;
use x509_cert::ext::pkix::BasicConstraints;
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::Certificate;

use crate::util::error::*;
use crate::validator::pdv_extension::*;

/// [`PDVTrustAnchorChoice`] is used to aggregate a binary TrustAnchorChoice, a parsed TrustAnchorChoice
/// and parsed extensions in support of chain validation.
///
/// A trust anchor is either a self-contained certificate or an [RFC 5914] TrustAnchorInfo that
/// carries a bare public key and name, optionally accompanied by constraints.
///
/// [RFC 5914]: <https://datatracker.ietf.org/doc/html/rfc5914>
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PDVTrustAnchorChoice {
    /// Binary, encoded TrustAnchorChoice object
    pub encoded_ta: Vec<u8>,
    /// Decoded TrustAnchorChoice object
    pub decoded_ta: TrustAnchorChoice,
    /// Parsed extensions from the TrustAnchorChoice
    pub parsed_extensions: ParsedExtensions,
}

impl TryFrom<&[u8]> for PDVTrustAnchorChoice {
    type Error = der::Error;

    fn try_from(enc_ta: &[u8]) -> der::Result<Self> {
        let ta = TrustAnchorChoice::from_der(enc_ta)?;
        let mut pdv_ta = PDVTrustAnchorChoice {
            encoded_ta: enc_ta.to_vec(),
            decoded_ta: ta,
            parsed_extensions: Default::default(),
        };
        pdv_ta.parse_extensions(EXTS_OF_INTEREST);
        Ok(pdv_ta)
    }
}

impl TryFrom<TrustAnchorChoice> for PDVTrustAnchorChoice {
    type Error = der::Error;

    fn try_from(ta: TrustAnchorChoice) -> der::Result<Self> {
        let enc_ta = ta.to_der()?;
        let mut pdv_ta = PDVTrustAnchorChoice {
            encoded_ta: enc_ta,
            decoded_ta: ta,
            parsed_extensions: Default::default(),
        };
        pdv_ta.parse_extensions(EXTS_OF_INTEREST);
        Ok(pdv_ta)
    }
}

impl TryFrom<Certificate> for PDVTrustAnchorChoice {
    type Error = der::Error;

    fn try_from(cert: Certificate) -> der::Result<Self> {
        PDVTrustAnchorChoice::try_from(TrustAnchorChoice::Certificate(cert))
    }
}

impl PDVTrustAnchorChoice {
    /// Returns the certificate that conveys the trust anchor, if the anchor is a certificate.
    pub fn certificate(&self) -> Option<&Certificate> {
        match &self.decoded_ta {
            TrustAnchorChoice::Certificate(cert) => Some(cert),
            _ => None,
        }
    }

    /// Returns the name of the trust anchor. See [`get_trust_anchor_name`].
    pub fn name(&self) -> Result<&Name> {
        get_trust_anchor_name(&self.decoded_ta)
    }

    /// Returns the key identifier associated with the trust anchor, i.e., the keyId field of a
    /// TrustAnchorInfo or the SubjectKeyIdentifier extension of a certificate.
    pub fn key_identifier(&self) -> Option<&[u8]> {
        match &self.decoded_ta {
            TrustAnchorChoice::TaInfo(tai) => Some(tai.key_id.as_bytes()),
            _ => match self.get_extension(&ID_CE_SUBJECT_KEY_IDENTIFIER) {
                Ok(Some(PDVExtension::SubjectKeyIdentifier(skid))) => Some(skid.0.as_bytes()),
                _ => None,
            },
        }
    }

    /// `path_length_constraint` returns the pathLenConstraint from the basic constraints extension in
    /// a TA certificate or the value from CertPathControls for a TrustAnchorInfo, if any.
    pub fn path_length_constraint(&self) -> Option<u8> {
        match &self.decoded_ta {
            TrustAnchorChoice::TaInfo(tai) => tai
                .cert_path
                .as_ref()
                .and_then(|cp| cp.path_len_constraint)
                .map(|pl| u8::try_from(pl).unwrap_or(u8::MAX)),
            _ => match self.get_extension(&ID_CE_BASIC_CONSTRAINTS) {
                Ok(Some(PDVExtension::BasicConstraints(BasicConstraints {
                    path_len_constraint,
                    ..
                }))) => *path_len_constraint,
                _ => None,
            },
        }
    }
}

impl ExtensionProcessing for PDVTrustAnchorChoice {
    /// `get_extension` takes an ObjectIdentifier that identifies an extension type and returns
    /// a previously parsed PDVExtension instance containing the decoded extension if the extension was present.
    fn get_extension(&self, oid: &ObjectIdentifier) -> Result<Option<&'_ PDVExtension>> {
        get_from_extensions(&self.parsed_extensions, ta_extensions(&self.decoded_ta), oid)
    }

    fn parse_extension(&mut self, oid: &ObjectIdentifier) -> Result<Option<&PDVExtension>> {
        // TrustAnchorInfo may override the nameConstraints and certificatePolicies extensions per
        // RFC 5914 via the nameConstr and policySet fields of CertPathControls.
        if let TrustAnchorChoice::TaInfo(tai) = &self.decoded_ta {
            if let Some(cp) = &tai.cert_path {
                let overridden = if *oid == ID_CE_NAME_CONSTRAINTS {
                    cp.name_constr.clone().map(PDVExtension::NameConstraints)
                } else if *oid == ID_CE_CERTIFICATE_POLICIES {
                    cp.policy_set.clone().map(PDVExtension::CertificatePolicies)
                } else {
                    None
                };
                if let Some(ext) = overridden {
                    self.parsed_extensions.insert(*oid, ext);
                    return Ok(self.parsed_extensions.get(oid));
                }
            }
        }

        parse_from_extensions(
            &mut self.parsed_extensions,
            ta_extensions(&self.decoded_ta),
            oid,
        )
    }
}

/// Returns the extensions of the certificate that conveys the trust anchor, if any.
fn ta_extensions(ta: &TrustAnchorChoice) -> Option<&[Extension]> {
    match ta {
        TrustAnchorChoice::Certificate(c) => c.tbs_certificate.extensions.as_deref(),
        TrustAnchorChoice::TaInfo(tai) => tai
            .cert_path
            .as_ref()
            .and_then(|cp| cp.certificate.as_ref())
            .and_then(|c| c.tbs_certificate.extensions.as_deref()),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

/// [`get_trust_anchor_name`] returns the name of the trust anchor.
///
/// The name is as read from the either the subject field of a certificate if the Certificate option
/// is used or from the CertPathControls field within a TrustAnchorInfo if that option is used.
pub fn get_trust_anchor_name(ta: &TrustAnchorChoice) -> Result<&Name> {
    match ta {
        TrustAnchorChoice::Certificate(cert) => {
            return Ok(&cert.tbs_certificate.subject);
        }
        TrustAnchorChoice::TaInfo(tai) => {
            if let Some(cert_path) = &tai.cert_path {
                return Ok(&cert_path.ta_name);
            }
        }
        #[allow(unreachable_patterns)]
        _ => {}
    }
    Err(Error::NotFound)
}
