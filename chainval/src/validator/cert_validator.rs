//! The trait implemented by per-certificate validators and the kinds of validator that exist

use core::fmt;
use core::str::FromStr;

use crate::util::error::*;
use crate::validator::pdv_extension::ObjectIdentifierSet;
use crate::{PDVCertificate, PDVTrustAnchorChoice};

/// `ValidatorKind` identifies the validator that produced a failure.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub enum ValidatorKind {
    /// Enforces the basicConstraints extension
    BasicConstraints,
    /// Enforces the keyUsage and extKeyUsage extensions
    KeyUsage,
    /// Enforces the presence of subject and authority key identifiers
    KeyIdentifier,
    /// Enforces the nameConstraints extension
    NameConstraints,
    /// Compares validity periods with the time of interest
    TimeValidity,
    /// Checks structural rules of individual certificates
    CertValidity,
    /// Checks that issuer and subject names chain
    NameChaining,
    /// Tracks certificate policies
    Policy,
    /// Critical extensions no validator claimed
    CriticalExtensions,
    /// Trust anchor resolution
    TrustAnchor,
    /// A validator supplied from outside this crate
    Other(&'static str),
}

impl fmt::Display for ValidatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidatorKind::BasicConstraints => write!(f, "BasicConstraintsValidator"),
            ValidatorKind::KeyUsage => write!(f, "KeyUsageValidator"),
            ValidatorKind::KeyIdentifier => write!(f, "KeyIdentifierValidator"),
            ValidatorKind::NameConstraints => write!(f, "NameConstraintsValidator"),
            ValidatorKind::TimeValidity => write!(f, "TimeValidityValidator"),
            ValidatorKind::CertValidity => write!(f, "CertValidityValidator"),
            ValidatorKind::NameChaining => write!(f, "NameChainingValidator"),
            ValidatorKind::Policy => write!(f, "PolicyValidator"),
            ValidatorKind::CriticalExtensions => write!(f, "CriticalExtensions"),
            ValidatorKind::TrustAnchor => write!(f, "TrustAnchor"),
            ValidatorKind::Other(name) => write!(f, "{}", name),
        }
    }
}

impl FromStr for ValidatorKind {
    type Err = Error;

    /// Accepts the displayed name with or without the `Validator` suffix, ignoring case.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_lowercase();
        let name = lower.strip_suffix("validator").unwrap_or(&lower);
        match name {
            "basicconstraints" => Ok(ValidatorKind::BasicConstraints),
            "keyusage" => Ok(ValidatorKind::KeyUsage),
            "keyidentifier" => Ok(ValidatorKind::KeyIdentifier),
            "nameconstraints" => Ok(ValidatorKind::NameConstraints),
            "timevalidity" => Ok(ValidatorKind::TimeValidity),
            "certvalidity" => Ok(ValidatorKind::CertValidity),
            "namechaining" => Ok(ValidatorKind::NameChaining),
            "policy" => Ok(ValidatorKind::Policy),
            _ => Err(Error::NotFound),
        }
    }
}

/// `TrustAnchorLink` describes how the resolved trust anchor relates to the chain being validated.
#[derive(Clone, Copy, Debug)]
pub struct TrustAnchorLink<'a> {
    /// the resolved trust anchor
    pub anchor: &'a PDVTrustAnchorChoice,
    /// true when the anchor is a certificate walked as cert index 0
    pub walked: bool,
    /// the first certificate beneath the anchor, if the chain has one
    pub child: Option<&'a PDVCertificate>,
    /// walk index of child
    pub child_index: usize,
}

/// The `CertificateValidator` trait is implemented by each step of the validation pipeline.
///
/// An instance is created for one chain and sees each certificate of that chain exactly once, in
/// anchor-to-leaf order. Implementations keep whatever running state they need across calls,
/// including the index of the certificate being processed.
pub trait CertificateValidator {
    /// identifies the validator in failure reports
    fn kind(&self) -> ValidatorKind;

    /// `check` examines the next certificate in the walk. Extensions the validator processes are
    /// removed from `unclaimed`, which initially holds the OIDs of the certificate's critical
    /// extensions.
    fn check(&mut self, cert: &PDVCertificate, unclaimed: &mut ObjectIdentifierSet) -> Result<()>;

    /// `check_trust_anchor` is invoked once, before the walk, with the resolved trust anchor.
    fn check_trust_anchor(&mut self, _link: &TrustAnchorLink<'_>) -> Result<()> {
        Ok(())
    }
}
