//! Validity period and per-certificate structural checks

use alloc::format;

use const_oid::db::rfc5912::ID_CE_SUBJECT_ALT_NAME;

use crate::util::error::*;
use crate::util::time_of_interest::TimeOfInterest;
use crate::validator::cert_validator::*;
use crate::validator::pdv_extension::*;
use crate::{CertificateValidationContext, PDVCertificate};

/// `TimeValidityValidator` compares each certificate's validity period with the time of interest.
/// A disabled time of interest turns the check off.
pub struct TimeValidityValidator {
    current_cert_index: usize,
    date: TimeOfInterest,
}

impl TimeValidityValidator {
    /// Instantiates a validator that evaluates validity periods at ctx.date.
    pub fn new(ctx: &CertificateValidationContext, _path_length: usize) -> Self {
        TimeValidityValidator {
            current_cert_index: 0,
            date: ctx.date,
        }
    }
}

impl CertificateValidator for TimeValidityValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::TimeValidity
    }

    fn check(&mut self, cert: &PDVCertificate, _unclaimed: &mut ObjectIdentifierSet) -> Result<()> {
        let index = self.current_cert_index;
        self.current_cert_index += 1;
        if self.date.is_disabled() {
            return Ok(());
        }

        let validity = &cert.decoded_cert.tbs_certificate.validity;
        if self.date < validity.not_before {
            return Err(Error::CertificateValidity(format!(
                "Certificate at index {} is not yet valid. Valid from {}.",
                index,
                validity.not_before.to_date_time()
            )));
        }
        if self.date > validity.not_after {
            return Err(Error::CertificateValidity(format!(
                "Certificate at index {} has expired. Valid until {}.",
                index,
                validity.not_after.to_date_time()
            )));
        }
        Ok(())
    }
}

/// `CertValidityValidator` checks rules that apply to each certificate in isolation: the serial
/// number must be positive and at most 20 octets, an empty subject requires a critical
/// SubjectAltName and notBefore must not follow notAfter.
pub struct CertValidityValidator {
    current_cert_index: usize,
}

impl CertValidityValidator {
    /// Instantiates a validator.
    pub fn new(_ctx: &CertificateValidationContext, _path_length: usize) -> Self {
        CertValidityValidator {
            current_cert_index: 0,
        }
    }
}

/// Checks the content octets of a serial number, returning the reason it is unacceptable, if any.
fn serial_number_problem(serial: &[u8]) -> Option<&'static str> {
    let negative = serial.first().map(|b| b & 0x80 != 0).unwrap_or(false);
    let magnitude = match serial {
        [0, rest @ ..] if !rest.is_empty() => rest,
        _ => serial,
    };
    if magnitude.len() > 20 {
        Some("exceeds 20 octets")
    } else if negative {
        Some("is negative")
    } else if serial.iter().all(|b| *b == 0) {
        Some("is zero")
    } else {
        None
    }
}

impl CertificateValidator for CertValidityValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::CertValidity
    }

    fn check(&mut self, cert: &PDVCertificate, _unclaimed: &mut ObjectIdentifierSet) -> Result<()> {
        let index = self.current_cert_index;
        self.current_cert_index += 1;
        let tbs = &cert.decoded_cert.tbs_certificate;

        if let Some(problem) = serial_number_problem(tbs.serial_number.as_bytes()) {
            return Err(Error::Asn1Structural(format!(
                "Certificate serial number at cert index {} {}.",
                index, problem
            )));
        }

        if tbs.subject.0.is_empty() && cert.extension_criticality(&ID_CE_SUBJECT_ALT_NAME) != Some(true)
        {
            return Err(Error::CertificateValidity(format!(
                "Certificate at index {} has an empty subject but no critical SubjectAltName extension.",
                index
            )));
        }

        if tbs.validity.not_before.to_date_time() > tbs.validity.not_after.to_date_time() {
            return Err(Error::Asn1Structural(format!(
                "Certificate at index {} has notBefore after notAfter.",
                index
            )));
        }
        Ok(())
    }
}

#[test]
fn serial_number_rules() {
    assert_eq!(None, serial_number_problem(&[0x01]));
    assert_eq!(None, serial_number_problem(&[0x00, 0x80]));
    assert_eq!(None, serial_number_problem(&[0x00, 0xFF, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F, 0x10, 0x11, 0x12, 0x13]));
    assert_eq!(Some("is zero"), serial_number_problem(&[0x00]));
    assert_eq!(Some("is negative"), serial_number_problem(&[0x80, 0x01]));
    assert_eq!(Some("exceeds 20 octets"), serial_number_problem(&[0x01; 21]));
}
