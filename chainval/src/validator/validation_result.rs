//! Structures that convey the outcome of certificate chain validation

use alloc::string::String;
use alloc::vec::Vec;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::util::error::Error;
use crate::util::pdv_utilities::serialize_display;
use crate::validator::cert_validator::ValidatorKind;

/// `ValidatorFailure` records one error reported by one validator for one certificate.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ValidatorFailure {
    /// validator that reported the error
    #[serde(serialize_with = "serialize_display")]
    pub validator: ValidatorKind,
    /// index of the certificate in the anchor-to-leaf walk
    pub cert_index: usize,
    /// error reported by the validator
    #[serde(serialize_with = "serialize_display")]
    pub error: Error,
}

impl ValidatorFailure {
    /// message text of the error
    pub fn error_message(&self) -> String {
        self.error.to_string()
    }
}

/// `CertificateValidationResult` collects every failure observed while validating a chain. A chain is
/// valid if and only if no failures were recorded.
///
/// The serialized form carries a `valid` field computed from the failures.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertificateValidationResult {
    /// failures in the order they were observed
    pub validator_failures: Vec<ValidatorFailure>,
}

impl Default for CertificateValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl CertificateValidationResult {
    /// Instantiates a result with no failures.
    pub fn new() -> Self {
        CertificateValidationResult {
            validator_failures: Vec::new(),
        }
    }

    /// true if no validator reported an error
    pub fn is_valid(&self) -> bool {
        self.validator_failures.is_empty()
    }

    /// records a failure
    pub fn add_failure(&mut self, validator: ValidatorKind, cert_index: usize, error: Error) {
        self.validator_failures.push(ValidatorFailure {
            validator,
            cert_index,
            error,
        });
    }

    /// message of the first failure, if any
    pub fn error_message(&self) -> Option<String> {
        self.validator_failures.first().map(|f| f.error_message())
    }

    /// failures reported by the given validator
    pub fn failures_for(&self, validator: ValidatorKind) -> impl Iterator<Item = &ValidatorFailure> + '_ {
        self.validator_failures
            .iter()
            .filter(move |f| f.validator == validator)
    }
}

impl Serialize for CertificateValidationResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("CertificateValidationResult", 2)?;
        state.serialize_field("valid", &self.is_valid())?;
        state.serialize_field("validator_failures", &self.validator_failures)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_messages() {
        let mut result = CertificateValidationResult::new();
        assert!(result.is_valid());
        result.add_failure(
            ValidatorKind::BasicConstraints,
            1,
            Error::BasicConstraints("Missing CA flag at cert index 1.".into()),
        );
        assert!(!result.is_valid());
        assert_eq!(
            Some("Missing CA flag at cert index 1.".to_string()),
            result.error_message()
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(false, json["valid"]);
        assert_eq!(
            "BasicConstraintsValidator",
            json["validator_failures"][0]["validator"]
        );
        assert_eq!(1, json["validator_failures"][0]["cert_index"]);
        assert_eq!(
            "Missing CA flag at cert index 1.",
            json["validator_failures"][0]["error"]
        );
    }

    #[test]
    fn validity_follows_failures() {
        let mut result = CertificateValidationResult::new();
        assert_eq!(true, serde_json::to_value(&result).unwrap()["valid"]);
        result.validator_failures.push(ValidatorFailure {
            validator: ValidatorKind::KeyUsage,
            cert_index: 0,
            error: Error::KeyUsage("Missing KeyUsage extension at cert index 0.".into()),
        });
        assert!(!result.is_valid());
        assert_eq!(false, serde_json::to_value(&result).unwrap()["valid"]);
        result.validator_failures.clear();
        assert_eq!(true, serde_json::to_value(&result).unwrap()["valid"]);
    }
}
