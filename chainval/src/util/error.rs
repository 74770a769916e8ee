//! Error types

use core::fmt;

/// Result type
pub type Result<T> = core::result::Result<T, Error>;

/// Error type
///
/// Variants that carry a `String` are produced by validators and the chain validation engine. The
/// string is the literal, human-readable failure message and is what [`fmt::Display`] emits for
/// those variants, so callers (and conformance fixtures) can compare message text directly.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// A basicConstraints requirement was not satisfied (missing, non-critical, no CA flag or path
    /// length exceeded).
    BasicConstraints(String),
    /// A keyUsage or extKeyUsage requirement was not satisfied.
    KeyUsage(String),
    /// A name constraint was violated or a name constraints extension could not be processed.
    NameConstraints(String),
    /// A certificate is outside its validity period or has inconsistent subject naming.
    CertificateValidity(String),
    /// A chain-level failure, i.e., trust anchor resolution, name chaining, key identifiers or
    /// certificate policies.
    CertificateChain(String),
    /// A certificate field is structurally unacceptable, i.e., serial number or validity ordering.
    Asn1Structural(String),
    /// A certificate featured a critical extension that no validator processed.
    UnrecognizedCriticalExtension(String),
    /// NotFound occurs when an action failed because a necessary artifact was not found.
    NotFound,
    /// An artifact could not be parsed
    ParseError,
    /// A configuration error was detected. See textual log output for more details.
    Misconfiguration,
    /// Asn1Error is used to propagate error information from the x509 crate.
    Asn1Error(der::Error),
    /// Error encapsulates an error derived from [std::io::ErrorKind]
    StdIoError(std::io::ErrorKind),
}

impl Error {
    /// Returns the failure message carried by validation variants, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Error::BasicConstraints(m)
            | Error::KeyUsage(m)
            | Error::NameConstraints(m)
            | Error::CertificateValidity(m)
            | Error::CertificateChain(m)
            | Error::Asn1Structural(m)
            | Error::UnrecognizedCriticalExtension(m) => Some(m.as_str()),
            _ => None,
        }
    }
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Error {
        Error::Asn1Error(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::StdIoError(err.kind())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BasicConstraints(m)
            | Error::KeyUsage(m)
            | Error::NameConstraints(m)
            | Error::CertificateValidity(m)
            | Error::CertificateChain(m)
            | Error::Asn1Structural(m)
            | Error::UnrecognizedCriticalExtension(m) => write!(f, "{}", m),
            Error::NotFound => write!(f, "NotFound"),
            Error::ParseError => write!(f, "ParseError"),
            Error::Misconfiguration => write!(f, "Misconfiguration"),
            Error::Asn1Error(err) => write!(f, "Asn1Error: {}", err),
            Error::StdIoError(err) => write!(f, "StdIoError: {:?}", err),
        }
    }
}

impl std::error::Error for Error {}

#[test]
fn display_is_message_text() {
    let e = Error::BasicConstraints("Missing CA flag at cert index 1.".to_string());
    assert_eq!("Missing CA flag at cert index 1.", e.to_string());
    assert_eq!(Some("Missing CA flag at cert index 1."), e.message());
    assert_eq!(None, Error::NotFound.message());
    assert_eq!("NotFound", Error::NotFound.to_string());
}
