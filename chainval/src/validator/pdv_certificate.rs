//! Wrapper around decoded certificates that caches the extensions used during chain validation

use alloc::vec::Vec;

use der::{asn1::ObjectIdentifier, Decode, Encode};
use x509_cert::Certificate;

use crate::pdv_extension::*;
use crate::util::error::*;

/// [`PDVCertificate`] is used to aggregate a binary, DER-encoded Certificate, a parsed Certificate
/// and parsed extensions in support of chain validation.
///
/// The parsed extensions are those listed in [`EXTS_OF_INTEREST`]. Instances are not modified once
/// constructed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PDVCertificate {
    /// Binary, encoded Certificate object
    pub encoded_cert: Vec<u8>,
    /// Decoded Certificate object
    pub decoded_cert: Certificate,
    /// Parsed extensions from the Certificate
    pub parsed_extensions: ParsedExtensions,
}

impl TryFrom<&[u8]> for PDVCertificate {
    type Error = der::Error;

    fn try_from(enc_cert: &[u8]) -> der::Result<Self> {
        let cert = Certificate::from_der(enc_cert)?;
        let mut pdv_cert = PDVCertificate {
            encoded_cert: enc_cert.to_vec(),
            decoded_cert: cert,
            parsed_extensions: Default::default(),
        };
        pdv_cert.parse_extensions(EXTS_OF_INTEREST);
        Ok(pdv_cert)
    }
}

impl TryFrom<Certificate> for PDVCertificate {
    type Error = der::Error;

    fn try_from(cert: Certificate) -> der::Result<Self> {
        let enc_cert = cert.to_der()?;
        let mut pdv_cert = PDVCertificate {
            encoded_cert: enc_cert,
            decoded_cert: cert,
            parsed_extensions: Default::default(),
        };
        pdv_cert.parse_extensions(EXTS_OF_INTEREST);
        Ok(pdv_cert)
    }
}

impl PDVCertificate {
    /// Returns the criticality of the extension identified by oid, or None if the extension is absent.
    pub fn extension_criticality(&self, oid: &ObjectIdentifier) -> Option<bool> {
        is_critical(
            self.decoded_cert.tbs_certificate.extensions.as_deref(),
            oid,
        )
    }

    /// Returns the OIDs of all extensions marked critical in the certificate.
    pub fn critical_extensions(&self) -> ObjectIdentifierSet {
        self.decoded_cert
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .filter(|ext| ext.critical)
            .map(|ext| ext.extn_id)
            .collect()
    }
}

impl ExtensionProcessing for PDVCertificate {
    /// `get_extension` takes an ObjectIdentifier that identifies an extension type and returns
    /// a previously parsed [`PDVExtension`] instance containing the decoded extension if the extension was present.
    fn get_extension(&self, oid: &ObjectIdentifier) -> Result<Option<&'_ PDVExtension>> {
        get_from_extensions(
            &self.parsed_extensions,
            self.decoded_cert.tbs_certificate.extensions.as_deref(),
            oid,
        )
    }

    fn parse_extension(&mut self, oid: &ObjectIdentifier) -> Result<Option<&PDVExtension>> {
        parse_from_extensions(
            &mut self.parsed_extensions,
            self.decoded_cert.tbs_certificate.extensions.as_deref(),
            oid,
        )
    }
}

