//! Reads certificates and trust anchors from PEM or DER files

use std::path::{Path, PathBuf};

use der::{Decode, Reader, SliceReader};
use log::{debug, error};
use walkdir::WalkDir;
use x509_cert::Certificate;

use chainval::{Error, PDVTrustAnchorChoice, Result};

/// File extensions considered when a folder of trust anchors is given
const CERT_EXTENSIONS: [&str; 4] = ["der", "crt", "cer", "pem"];

/// `get_file_as_byte_vec` takes a Path containing a file name and returns a vector of bytes
/// containing the contents of that file or an [Error::StdIoError].
pub fn get_file_as_byte_vec(filename: &Path) -> Result<Vec<u8>> {
    match std::fs::read(filename) {
        Ok(b) => Ok(b),
        Err(e) => {
            error!("Failed to read {}: {}", filename.display(), e);
            Err(Error::StdIoError(e.kind()))
        }
    }
}

/// `parse_certificates` decodes one or more certificates from buffer. PEM input may hold a
/// sequence of CERTIFICATE blocks and DER input may hold back-to-back encodings.
pub fn parse_certificates(buffer: &[u8]) -> Result<Vec<Certificate>> {
    if buffer.first() == Some(&0x2D) {
        return Ok(Certificate::load_pem_chain(buffer)?);
    }

    let mut reader = SliceReader::new(buffer)?;
    let mut certs = Vec::new();
    while !reader.is_finished() {
        certs.push(Certificate::decode(&mut reader)?);
    }
    if certs.is_empty() {
        return Err(Error::NotFound);
    }
    Ok(certs)
}

/// `read_certificates` returns the certificates found in filename.
pub fn read_certificates(filename: &Path) -> Result<Vec<Certificate>> {
    let buffer = get_file_as_byte_vec(filename)?;
    parse_certificates(&buffer).map_err(|e| {
        error!("Failed to parse certificate(s) from {}: {}", filename.display(), e);
        e
    })
}

fn has_cert_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| CERT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// `read_trust_anchors` returns trust anchors read from each path, which is either a certificate
/// file or a folder that is searched recursively for certificate files.
pub fn read_trust_anchors(paths: &[PathBuf]) -> Result<Vec<PDVTrustAnchorChoice>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        for entry in WalkDir::new(path).sort_by_file_name() {
            match entry {
                Ok(e) => {
                    if e.file_type().is_file() && has_cert_extension(e.path()) {
                        files.push(e.into_path());
                    }
                }
                Err(e) => {
                    error!("Failed to read entry in {}: {}", path.display(), e);
                }
            }
        }
    }

    let mut tas = Vec::new();
    for file in files {
        for cert in read_certificates(&file)? {
            tas.push(PDVTrustAnchorChoice::try_from(cert)?);
        }
        debug!("Read trust anchor(s) from {}", file.display());
    }
    if tas.is_empty() {
        error!("No trust anchors were found");
        return Err(Error::NotFound);
    }
    Ok(tas)
}

#[test]
fn rejects_empty_and_garbage_input() {
    assert!(parse_certificates(&[]).is_err());
    assert!(parse_certificates(&[0x30, 0x03, 0x02, 0x01, 0x01]).is_err());
    assert!(parse_certificates(b"-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n").is_err());
}

#[test]
fn recognizes_certificate_files() {
    assert!(has_cert_extension(Path::new("ta.der")));
    assert!(has_cert_extension(Path::new("/tmp/ROOT.PEM")));
    assert!(!has_cert_extension(Path::new("notes.txt")));
    assert!(!has_cert_extension(Path::new("README")));
}
