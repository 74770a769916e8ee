//! Runs x509-limbo testcases against the default validator pipeline.
//!
//! Only the parts of a testcase that bear on chain validation are read. Signatures, peer names and
//! chain depth limits are not evaluated, so testcases that hinge on those may disagree with the
//! expected result.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use const_oid::db::rfc5280::{
    ANY_EXTENDED_KEY_USAGE, ID_KP_CLIENT_AUTH, ID_KP_CODE_SIGNING, ID_KP_EMAIL_PROTECTION,
    ID_KP_OCSP_SIGNING, ID_KP_SERVER_AUTH, ID_KP_TIME_STAMPING,
};
use const_oid::ObjectIdentifier;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use x509_cert::Certificate;

use chainval::*;

use crate::args::LimboArgs;
use crate::file_utils::{get_file_as_byte_vec, parse_certificates};
use crate::validate::EXIT_ERROR;

/// Top level structure of an x509-limbo file
#[derive(Debug, Deserialize)]
pub struct Limbo {
    /// format version
    #[serde(default)]
    pub version: u32,
    /// testcases in file order
    pub testcases: Vec<Testcase>,
}

/// Expected or observed outcome of a testcase
#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    /// the chain validates
    Success,
    /// the chain does not validate
    Failure,
}

/// A single x509-limbo testcase. Fields not listed here are ignored.
#[derive(Debug, Deserialize)]
pub struct Testcase {
    /// testcase identifier, i.e., `rfc5280::nc::permitted-dns-match`
    pub id: String,
    /// free-form description of what the testcase exercises
    #[serde(default)]
    pub description: String,
    /// PEM-encoded trust anchors
    #[serde(default)]
    pub trusted_certs: Vec<String>,
    /// PEM-encoded candidate intermediates, in no particular order
    #[serde(default)]
    pub untrusted_intermediates: Vec<String>,
    /// PEM-encoded leaf
    pub peer_certificate: String,
    /// RFC 3339 time of interest, i.e., `2024-01-01T00:00:00Z`
    #[serde(default)]
    pub validation_time: Option<DateTime<Utc>>,
    /// names of extended key usages the leaf must allow, i.e., `serverAuth`
    #[serde(default)]
    pub extended_key_usage: Vec<String>,
    /// expected outcome of validation
    pub expected_result: Outcome,
}

/// Outcome of running one testcase
#[derive(Debug, Serialize)]
pub struct TestcaseReport {
    pub id: String,
    pub expected: Outcome,
    /// None when the testcase was skipped
    pub actual: Option<Outcome>,
    pub failures: Vec<String>,
}

impl TestcaseReport {
    fn passed(&self) -> bool {
        self.actual == Some(self.expected)
    }
}

/// `time_of_interest` returns the validation time of tc, or the current time when none is given.
fn time_of_interest(tc: &Testcase) -> Result<TimeOfInterest> {
    match &tc.validation_time {
        Some(toi) => {
            let secs = u64::try_from(toi.timestamp()).map_err(|_| Error::ParseError)?;
            Ok(TimeOfInterest::from_unix_secs(secs)?)
        }
        None => Ok(TimeOfInterest::now()),
    }
}

/// Maps the extended key usage names used by x509-limbo to object identifiers.
fn eku_from_name(name: &str) -> Option<ObjectIdentifier> {
    match name {
        "serverAuth" => Some(ID_KP_SERVER_AUTH),
        "clientAuth" => Some(ID_KP_CLIENT_AUTH),
        "codeSigning" => Some(ID_KP_CODE_SIGNING),
        "emailProtection" => Some(ID_KP_EMAIL_PROTECTION),
        "timeStamping" => Some(ID_KP_TIME_STAMPING),
        "OCSPSigning" => Some(ID_KP_OCSP_SIGNING),
        "anyExtendedKeyUsage" => Some(ANY_EXTENDED_KEY_USAGE),
        _ => None,
    }
}

fn parse_pem_list(pems: &[String]) -> Result<Vec<Certificate>> {
    let mut certs = Vec::new();
    for pem in pems {
        certs.extend(parse_certificates(pem.as_bytes())?);
    }
    Ok(certs)
}

/// `assemble_chain` orders the peer and the intermediates that chain to it, leaf first, by matching
/// issuer names to subject names. Assembly stops at a certificate issued by a trust anchor, at a
/// self-issued certificate or when no unused intermediate matches.
fn assemble_chain(
    peer: Certificate,
    intermediates: &[Certificate],
    anchors: &[Certificate],
) -> Vec<Certificate> {
    let mut used = vec![false; intermediates.len()];
    let mut chain = vec![peer];
    loop {
        let next = match chain.last() {
            Some(current)
                if !is_self_issued(current)
                    && !anchors.iter().any(|ta| {
                        compare_names(&ta.tbs_certificate.subject, &current.tbs_certificate.issuer)
                    }) =>
            {
                intermediates
                    .iter()
                    .enumerate()
                    .find(|(i, c)| {
                        !used[*i]
                            && compare_names(&c.tbs_certificate.subject, &current.tbs_certificate.issuer)
                    })
                    .map(|(i, _)| i)
            }
            _ => None,
        };
        match next {
            Some(i) => {
                used[i] = true;
                chain.push(intermediates[i].clone());
            }
            None => break,
        }
    }
    chain
}

/// `evaluate` runs one testcase through engine.
fn evaluate(engine: &ChainValidationEngine, tc: &Testcase) -> Result<CertificateValidationResult> {
    let anchors = parse_pem_list(&tc.trusted_certs)?;
    let intermediates = parse_pem_list(&tc.untrusted_intermediates)?;
    let peer = parse_certificates(tc.peer_certificate.as_bytes())?
        .into_iter()
        .next()
        .ok_or(Error::NotFound)?;

    let mut tas = Vec::new();
    for ta in &anchors {
        tas.push(PDVTrustAnchorChoice::try_from(ta.clone())?);
    }
    let mut ctx = CertificateValidationContext::new(tas);
    ctx.allow_included_trust_anchor = false;
    ctx.date = time_of_interest(tc)?;
    for name in &tc.extended_key_usage {
        match eku_from_name(name) {
            Some(oid) => {
                ctx.expected_ekus.insert(oid);
            }
            None => warn!("{}: ignoring unrecognized extended key usage {}", tc.id, name),
        }
    }

    let chain = CertificateChain::from_certificates(assemble_chain(peer, &intermediates, &anchors))?;
    Ok(engine.validate(&chain, &ctx))
}

fn is_ignored(id: &str, ignore: &[String]) -> bool {
    ignore.iter().any(|pattern| match pattern.strip_suffix('*') {
        Some(prefix) => id.starts_with(prefix),
        None => id == pattern,
    })
}

fn read_limbo(path: &Path) -> Result<Limbo> {
    let buffer = get_file_as_byte_vec(path)?;
    serde_json::from_slice(&buffer).map_err(|e| {
        error!("Failed to parse limbo file {}: {}", path.display(), e);
        Error::ParseError
    })
}

fn write_reports(path: &Path, reports: &[TestcaseReport]) -> Result<()> {
    let json = serde_json::to_string_pretty(reports).map_err(|e| {
        error!("Failed to serialize testcase reports: {}", e);
        Error::ParseError
    })?;
    let mut f = File::create(path)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

/// `run_limbo` runs the testcases in the file named by args and prints a summary. Exits with 0
/// when every testcase that ran produced the expected result.
pub fn run_limbo(args: &LimboArgs) -> ExitCode {
    let limbo = match read_limbo(&args.limbo_file) {
        Ok(limbo) => limbo,
        Err(_) => return ExitCode::from(EXIT_ERROR),
    };
    debug!(
        "Read {} testcase(s) from version {} limbo file",
        limbo.testcases.len(),
        limbo.version
    );

    let engine = ChainValidationEngine::new();
    let mut reports = Vec::new();
    for tc in &limbo.testcases {
        let selected = args.filter.as_ref().map_or(true, |f| tc.id.contains(f.as_str()));
        if !selected || is_ignored(&tc.id, &args.ignore) {
            reports.push(TestcaseReport {
                id: tc.id.clone(),
                expected: tc.expected_result,
                actual: None,
                failures: Vec::new(),
            });
            continue;
        }

        let (actual, failures) = match evaluate(&engine, tc) {
            Ok(result) if result.is_valid() => (Outcome::Success, Vec::new()),
            Ok(result) => (
                Outcome::Failure,
                result
                    .validator_failures
                    .iter()
                    .map(|f| f.error_message())
                    .collect(),
            ),
            Err(e) => (Outcome::Failure, vec![e.to_string()]),
        };
        let report = TestcaseReport {
            id: tc.id.clone(),
            expected: tc.expected_result,
            actual: Some(actual),
            failures,
        };
        if !report.passed() {
            info!(
                "{}: expected {:?}, got {:?} {:?}. {}",
                report.id, report.expected, actual, report.failures, tc.description
            );
        }
        reports.push(report);
    }

    let skipped = reports.iter().filter(|r| r.actual.is_none()).count();
    let passed = reports.iter().filter(|r| r.passed()).count();
    let failed = reports.len() - skipped - passed;
    println!("Passed: {}, Failed: {}, Skipped: {}", passed, failed, skipped);

    if let Some(output) = &args.output {
        if let Err(e) = write_reports(output, &reports) {
            error!("Failed to write {}: {}", output.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    }

    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
