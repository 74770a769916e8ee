//! Implements the validate action

use std::process::ExitCode;

use log::{error, info};

use chainval::*;

use crate::args::ValidateArgs;
use crate::file_utils::{read_certificates, read_trust_anchors};

/// Exit status used when inputs could not be read
pub const EXIT_ERROR: u8 = 2;

/// `build_context` prepares a validation context from the context file, if any, the trust anchors
/// and the time of interest given on the command line.
fn build_context(args: &ValidateArgs) -> Result<CertificateValidationContext> {
    let mut ctx = match &args.context {
        Some(path) => CertificateValidationContext::read_context(path)?,
        None => CertificateValidationContext::default(),
    };
    ctx.trust_anchors = read_trust_anchors(&args.trust_anchors)?;
    if let Some(toi) = args.time_of_interest {
        ctx.date = TimeOfInterest::from_unix_secs(toi)?;
    }
    Ok(ctx)
}

fn validate(args: &ValidateArgs) -> Result<CertificateValidationResult> {
    let ctx = build_context(args)?;

    let mut certs = Vec::new();
    for path in &args.chain {
        certs.extend(read_certificates(path)?);
    }
    let chain = CertificateChain::from_certificates(certs)?;
    info!(
        "Validating {} certificate(s) against {} trust anchor(s)",
        chain.len(),
        ctx.trust_anchors.len()
    );

    let engine = ChainValidationEngine::with_factory(Rfc5280ValidatorFactory::without(&args.skip));
    Ok(engine.validate(&chain, &ctx))
}

/// `run_validate` validates the chain described by args and prints the result as JSON.
pub fn run_validate(args: &ValidateArgs) -> ExitCode {
    let result = match validate(args) {
        Ok(result) => result,
        Err(e) => {
            error!("Failed to validate chain: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            error!("Failed to serialize validation result: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    }
    if result.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
