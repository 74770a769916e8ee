//! Arguments for the chainval utility

use std::path::PathBuf;

use chainval::ValidatorKind;
use clap::{Args, Parser, Subcommand};

/// Validates X.509 certificate chains per RFC 5280
#[derive(Parser, Debug)]
#[command(arg_required_else_help(true))]
#[clap(author, version, about, long_about = None)]
pub struct ChainvalArgs {
    /// Full path and filename of YAML-formatted configuration file for log4rs logging mechanism.
    /// See <https://docs.rs/log4rs/latest/log4rs/> for details. When absent, messages at info level
    /// and above are written to stderr.
    #[clap(short, long, global = true, help_heading = "COMMON OPTIONS")]
    pub logging_config: Option<String>,

    /// Action to perform
    #[command(subcommand)]
    pub command: Commands,
}

/// Actions supported by the chainval utility
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a certificate chain and print the result as JSON. Exits with 0 when the chain is
    /// valid, 1 when it is not and 2 when inputs could not be read.
    Validate(ValidateArgs),
    /// Run the testcases in an x509-limbo JSON file and report which ones disagree with the
    /// expected result.
    Limbo(LimboArgs),
}

/// Arguments for the validate action
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Trust anchor file (PEM or DER) or folder containing trust anchor files. May be repeated.
    #[clap(short, long = "ta", required = true, help_heading = "TRUST ANCHORS")]
    pub trust_anchors: Vec<PathBuf>,

    /// Certificate file (PEM or DER). May be repeated; certificates are taken in the order given,
    /// leaf first, and a PEM file may hold several certificates.
    #[clap(short, long, required = true, help_heading = "VALIDATION")]
    pub chain: Vec<PathBuf>,

    /// Full path and filename of JSON-formatted validation context.
    #[clap(long, help_heading = "VALIDATION")]
    pub context: Option<PathBuf>,

    /// Time to use for validation expressed as the number of seconds since Unix epoch. Overrides
    /// the context. Zero disables validity period checks.
    #[clap(short = 'i', long, help_heading = "VALIDATION")]
    pub time_of_interest: Option<u64>,

    /// Comma-separated list of validators to leave out of the default pipeline, i.e.,
    /// KeyIdentifier,Policy
    #[clap(long, value_delimiter = ',', help_heading = "VALIDATION")]
    pub skip: Vec<ValidatorKind>,
}

/// Arguments for the limbo action
#[derive(Args, Debug)]
pub struct LimboArgs {
    /// Full path and filename of x509-limbo JSON file.
    #[clap(short = 'f', long, help_heading = "LIMBO")]
    pub limbo_file: PathBuf,

    /// Identifier of a testcase to skip. May be repeated. A trailing * matches any suffix.
    #[clap(long, help_heading = "LIMBO")]
    pub ignore: Vec<String>,

    /// Only run testcases whose identifier contains this text.
    #[clap(long, help_heading = "LIMBO")]
    pub filter: Option<String>,

    /// Full path and filename to receive per-testcase outcomes as JSON.
    #[clap(short, long, help_heading = "LIMBO")]
    pub output: Option<PathBuf>,
}
