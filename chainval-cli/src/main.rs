#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

mod args;
mod file_utils;
mod limbo;
mod validate;

use std::process::ExitCode;

use clap::Parser;
use log::{debug, LevelFilter};
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use crate::args::*;
use crate::limbo::run_limbo;
use crate::validate::run_validate;

/// Configures log4rs from logging_config, if given, else logs info and above to stderr. Logging
/// problems are reported and otherwise ignored.
fn configure_logging(logging_config: Option<&str>) {
    if let Some(logging_config) = logging_config {
        match log4rs::init_file(logging_config, Default::default()) {
            Ok(()) => return,
            Err(e) => eprintln!(
                "ERROR: failed to configure logging using {} with {:?}. Continuing with default logging.",
                logging_config, e
            ),
        }
    }

    // stdout is reserved for results
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{m}{n}")))
        .build();
    match Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Info))
    {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                eprintln!(
                    "ERROR: failed to configure logging for stderr with {:?}. Continuing without logging.",
                    e
                );
            }
        }
        Err(e) => {
            eprintln!(
                "ERROR: failed to prepare default logging configuration with {:?}. Continuing without logging",
                e
            );
        }
    }
}

/// Point of entry for the chainval application.
fn main() -> ExitCode {
    let args = ChainvalArgs::parse();
    configure_logging(args.logging_config.as_deref());
    debug!("chainval start");

    let status = match &args.command {
        Commands::Validate(validate_args) => run_validate(validate_args),
        Commands::Limbo(limbo_args) => run_limbo(limbo_args),
    };

    debug!("chainval end");
    status
}
