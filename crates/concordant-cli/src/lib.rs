//! Concordant CLI Library
//!
//! Command-line front end for the Concordant specification engine.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;

pub use commands::{CheckArgs, Cli, ColorArg, Commands, ConfigArgs, OutputFormatArg, RunArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{OutputFormat, RunReport, SummaryPrinter};

/// Install the `tracing` subscriber. `RUST_LOG` wins over the verbosity
/// flags; logs go to stderr so stdout stays parseable.
pub fn init_logging(verbosity: Verbosity, color: ColorChoice) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(color.should_color())
        .with_target(false)
        .try_init();
}
