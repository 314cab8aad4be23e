//! Concordant CLI: run executable HTML specifications
//!
//! ## Usage
//!
//! ```bash
//! concordant run spec/Hello.html                 # fixture data from spec/Hello.yaml
//! concordant run spec/Hello.html --format json   # machine-readable summary
//! concordant check spec/Hello.html               # list the command call tree
//! concordant config --defaults                   # print the default configuration
//! ```

use clap::Parser;
use concordant_cli::{handlers, init_logging, Cli, CliConfig, CliResult, ColorChoice, Commands, Verbosity};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}

fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    init_logging(config.verbosity, config.color);

    match cli.command {
        Commands::Run(args) => {
            let passed = handlers::execute_run(&config, &args)?;
            Ok(if passed { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Commands::Check(args) => {
            handlers::execute_check(&config, &args)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config(args) => {
            handlers::execute_config(&config, &args)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_config(cli: &Cli) -> CliResult<CliConfig> {
    let color: ColorChoice = cli.color.into();
    let config = CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.verbose, cli.quiet))
        .with_color(color);
    match &cli.config {
        Some(path) => config.with_engine_file(path),
        None => Ok(config),
    }
}
