use std::process;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use rscombo::cli::args::Cli;
use rscombo::cli::commands::execute_command;
use rscombo::cli::output;
use rscombo::exitcode;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("RSCOMBO_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute_command(cli) {
        Ok(()) => process::exit(exitcode::OK),
        Err(e) => {
            output::error(&e);
            process::exit(e.exit_code());
        }
    }
}
