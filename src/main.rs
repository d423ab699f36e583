// Entrypoint for the CLI application.
// - Keeps `main` small: parse flags, set up logging, hand over to `Cli::run`.
// - Errors are printed once on stderr with their context chain.

use clap::Parser;
use lp_api::{cli::Cli, telemetry};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init(cli.debug);

    match cli.run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
