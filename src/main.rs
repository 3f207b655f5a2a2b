// Main CLI entry point for Reflector
// Uses clap for argument parsing and tracing for diagnostics on stderr

use reflector::config::{build_command, ScanConfig};
use reflector::runner::run;
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let matches = build_command().get_matches();
    let config = ScanConfig::from_matches(&matches);
    init_logging(config.verbosity);

    let stdout = io::stdout();
    let summary = run(&config, &mut stdout.lock());
    if summary.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
