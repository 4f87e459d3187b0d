// Entrypoint for the CLI application.
// - Keeps `main` small: parse arguments, set up logging, hand over to the
//   UI layer.
// - Returns `anyhow::Result` so any error exits non-zero with its message.

use clap::Parser;
use pockyt::{cli::Cli, ui};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    ui::run(cli)
}

/// Logs go to stderr so they never mix with rendered items on stdout.
fn init_tracing(verbose: bool) {
    let default = if verbose { "pockyt=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
