use anyhow::Result;
use tracing_subscriber::EnvFilter;

use sigstar::cli::{Cli, Commands};
use sigstar::commands;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // The dashboard owns the terminal, keep it quiet unless asked
    let default_level = match cli.command {
        Commands::Show { .. } => "warn",
        _ => "info",
    };
    init_tracing(default_level);

    commands::run(cli.command)
}

/// Log to stderr so table and JSON output on stdout stay clean.
/// `RUST_LOG` overrides the default level.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
