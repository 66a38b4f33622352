/// Cadence CLI
///
/// Loads scripts into an engine and drives them on a tick scheduler. Useful for
/// trying scripts outside a host application and for checking them in CI.
use cadence_core::cli::{self, Cli};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // RUST_LOG wins; otherwise the configured filter
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli::log_filter(&cli)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run_cli_with_args(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
