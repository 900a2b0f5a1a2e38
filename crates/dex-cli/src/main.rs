//! `dex` entry point.

use anyhow::Result;
use clap::Parser;
use dex_cli::{App, AppConfig, Cli, CliError};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config path: CLI arg > DEX_CONFIG env var > default
    let config_path = AppConfig::resolve_path(cli.config.clone());
    let config = AppConfig::from_file(&config_path)?;

    dex_telemetry::init_logging(config.logging_options()?)?;
    info!(
        config_path = %config_path,
        rpc_url = %config.rpc_url,
        program_id = %config.program_id,
        "Starting dex v{}",
        env!("CARGO_PKG_VERSION")
    );

    let app = App::new(&config).await?;
    let identity = app.connect_keypair(&config)?;
    info!(%identity, "Keypair loaded");

    let mut stdout = std::io::stdout();
    if let Err(err) = app.run(cli.command, &mut stdout).await {
        report(&err);
        std::process::exit(1);
    }
    Ok(())
}

fn report(err: &CliError) {
    match err {
        CliError::Client(client) => {
            error!(kind = %client.kind(), retryable = client.is_retryable(), "{client}");
            eprintln!("error [{}]: {client}", client.kind());
        }
        other => eprintln!("error: {other}"),
    }
    if let Some(hint) = err.hint() {
        eprintln!("hint: {hint}");
    }
}
