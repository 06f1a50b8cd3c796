use anyhow::{Context, Result};
use clap::Parser;
use rustle_service::cli::{print_outcome, RustleServiceCli, RustleServiceCliImpl};
use rustle_service::ManagerConfig;
use tracing::{debug, error};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = RustleServiceCli::parse();

    // Initialize tracing
    let level = if cli.verbosity > 0 {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    debug!("Starting rustle-service v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => ManagerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ManagerConfig::default(),
    }
    .with_engine(cli.engine);

    let service_cli = RustleServiceCliImpl::new(&config)?;
    match service_cli.execute(&cli.command).await {
        Ok(outcome) => print_outcome(&outcome)?,
        Err(e) => {
            error!("❌ {} ({})", e, e.kind());
            return Err(e.into());
        }
    }

    Ok(())
}
