use std::process::ExitCode;

use rf_relay::{RelayConfig, RelayServer};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let conf = match RelayConfig::load() {
        Ok(conf) => conf,
        Err(e) => {
            error!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = run(conf).await {
        error!("Relay server failed: {e:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn run(conf: RelayConfig) -> anyhow::Result<()> {
    RelayServer::new(conf).await?.serve().await
}
