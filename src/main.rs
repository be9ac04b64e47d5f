use anyhow::Context;
use query_relay::{config::Config, startup, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; deployments usually inject the environment directly.
    let dotenv = dotenvy::dotenv();

    let config = Config::load().context("failed to load configuration")?;

    telemetry::init_tracing(&config.logging)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))?;

    if let Ok(path) = dotenv {
        tracing::info!(path = %path.display(), "Loaded environment file");
    }

    startup::serve(config).await?;

    Ok(())
}
