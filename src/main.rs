use anyhow::Context;
use textdesk::{config::load_config, server::Server};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("failed to load config.toml")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_deref().unwrap_or("info")));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let server = Server::new(&config.server.address, config.server.port)
        .await
        .with_context(|| format!("failed to bind {}:{}", config.server.address, config.server.port))?;
    info!("listening on {}", server.local_addr()?);

    server.start().await?;

    Ok(())
}
