use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("building log filter")?;
    fmt().with_env_filter(filter).init();

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let config_path = std::env::var(drivepress::config::CONFIG_ENV).unwrap_or_else(|_| "<defaults>".to_string());
    info!(target: "drivepress", "drivepress starting: RUST_LOG='{}', config='{}'", rust_log, config_path);

    let cfg = drivepress::config::AppConfig::load()?;
    drivepress::server::run(cfg).await
}
