use anyhow::Context;

use bazaar_infra::{AppConfig, config::load_dotenv};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `.env` may set LOG_FORMAT/RUST_LOG, so it is read before logging starts
    // and any failure is reported once logging is up.
    let dotenv = load_dotenv();
    bazaar_observability::init();
    if let Err(e) = dotenv {
        tracing::warn!(error = %e, "continuing without .env");
    }

    let cfg = AppConfig::from_env().context("loading configuration")?;
    tracing::info!(config = ?cfg, "starting bazaar api");

    let app = bazaar_api::app::build_app(&cfg).await?;

    let listener = tokio::net::TcpListener::bind(cfg.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
