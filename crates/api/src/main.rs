use anyhow::{Context, Result};
use genie_api::{build_app, ApiSettings};
use genie_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("genie_api");

    let bind = ApiSettings::from_env().bind;
    let app = build_app()?;

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    tracing::info!(bind = %bind, "voice gateway started");

    axum::serve(listener, app).await?;
    Ok(())
}
