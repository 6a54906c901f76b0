use anyhow::{Context, Result};
use wayfarer_api::{build_app, AppConfig};
use wayfarer_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("wayfarer_api");

    let config = AppConfig::from_env();
    let bind = config.bind.clone();
    let capabilities = config.providers.capabilities();
    let storage = if config.database_url.is_some() {
        "sqlite"
    } else {
        "memory"
    };

    let app = build_app(config).await?;

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!(
        bind = %bind,
        storage,
        weather = capabilities.weather,
        hotels = capabilities.hotels,
        cars = capabilities.cars,
        llm = capabilities.llm,
        "wayfarer chat api started"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
