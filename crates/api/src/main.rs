use std::sync::Arc;

use anyhow::Context;

use pvz_api::config::ApiConfig;
use pvz_infra::InfraConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real deployments set the environment directly.
    let _ = dotenvy::dotenv();
    pvz_observability::init();

    let api_config = ApiConfig::from_env()?;
    let infra_config = InfraConfig::from_env()?;

    let services = pvz_api::app::services::build_services(&infra_config)
        .await
        .context("failed to initialise storage")?;
    let app = pvz_api::app::build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(api_config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", api_config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
