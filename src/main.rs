use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use service_chat::catalog::CategoryCatalog;
use service_chat::chat::ChatOrchestrator;
use service_chat::config::Config;
use service_chat::llm::{LlmConfig, create_provider};
use service_chat::server;
use service_chat::store::LibSqlStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env().context("failed to load configuration")?;

    let catalog = CategoryCatalog::load(&config.category_ids_path, &config.category_trees_path)
        .await
        .context("failed to load category catalog")?;
    info!(categories = catalog.len(), "Category catalog loaded");

    let store = LibSqlStore::new_local(&config.db_path)
        .await
        .context("failed to open lead database")?;

    let llm = create_provider(&LlmConfig {
        api_key: config.openai_api_key.clone(),
        model: config.model.clone(),
        timeout: config.llm_timeout,
    })
    .context("failed to create LLM provider")?;

    let orchestrator = Arc::new(ChatOrchestrator::new(catalog, llm, Arc::new(store)));
    let app = server::router(orchestrator);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {addr}");

    axum::serve(listener, app)
        .await
        .context("server terminated")?;
    Ok(())
}
