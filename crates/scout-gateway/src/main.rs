use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

mod app;
mod http;
mod rate_limit;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scout_gateway=info,tower_http=debug".into()),
        )
        .init();

    // load config: explicit path via SCOUT_CONFIG env > ./scout.toml
    let config_path = std::env::var("SCOUT_CONFIG").ok();
    let config = scout_core::ScoutConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        scout_core::ScoutConfig::default()
    });

    if config.llm.api_key.is_empty() {
        warn!("llm.api_key is not set — chat turns will return configuration errors");
    }

    let provider: Arc<dyn scout_agent::provider::LlmProvider> =
        Arc::new(scout_agent::openai::OpenAiProvider::new(
            config.llm.api_key.clone(),
            Some(config.llm.base_url.clone()),
        ));
    let validator = scout_agent::validator::KeyValidator::new(
        config.llm.api_key.clone(),
        config.llm.base_url.clone(),
    );
    let runtime = Arc::new(scout_agent::AgentRuntime::new(
        provider,
        config.llm.model.clone(),
        config.llm.max_tokens,
        validator,
    ));
    info!(model = %config.llm.model, "agent runtime initialized");

    let sessions = Arc::new(scout_sessions::SessionStore::new());

    let embedder: Arc<dyn scout_docs::Embedder> = Arc::new(scout_docs::OpenAiEmbedder::new(
        config.llm.api_key.clone(),
        config.llm.base_url.clone(),
        config.llm.embed_model.clone(),
    ));
    let docs = Arc::new(scout_docs::DocumentManager::new(
        &config.docs.upload_dir,
        embedder,
    )?);

    let orchestrator = scout_agent::TurnOrchestrator::new(
        Arc::clone(&runtime),
        Arc::clone(&sessions),
        Arc::clone(&docs),
        scout_agent::tools::default_tools(),
    );

    let rate = rate_limit::RateLimiter::new(
        Duration::from_secs(config.limits.window_secs),
        config.limits.max_requests,
    );

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    let state = Arc::new(app::AppState {
        config,
        orchestrator,
        sessions,
        docs,
        rate,
    });
    let router = app::build_router(Arc::clone(&state));

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("Scout gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
