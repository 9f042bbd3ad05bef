mod config;
mod llm;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use llm::LlmStream;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = config::ServerConfig::from_env();

    // Initialize LLM client (non-fatal: the relay answers 500 until configured).
    let llm: Option<Arc<dyn LlmStream>> = match llm::LlmClient::from_env() {
        Ok(client) => {
            tracing::info!(provider = client.provider(), model = client.model(), "LLM client initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM client not configured; chat relay disabled");
            None
        }
    };

    let system_prompt = services::prompt::system_prompt_from_env().expect("system prompt profile failed to load");
    let state = state::AppState::new(llm, system_prompt, config.relay);

    match &config.site_dir {
        Some(dir) => tracing::info!(site_dir = %dir.display(), "serving page shell"),
        None => tracing::info!("SITE_DIR not set; serving API only"),
    }

    let app = routes::app(state, config.site_dir.as_deref());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, max_duration = ?config.relay.max_duration, "forge relay listening");
    axum::serve(listener, app).await.expect("server failed");
}
