mod config;
mod errors;
mod llm_client;
mod pipeline;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::{ChatCompleter, GroqClient};
use crate::pipeline::relevance::{KeywordRelevanceScorer, RelevanceScorer};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Crate name, not package name: hyphens are invalid in tracing
            // targets, so `reviewer-api` would filter our own logs out.
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume reviewer API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client. A missing key is not fatal: the pipeline serves
    // complete responses in degraded mode until a credential is configured.
    if config.groq_api_key.is_none() {
        warn!("GROQ_API_KEY not set; rewrite and critique will run in degraded mode");
    }
    let llm: Arc<dyn ChatCompleter> = Arc::new(GroqClient::new(
        config.groq_api_key.clone(),
        config.llm_timeout_secs,
    ));
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Keyword scorer by default; the trait seam allows a semantic backend.
    let relevance_scorer: Arc<dyn RelevanceScorer> = Arc::new(KeywordRelevanceScorer);

    let state = AppState {
        llm,
        relevance_scorer,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_default_log_target_is_a_valid_tracing_target() {
        // The default EnvFilter directive is built from this name; a hyphen
        // would make the directive match nothing and mute our own logs.
        assert!(!env!("CARGO_CRATE_NAME").contains('-'));
    }
}
