use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::ChatCompleter;
use crate::pipeline::relevance::RelevanceScorer;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Both capabilities are trait objects constructed once at startup: the LLM
/// handle so tests can simulate outages deterministically, the scorer so a
/// semantic backend can replace the keyword one without touching handlers.
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<dyn ChatCompleter>,
    pub relevance_scorer: Arc<dyn RelevanceScorer>,
    pub config: Config,
}
