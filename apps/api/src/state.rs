use crate::config::Config;
use crate::matching::evaluator::MatchEvaluator;

/// Shared application state injected into all route handlers via Axum extractors.
/// Holds nothing mutable: each request owns its own buffers.
#[derive(Clone)]
pub struct AppState {
    pub evaluator: MatchEvaluator,
    pub config: Config,
}
