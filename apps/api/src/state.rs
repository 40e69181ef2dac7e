use crate::config::Config;
use crate::llm_client::ModelGateway;

/// Shared application state injected into all route handlers via Axum extractors.
/// Built once at startup and read-only afterwards.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Retrying front door to the generation service. Swappable backend for tests.
    pub gateway: ModelGateway,
}
