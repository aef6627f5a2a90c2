use std::sync::Arc;

use crate::config::Config;
use crate::pipeline_client::PipelineApi;
use crate::sessions::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Recruitment service client. `HttpPipelineClient` in production.
    pub api: Arc<dyn PipelineApi>,
    pub sessions: Arc<SessionStore>,
    pub config: Config,
}
