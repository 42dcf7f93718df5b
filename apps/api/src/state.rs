use std::sync::Arc;

use crate::config::Config;
use crate::documents::SessionStore;
use crate::generation::generator::ReportWriter;
use crate::layout::LayoutPipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Content source for generated reports. `None` when no API key is configured.
    pub writer: Option<Arc<dyn ReportWriter>>,
    /// Measurement surface + paginator. Default: MetricsSurface.
    pub pipeline: LayoutPipeline,
    pub sessions: SessionStore,
}
