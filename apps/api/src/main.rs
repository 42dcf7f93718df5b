mod config;
mod documents;
mod errors;
mod export;
mod generation;
mod layout;
mod llm_client;
mod models;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::documents::SessionStore;
use crate::generation::generator::ReportWriter;
use crate::layout::{LayoutPipeline, MetricsSurface};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ReportFit API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client (optional: documents can still be created from supplied content)
    let writer: Option<Arc<dyn ReportWriter>> = match &config.anthropic_api_key {
        Some(key) => {
            let llm = LlmClient::new(key.clone())?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Some(Arc::new(llm))
        }
        None => {
            warn!("ANTHROPIC_API_KEY not set; report generation is disabled");
            None
        }
    };

    // Initialize layout pipeline (metrics-based measurement surface)
    let pipeline = LayoutPipeline::new(Arc::new(MetricsSurface::new(config.measure_settle)));
    info!(
        "Layout pipeline initialized (settle: {}ms, relayout debounce: {}ms)",
        config.measure_settle.as_millis(),
        config.layout_debounce.as_millis()
    );

    // Initialize document sessions (in memory, idle ones evicted in the background)
    let sessions = SessionStore::new(config.layout_debounce);
    sessions.spawn_idle_sweep(config.session_idle_ttl);
    info!(
        "Session store initialized (idle TTL: {}s)",
        config.session_idle_ttl.as_secs()
    );

    // Build app state
    let state = AppState {
        writer,
        pipeline,
        sessions,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS once the editor origin is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
