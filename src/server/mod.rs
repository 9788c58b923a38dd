//! HTTP API over the extraction pipeline.
//!
//! Routes:
//! - `POST /upload`                 store a PDF in the input directory and extract its metadata
//! - `GET  /metadata/:filename`     metadata record (also stored)
//! - `GET  /extract/:filename`      `{"Page N": text}` selectable text of every page
//! - `GET  /ocr/:filename`          `{"Page N": text}` OCR text of every page
//!
//! Every request builds its own [`Orchestrator`] inside `spawn_blocking`:
//! pdfium is neither `Send` nor async-safe, so nothing pdfium-related is
//! shared between requests or held across an `.await`.

mod handlers;
mod routes;

pub use routes::create_router;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::orchestrator::Orchestrator;
use std::net::SocketAddr;
use std::sync::Arc;

/// Builds a fresh orchestrator for one request.
pub type OrchestratorFactory =
    Arc<dyn Fn() -> Result<Orchestrator, PipelineError> + Send + Sync>;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub config: PipelineConfig,
    pub factory: OrchestratorFactory,
}

impl AppState {
    /// Production state: every request binds pdfium and opens the store anew.
    /// The OCR engine is checked once here, not per request.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.ensure_directories()?;
        Orchestrator::check_ocr_engine(&config);
        let factory_config = config.clone();
        Ok(Self {
            config,
            factory: Arc::new(move || Orchestrator::from_config(factory_config.clone())),
        })
    }

    /// State with a caller-supplied orchestrator factory.
    pub fn with_factory(config: PipelineConfig, factory: OrchestratorFactory) -> Self {
        Self { config, factory }
    }

    /// Run `work` against a fresh orchestrator on the blocking thread pool.
    pub(crate) async fn run_blocking<T, F>(&self, work: F) -> Result<T, PipelineError>
    where
        T: Send + 'static,
        F: FnOnce(&Orchestrator) -> Result<T, PipelineError> + Send + 'static,
    {
        let factory = self.factory.clone();
        tokio::task::spawn_blocking(move || {
            let orchestrator = factory()?;
            work(&orchestrator)
        })
        .await
        .map_err(|e| PipelineError::Internal(format!("extraction task failed: {e}")))?
    }
}

/// Start the web server.
pub async fn serve(config: PipelineConfig, host: &str, port: u16) -> Result<(), PipelineError> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| PipelineError::InvalidConfig(format!("bad listen address {host}:{port}: {e}")))?;

    let state = AppState::new(config)?;
    let app = create_router(state);

    let failed = |source| PipelineError::ServerFailed {
        addr: addr.to_string(),
        source,
    };
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(failed)?;
    tracing::info!("Starting server at http://{}", addr);
    axum::serve(listener, app).await.map_err(failed)?;

    Ok(())
}
