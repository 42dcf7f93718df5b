// Pagination & auto-fit engine.
// Measurement surface → paginator → auto-fit controller, tied together by the pipeline.
// Measurement is the only suspension point; everything else here is pure.

pub mod autofit;
pub mod font_metrics;
pub mod measure;
pub mod numbering;
pub mod paginator;
pub mod pipeline;

use thiserror::Error;

pub use autofit::{run_auto_fit, AutoFitNotice, AutoFitOutcome};
pub use measure::MetricsSurface;
pub use pipeline::{LayoutPipeline, PaginatedLayout};

/// Failure of a whole measurement pass. Per-block failures are not errors:
/// they come back as `None` heights.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("measurement surface unavailable: {0}")]
    SurfaceUnavailable(String),

    #[error("measurement worker failed: {0}")]
    Worker(String),

    #[error("measurement returned {got} heights for {expected} blocks")]
    HeightCountMismatch { expected: usize, got: usize },
}
