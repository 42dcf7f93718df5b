//! Session operations that need a measurement pass.
//!
//! The session lock is never held across a measurement: each operation takes
//! a versioned snapshot, measures without the lock, then re-locks and applies
//! the result only if the version still matches.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::documents::session::{AutoFitReport, DocumentSession};
use crate::documents::store::SessionHandle;
use crate::errors::AppError;
use crate::layout::{run_auto_fit, LayoutPipeline, PaginatedLayout};

/// Attempts before a read gives up on a document that keeps changing under it.
const MAX_LAYOUT_ATTEMPTS: usize = 3;

/// Runs `read` against the session and a layout that is current for it,
/// computing and caching a fresh layout first if needed.
pub async fn with_layout<T>(
    handle: &SessionHandle,
    pipeline: &LayoutPipeline,
    read: impl FnOnce(&DocumentSession, &PaginatedLayout) -> T,
) -> Result<T, AppError> {
    for attempt in 1..=MAX_LAYOUT_ATTEMPTS {
        let (version, blocks, formatting) = {
            let session = handle.lock().await;
            if let Some(layout) = session.current_layout() {
                return Ok(read(&session, layout));
            }
            (
                session.version,
                session.blocks.clone(),
                session.formatting.clone(),
            )
        };

        debug!(document_id = %handle.id, version, attempt, "Computing layout");
        let layout = pipeline.layout(&blocks, &formatting).await?;

        let mut session = handle.lock().await;
        if session.store_layout(version, layout) {
            if let Some(layout) = session.current_layout() {
                return Ok(read(&session, layout));
            }
        }
    }

    Err(AppError::Conflict(format!(
        "document {} kept changing while it was being laid out",
        handle.id
    )))
}

/// Debounced background relayout after an edit, so the next read finds a warm cache.
pub fn schedule_relayout(handle: Arc<SessionHandle>, pipeline: LayoutPipeline) {
    let task_handle = handle.clone();
    handle.relayout().trigger(async move {
        if let Err(e) = with_layout(&task_handle, &pipeline, |_, _| ()).await {
            warn!(document_id = %task_handle.id, "Background relayout failed: {e}");
        }
    });
}

/// Shrinks the document until it fits `target_pages`, or the font floor is reached.
pub async fn auto_fit(
    handle: &SessionHandle,
    pipeline: &LayoutPipeline,
    target_pages: usize,
) -> Result<AutoFitReport, AppError> {
    if target_pages == 0 {
        return Err(AppError::Validation(
            "targetPages must be at least 1".to_string(),
        ));
    }

    let ticket = handle.lock().await.begin_auto_fit();
    let outcome = run_auto_fit(
        pipeline,
        ticket.blocks.clone(),
        ticket.formatting.clone(),
        target_pages,
    )
    .await?;

    let mut session = handle.lock().await;
    let report = session.finish_auto_fit(ticket, outcome)?;
    info!(
        document_id = %handle.id,
        target_pages,
        page_count = report.page_count,
        steps = report.steps,
        final_font_px = report.final_font_px,
        "Auto-fit applied to document"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::documents::store::SessionStore;
    use crate::generation::ingest::{ingest, InboundBlock};
    use crate::layout::measure::testing::FnSurface;
    use crate::layout::measure::{MeasureItem, MeasurementSurface};
    use crate::layout::LayoutError;
    use crate::models::{BlockType, FormattingModel, Length};

    fn paragraphs(n: usize) -> Vec<InboundBlock> {
        (0..n)
            .map(|i| InboundBlock {
                kind: BlockType::Paragraph,
                text: format!("paragraph {i}"),
            })
            .collect()
    }

    async fn store_with(n: usize) -> (SessionStore, Arc<SessionHandle>) {
        let store = SessionStore::new(Duration::from_millis(200));
        let formatting = FormattingModel::default();
        let blocks = ingest(&paragraphs(n), &formatting).unwrap();
        let handle = store.insert(DocumentSession::new(blocks, formatting)).await;
        (store, handle)
    }

    /// Blocks until released, so a test can edit the document mid-measurement.
    struct GatedSurface {
        entered: Notify,
        release: Notify,
        passes: AtomicUsize,
    }

    #[async_trait]
    impl MeasurementSurface for GatedSurface {
        async fn measure(
            &self,
            items: &[MeasureItem],
            _formatting: &FormattingModel,
            _width_px: f32,
        ) -> Result<Vec<Option<f32>>, LayoutError> {
            if self.passes.fetch_add(1, Ordering::SeqCst) == 0 {
                self.entered.notify_one();
                self.release.notified().await;
            }
            Ok(vec![Some(100.0); items.len()])
        }
    }

    #[tokio::test]
    async fn test_layout_is_cached_per_version() {
        let (_store, handle) = store_with(3).await;
        let surface = Arc::new(FnSurface::fixed(100.0));
        let pipeline = LayoutPipeline::new(surface.clone());

        let pages = with_layout(&handle, &pipeline, |_, l| l.page_count()).await.unwrap();
        assert_eq!(pages, 1);
        with_layout(&handle, &pipeline, |_, _| ()).await.unwrap();
        assert_eq!(surface.passes(), 1);

        let id = handle.lock().await.blocks[2].id.clone();
        handle.lock().await.toggle_page_break(&id).unwrap();

        let pages = with_layout(&handle, &pipeline, |_, l| l.page_count()).await.unwrap();
        assert_eq!(pages, 2);
        assert_eq!(surface.passes(), 2);
    }

    #[tokio::test]
    async fn test_stale_measurement_is_recomputed() {
        let (_store, handle) = store_with(3).await;
        let surface = Arc::new(GatedSurface {
            entered: Notify::new(),
            release: Notify::new(),
            passes: AtomicUsize::new(0),
        });
        let pipeline = LayoutPipeline::new(surface.clone());

        let reader = {
            let handle = handle.clone();
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                with_layout(&handle, &pipeline, |s, l| (s.version, l.page_count())).await
            })
        };

        surface.entered.notified().await;
        let id = handle.lock().await.blocks[1].id.clone();
        handle.lock().await.toggle_page_break(&id).unwrap();
        surface.release.notify_one();

        let (version, pages) = reader.await.unwrap().unwrap();
        assert_eq!(version, handle.lock().await.version);
        assert_eq!(pages, 2, "layout reflects the edit made mid-measurement");
        assert_eq!(surface.passes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_auto_fit_updates_session() {
        // 9× font size per block against an 864px page: 8 fit at 12px and 11px,
        // 9 fit at 10px.
        let (_store, handle) = store_with(9).await;
        let surface = Arc::new(FnSurface::new(|item, _| {
            Some(item.block.style.font_size.to_px() * 9.0)
        }));
        let pipeline = LayoutPipeline::new(surface);

        let report = auto_fit(&handle, &pipeline, 1).await.unwrap();
        assert!(report.converged);
        assert_eq!(report.page_count, 1);
        assert_eq!(report.final_font_px, 10.0);

        let session = handle.lock().await;
        assert_eq!(session.formatting.font_size, Length::px(10.0));
        assert!(session.can_revert());
        assert!(session.current_layout().is_some());
    }

    #[tokio::test]
    async fn test_auto_fit_conflicts_with_concurrent_edit() {
        let (_store, handle) = store_with(3).await;
        let surface = Arc::new(GatedSurface {
            entered: Notify::new(),
            release: Notify::new(),
            passes: AtomicUsize::new(0),
        });
        let pipeline = LayoutPipeline::new(surface.clone());

        let run = {
            let handle = handle.clone();
            let pipeline = pipeline.clone();
            tokio::spawn(async move { auto_fit(&handle, &pipeline, 1).await })
        };

        surface.entered.notified().await;
        let id = handle.lock().await.blocks[0].id.clone();
        handle.lock().await.toggle_page_break(&id).unwrap();
        surface.release.notify_one();

        assert!(matches!(run.await.unwrap(), Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_zero_target_is_rejected() {
        let (_store, handle) = store_with(1).await;
        let pipeline = LayoutPipeline::new(Arc::new(FnSurface::fixed(10.0)));
        assert!(matches!(
            auto_fit(&handle, &pipeline, 0).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_edits_triggers_one_relayout() {
        let (_store, handle) = store_with(4).await;
        let surface = Arc::new(FnSurface::fixed(100.0));
        let pipeline = LayoutPipeline::new(surface.clone());

        let id = handle.lock().await.blocks[1].id.clone();
        for _ in 0..5 {
            handle.lock().await.toggle_page_break(&id).unwrap();
            schedule_relayout(handle.clone(), pipeline.clone());
            tokio::time::advance(Duration::from_millis(20)).await;
        }

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(surface.passes(), 1);
        assert!(handle.lock().await.current_layout().is_some());
    }
}
