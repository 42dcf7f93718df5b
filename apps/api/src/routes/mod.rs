pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::documents::handlers;
use crate::generation::handlers::handle_generate;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Documents API
        .route("/api/v1/documents", post(handlers::handle_create_document))
        .route("/api/v1/documents/generate", post(handle_generate))
        .route(
            "/api/v1/documents/:id",
            get(handlers::handle_get_document).delete(handlers::handle_delete_document),
        )
        .route(
            "/api/v1/documents/:id/formatting",
            patch(handlers::handle_update_formatting),
        )
        .route(
            "/api/v1/documents/:id/blocks/:block_id",
            patch(handlers::handle_edit_block),
        )
        .route(
            "/api/v1/documents/:id/blocks/:block_id/page-break",
            post(handlers::handle_toggle_page_break),
        )
        .route(
            "/api/v1/documents/:id/blocks/:block_id/apply-style",
            post(handlers::handle_apply_style),
        )
        .route(
            "/api/v1/documents/:id/images",
            post(handlers::handle_insert_image),
        )
        // Auto-fit
        .route(
            "/api/v1/documents/:id/auto-fit",
            post(handlers::handle_auto_fit),
        )
        .route(
            "/api/v1/documents/:id/auto-fit/revert",
            post(handlers::handle_revert_auto_fit),
        )
        .route(
            "/api/v1/documents/:id/auto-fit/dismiss",
            post(handlers::handle_dismiss_auto_fit),
        )
        // Export
        .route(
            "/api/v1/documents/:id/export",
            get(handlers::handle_export),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use async_trait::async_trait;

    use super::*;
    use crate::config::Config;
    use crate::documents::SessionStore;
    use crate::generation::generator::testing::CannedWriter;
    use crate::generation::generator::ReportWriter;
    use crate::layout::measure::testing::FnSurface;
    use crate::layout::measure::{MeasureItem, MeasurementSurface};
    use crate::layout::{LayoutError, LayoutPipeline};
    use crate::models::FormattingModel;

    /// 4×2 black PNG.
    const TINY_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAQAAAACCAIAAADwyuo0AAAAC0lEQVR42mNgwAUAABoAAS+Yl6YAAAAASUVORK5CYII=";

    struct OfflineSurface;

    #[async_trait]
    impl MeasurementSurface for OfflineSurface {
        async fn measure(
            &self,
            _items: &[MeasureItem],
            _formatting: &FormattingModel,
            _width_px: f32,
        ) -> Result<Vec<Option<f32>>, LayoutError> {
            Err(LayoutError::SurfaceUnavailable("offline".to_string()))
        }
    }

    fn test_state(block_px: f32, writer: Option<Arc<dyn ReportWriter>>) -> AppState {
        state_with_surface(Arc::new(FnSurface::fixed(block_px)), writer)
    }

    /// Blocks measure 20× their own font size: four 12px paragraphs need two
    /// pages and fit on one at 10px.
    fn proportional_state() -> AppState {
        state_with_surface(
            Arc::new(FnSurface::new(|item, _| {
                Some(item.block.style.font_size.to_px() * 20.0)
            })),
            None,
        )
    }

    fn state_with_surface(
        surface: Arc<dyn MeasurementSurface>,
        writer: Option<Arc<dyn ReportWriter>>,
    ) -> AppState {
        AppState {
            config: Config {
                anthropic_api_key: None,
                port: 0,
                rust_log: "info".to_string(),
                layout_debounce: Duration::from_millis(5),
                measure_settle: Duration::ZERO,
                session_idle_ttl: Duration::from_secs(3600),
            },
            writer,
            pipeline: LayoutPipeline::new(surface),
            sessions: SessionStore::new(Duration::from_millis(5)),
        }
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => request
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn paragraphs(n: usize) -> Value {
        let blocks: Vec<Value> = (0..n)
            .map(|i| json!({"type": "paragraph", "text": format!("Paragraph {i}")}))
            .collect();
        json!({ "blocks": blocks })
    }

    #[tokio::test]
    async fn test_health_reports_open_documents() {
        let app = build_router(test_state(100.0, None));
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "reportfit");
        assert_eq!(body["documents"], 0);
        assert_eq!(body["generation"], false);
    }

    #[tokio::test]
    async fn test_create_and_get_document() {
        // 1in margins → 864px budget; two 300px blocks per page.
        let app = build_router(test_state(300.0, None));
        let (status, body) = send(&app, Method::POST, "/api/v1/documents", Some(paragraphs(5))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["document"]["pageCount"], 3);
        assert_eq!(body["document"]["version"], 1);
        assert!(body.get("autoFit").is_none());

        let id = body["document"]["id"].as_str().unwrap().to_string();
        let (status, body) = send(&app, Method::GET, &format!("/api/v1/documents/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let pages = body["document"]["pages"].as_array().unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0]["blocks"].as_array().unwrap().len(), 2);
        assert_eq!(pages[2]["blocks"][0]["text"], "Paragraph 4");
    }

    #[tokio::test]
    async fn test_create_rejects_images() {
        let app = build_router(test_state(100.0, None));
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/documents",
            Some(json!({"blocks": [{"type": "image", "text": "data:image/png;base64,AAAA"}]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_empty_document_has_zero_pages_and_no_notice() {
        let app = build_router(test_state(100.0, None));
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/documents",
            Some(json!({"blocks": [], "targetPages": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["document"]["pageCount"], 0);
        assert_eq!(body["document"]["pages"], json!([]));
        assert_eq!(body["document"]["notice"], Value::Null);
        assert_eq!(body["autoFit"]["converged"], true);
        assert_eq!(body["autoFit"]["steps"], 0);

        let id = body["document"]["id"].as_str().unwrap().to_string();
        let (status, body) = send(&app, Method::GET, &format!("/api/v1/documents/{id}/export"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pages"], json!([]));
    }

    #[tokio::test]
    async fn test_delete_document() {
        let app = build_router(test_state(100.0, None));
        let (_, body) = send(&app, Method::POST, "/api/v1/documents", Some(paragraphs(1))).await;
        let uri = format!("/api/v1/documents/{}", body["document"]["id"].as_str().unwrap());

        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_failed_open_leaves_no_document_behind() {
        let app = build_router(state_with_surface(Arc::new(OfflineSurface), None));
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/documents",
            Some(json!({"blocks": [{"type": "paragraph", "text": "x"}], "targetPages": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (_, health) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(health["documents"], 0);
    }

    #[tokio::test]
    async fn test_auto_fit_shrinks_then_reverts() {
        let app = build_router(proportional_state());
        let (_, body) = send(&app, Method::POST, "/api/v1/documents", Some(paragraphs(4))).await;
        assert_eq!(body["document"]["pageCount"], 2);
        let id = body["document"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/documents/{id}/auto-fit"),
            Some(json!({"targetPages": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["autoFit"]["converged"], true);
        assert_eq!(body["autoFit"]["steps"], 2);
        assert_eq!(body["autoFit"]["finalFontPx"], json!(10.0));
        assert_eq!(body["document"]["pageCount"], 1);
        assert_eq!(body["document"]["notice"]["kind"], "applied");
        assert_eq!(body["document"]["canRevert"], true);

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/documents/{id}/auto-fit/revert"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["document"]["pageCount"], 2);
        assert_eq!(body["document"]["notice"], Value::Null);
        assert_eq!(body["document"]["canRevert"], false);
    }

    #[tokio::test]
    async fn test_auto_fit_shrinks_then_dismisses() {
        let app = build_router(proportional_state());
        let (_, body) = send(&app, Method::POST, "/api/v1/documents", Some(paragraphs(4))).await;
        let id = body["document"]["id"].as_str().unwrap().to_string();

        send(
            &app,
            Method::POST,
            &format!("/api/v1/documents/{id}/auto-fit"),
            Some(json!({"targetPages": 1})),
        )
        .await;
        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/v1/documents/{id}/auto-fit/dismiss"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(&app, Method::GET, &format!("/api/v1/documents/{id}"), None).await;
        assert_eq!(body["document"]["pageCount"], 1);
        assert_eq!(body["document"]["notice"], Value::Null);
        assert_eq!(body["document"]["canRevert"], false);
    }

    #[tokio::test]
    async fn test_formatting_patch_changes_geometry_and_rejects_absurd_sizes() {
        let app = build_router(test_state(100.0, None));
        let (_, body) = send(&app, Method::POST, "/api/v1/documents", Some(paragraphs(2))).await;
        let id = body["document"]["id"].as_str().unwrap().to_string();
        let uri = format!("/api/v1/documents/{id}/formatting");

        let (status, body) = send(&app, Method::PATCH, &uri, Some(json!({"margin": "0.5in"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], 2);

        let (_, body) = send(&app, Method::GET, &format!("/api/v1/documents/{id}"), None).await;
        assert_eq!(body["document"]["contentWidthPx"], json!(720.0));
        assert_eq!(body["document"]["pageBudgetPx"], json!(960.0));

        let (status, _) = send(
            &app,
            Method::PATCH,
            &uri,
            Some(json!({"fontSize": "10000000000000px"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_apply_style_restyles_same_type() {
        let app = build_router(test_state(100.0, None));
        let (_, body) = send(&app, Method::POST, "/api/v1/documents", Some(paragraphs(3))).await;
        let id = body["document"]["id"].as_str().unwrap().to_string();
        let block_id = body["document"]["pages"][0]["blocks"][0]["id"]
            .as_str()
            .unwrap()
            .to_string();

        send(
            &app,
            Method::PATCH,
            &format!("/api/v1/documents/{id}/blocks/{block_id}"),
            Some(json!({"style": {"bold": true}})),
        )
        .await;
        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/documents/{id}/blocks/{block_id}/apply-style"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated"], 3);

        let (_, body) = send(&app, Method::GET, &format!("/api/v1/documents/{id}"), None).await;
        let blocks = body["document"]["pages"][0]["blocks"].as_array().unwrap();
        assert!(blocks.iter().all(|b| b["style"]["bold"] == true));
    }

    #[tokio::test]
    async fn test_insert_image_after_block() {
        let app = build_router(test_state(100.0, None));
        let (_, body) = send(&app, Method::POST, "/api/v1/documents", Some(paragraphs(2))).await;
        let id = body["document"]["id"].as_str().unwrap().to_string();
        let first_id = body["document"]["pages"][0]["blocks"][0]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/documents/{id}/images"),
            Some(json!({"src": TINY_PNG, "afterBlockId": first_id})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let image_id = body["blockId"].as_str().unwrap().to_string();

        let (_, body) = send(&app, Method::GET, &format!("/api/v1/documents/{id}"), None).await;
        let blocks = body["document"]["pages"][0]["blocks"].as_array().unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[1]["id"], image_id.as_str());
        assert_eq!(blocks[1]["type"], "image");
    }

    #[tokio::test]
    async fn test_unknown_document_is_not_found() {
        let app = build_router(test_state(100.0, None));
        let uri = format!("/api/v1/documents/{}", uuid::Uuid::new_v4());
        let (status, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_edit_block_bumps_version_and_shows_in_view() {
        let app = build_router(test_state(100.0, None));
        let (_, body) = send(&app, Method::POST, "/api/v1/documents", Some(paragraphs(2))).await;
        let id = body["document"]["id"].as_str().unwrap().to_string();
        let block_id = body["document"]["pages"][0]["blocks"][1]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let (status, body) = send(
            &app,
            Method::PATCH,
            &format!("/api/v1/documents/{id}/blocks/{block_id}"),
            Some(json!({"text": "Rewritten"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], 2);

        let (_, body) = send(&app, Method::GET, &format!("/api/v1/documents/{id}"), None).await;
        assert_eq!(body["document"]["version"], 2);
        assert_eq!(body["document"]["pages"][0]["blocks"][1]["text"], "Rewritten");
    }

    #[tokio::test]
    async fn test_page_break_splits_pages() {
        let app = build_router(test_state(100.0, None));
        let (_, body) = send(&app, Method::POST, "/api/v1/documents", Some(paragraphs(3))).await;
        assert_eq!(body["document"]["pageCount"], 1);
        let id = body["document"]["id"].as_str().unwrap().to_string();
        let block_id = body["document"]["pages"][0]["blocks"][2]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/documents/{id}/blocks/{block_id}/page-break"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pageBreakBefore"], true);

        let (_, body) = send(&app, Method::GET, &format!("/api/v1/documents/{id}"), None).await;
        assert_eq!(body["document"]["pageCount"], 2);
    }

    #[tokio::test]
    async fn test_auto_fit_rejects_zero_target() {
        let app = build_router(test_state(100.0, None));
        let (_, body) = send(&app, Method::POST, "/api/v1/documents", Some(paragraphs(1))).await;
        let id = body["document"]["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/v1/documents/{id}/auto-fit"),
            Some(json!({"targetPages": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_auto_fit_already_within_target() {
        let app = build_router(test_state(100.0, None));
        let (_, body) = send(&app, Method::POST, "/api/v1/documents", Some(paragraphs(3))).await;
        let id = body["document"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/v1/documents/{id}/auto-fit"),
            Some(json!({"targetPages": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["autoFit"]["converged"], true);
        assert_eq!(body["autoFit"]["steps"], 0);
        assert_eq!(body["document"]["canRevert"], false);

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/v1/documents/{id}/auto-fit/revert"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/v1/documents/{id}/auto-fit/dismiss"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_export_marks_page_starts() {
        let app = build_router(test_state(300.0, None));
        let (_, body) = send(&app, Method::POST, "/api/v1/documents", Some(paragraphs(3))).await;
        let id = body["document"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(&app, Method::GET, &format!("/api/v1/documents/{id}/export"), None).await;
        assert_eq!(status, StatusCode::OK);
        let pages = body["pages"].as_array().unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1]["blocks"][0]["pageBreakBefore"], true);
        assert_eq!(body["pageSetup"]["widthTwips"], 12240);
    }

    #[tokio::test]
    async fn test_generate_without_writer_is_unprocessable() {
        let app = build_router(test_state(100.0, None));
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/documents/generate",
            Some(json!({"topic": "Tidal energy", "pages": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("ANTHROPIC_API_KEY"));
    }

    #[tokio::test]
    async fn test_generate_builds_fitted_document() {
        let writer = Arc::new(CannedWriter::new(&[r#"{"report": [
            {"type": "heading1", "text": "Tidal Energy"},
            {"type": "paragraph", "text": "Tides are predictable."},
            {"type": "bullet", "text": "Low visual impact"}
        ]}"#]));
        let app = build_router(test_state(100.0, Some(writer.clone())));

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/documents/generate",
            Some(json!({"topic": "Tidal energy", "pages": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["document"]["pageCount"], 1);
        assert_eq!(body["autoFit"]["targetPages"], 1);
        assert_eq!(body["autoFit"]["converged"], true);
        assert_eq!(writer.calls(), 1);

        let (_, health) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(health["documents"], 1);
    }

    #[tokio::test]
    async fn test_generate_validates_pages() {
        let writer = Arc::new(CannedWriter::new(&[r#"{"report": []}"#]));
        let app = build_router(test_state(100.0, Some(writer.clone())));

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/documents/generate",
            Some(json!({"topic": "Tidal energy", "pages": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(writer.calls(), 0);
    }
}
