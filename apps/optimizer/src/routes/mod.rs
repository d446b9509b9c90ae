pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::optimize::handlers::handle_optimize;
use crate::pdf::{handlers::handle_parse_pdf, MAX_PDF_BYTES};
use crate::state::AppState;

/// Builds the router.
///
/// Request deadlines live in the handlers, sized per request (chunk budget for
/// optimize, upload size for parse-pdf), so an expired one still answers with
/// the JSON error body.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/optimize", post(handle_optimize))
        .route(
            "/api/v1/parse-pdf",
            post(handle_parse_pdf).layer(DefaultBodyLimit::max(MAX_PDF_BYTES)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::llm_client::LlmError;
    use crate::optimize::rewriter::{CvRewriter, RewriteRequest};

    struct UppercaseRewriter;

    #[async_trait]
    impl CvRewriter for UppercaseRewriter {
        async fn rewrite(&self, request: RewriteRequest<'_>) -> Result<String, LlmError> {
            Ok(request.chunk.to_uppercase())
        }
    }

    /// Takes 90s per chunk, inside the 93.3s a short chunk is budgeted for
    /// all of its attempts. Chunks mentioning `stall` never finish.
    struct SlowRewriter;

    #[async_trait]
    impl CvRewriter for SlowRewriter {
        async fn rewrite(&self, request: RewriteRequest<'_>) -> Result<String, LlmError> {
            if request.chunk.contains("stall") {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(Duration::from_secs(90)).await;
            Ok(request.chunk.to_uppercase())
        }
    }

    fn app_with(rewriter: Arc<dyn CvRewriter>, env: &[(&str, &str)]) -> Router {
        let config = Config::from_lookup(|key| match key {
            "GROQ_API_KEY" => Some("gsk_test".to_string()),
            "INTER_CHUNK_DELAY_MS" => Some("0".to_string()),
            _ => env
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string()),
        })
        .unwrap();
        build_router(AppState { config, rewriter })
    }

    fn app() -> Router {
        app_with(Arc::new(UppercaseRewriter), &[])
    }

    fn paragraphs(tags: &[&str]) -> String {
        tags.iter()
            .map(|tag| format!("{tag} courier route {}", "x".repeat(60)))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_optimize_returns_rewritten_cv_and_stats() {
        let cv = format!("Jan Kowalski\n\nKurier w UPS {}", "dostarczanie paczek ".repeat(10));
        let response = app()
            .oneshot(post_json(
                "/api/v1/optimize",
                json!({ "cv_text": cv, "language": "pl" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["optimized_cv"], cv.trim().to_uppercase());
        assert_eq!(body["stats"]["chunks"], 1);
        assert_eq!(body["stats"]["failed_chunks"], 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_multi_chunk_cv_completes_within_its_budget() {
        let cv = paragraphs(&["one", "two", "three", "four"]);
        let response = app_with(Arc::new(SlowRewriter), &[("MAX_CHUNK_CHARS", "100")])
            .oneshot(post_json("/api/v1/optimize", json!({ "cv_text": cv })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["optimized_cv"], cv.to_uppercase());
        assert_eq!(body["stats"]["chunks"], 4);
        assert_eq!(body["stats"]["failed_chunks"], 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_chunk_falls_back_instead_of_failing_request() {
        let cv = paragraphs(&["one", "stall", "three", "four"]);
        let response = app_with(Arc::new(SlowRewriter), &[("MAX_CHUNK_CHARS", "100")])
            .oneshot(post_json("/api/v1/optimize", json!({ "cv_text": cv })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["stats"]["chunks"], 4);
        assert_eq!(body["stats"]["failed_chunks"], 1);
        let parts: Vec<String> = body["optimized_cv"]
            .as_str()
            .unwrap()
            .split("\n\n")
            .map(str::to_string)
            .collect();
        assert!(parts[1].starts_with("stall courier route"));
        assert!(parts[3].starts_with("FOUR COURIER ROUTE"));
    }

    #[tokio::test]
    async fn test_optimize_rejects_blank_cv() {
        let response = app()
            .oneshot(post_json("/api/v1/optimize", json!({ "cv_text": "   " })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_parse_pdf_requires_file_field() {
        let body = "--BOUNDARY\r\n\
            Content-Disposition: form-data; name=\"note\"\r\n\r\n\
            hello\r\n\
            --BOUNDARY--\r\n";
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/parse-pdf")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=BOUNDARY")
            .body(Body::from(body))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
    }
}
