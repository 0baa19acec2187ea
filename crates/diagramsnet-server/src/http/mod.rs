//! HTTP server for diagram conversion.
//!
//! Provides endpoints for:
//! - SVG conversion (`POST /svg`)
//! - PNG conversion (`POST /png`)
//! - Health check (`/health`)

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod handlers;
pub mod responses;

/// Largest accepted diagram source.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/svg", post(handlers::convert_svg))
        .route("/png", post(handlers::convert_png))
        .route("/health", get(handlers::health_check))
        .fallback(handlers::unknown_endpoint)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use diagramsnet_browser::testing::{RenderBehavior, ScriptedBrowser, DIAGRAM_SVG, PNG_SIGNATURE};
    use diagramsnet_worker::{Worker, WorkerConfig};
    use reqwest::StatusCode;
    use tokio::net::TcpListener;

    use crate::http::responses::ErrorResponse;

    const DIAGRAM: &str = r#"<mxfile><diagram id="a"><mxGraphModel><root><mxCell id="0"/></root></mxGraphModel></diagram></mxfile>"#;

    async fn serve(browser: &ScriptedBrowser, timeout: Duration) -> String {
        let config = WorkerConfig::default()
            .with_browser_endpoint("ws://chrome:9222/devtools/browser/test")
            .with_convert_timeout(timeout);
        let worker = Worker::new(config, Arc::new(browser.clone()));
        let router = create_router(AppState::new(worker));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn serve_default(browser: &ScriptedBrowser) -> String {
        serve(browser, Duration::from_secs(15)).await
    }

    #[tokio::test]
    async fn test_health() {
        let base = serve_default(&ScriptedBrowser::new()).await;

        let response = reqwest::get(format!("{}/health", base)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_convert_svg() {
        let base = serve_default(&ScriptedBrowser::new()).await;

        let response = reqwest::Client::new()
            .post(format!("{}/svg", base))
            .body(DIAGRAM)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "image/svg+xml");
        assert_eq!(response.text().await.unwrap(), DIAGRAM_SVG);
    }

    #[tokio::test]
    async fn test_convert_png() {
        let base = serve_default(&ScriptedBrowser::new()).await;

        let response = reqwest::Client::new()
            .post(format!("{}/png", base))
            .body(DIAGRAM)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "image/png");
        let bytes = response.bytes().await.unwrap();
        assert!(bytes.starts_with(&PNG_SIGNATURE));
    }

    #[tokio::test]
    async fn test_syntax_error_is_bad_request() {
        let browser = ScriptedBrowser::new();
        let recorder = browser.recorder();
        let base = serve_default(&browser).await;

        let response = reqwest::Client::new()
            .post(format!("{}/svg", base))
            .body("digraph { a -> b }")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json().await.unwrap();
        assert_eq!(body.error, "Syntax error in graph");
        assert_eq!(body.message, "Not a diagram file");
        assert_eq!(recorder.pages_closed(), 1);
        assert_eq!(recorder.disconnects(), 1);
    }

    #[tokio::test]
    async fn test_empty_body_is_rejected_without_browser() {
        let browser = ScriptedBrowser::new();
        let recorder = browser.recorder();
        let base = serve_default(&browser).await;

        let response = reqwest::Client::new()
            .post(format!("{}/svg", base))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json().await.unwrap();
        assert_eq!(body.message, "Body must not be empty.");
        assert_eq!(recorder.connects(), 0);
    }

    #[tokio::test]
    async fn test_timeout_is_request_timeout() {
        let browser = ScriptedBrowser::new().with_render(RenderBehavior::Hang);
        let recorder = browser.recorder();
        let base = serve(&browser, Duration::from_millis(100)).await;

        let response = reqwest::Client::new()
            .post(format!("{}/svg", base))
            .body(DIAGRAM)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        let body: ErrorResponse = response.json().await.unwrap();
        assert_eq!(body.error, "Timeout error");
        assert_eq!(body.message, "Timeout error: convert took more than 100ms");
        assert_eq!(recorder.pages_closed(), 1);
    }

    #[tokio::test]
    async fn test_infrastructure_error_is_server_error() {
        let base = serve_default(&ScriptedBrowser::new().fail_connect()).await;

        let response = reqwest::Client::new()
            .post(format!("{}/svg", base))
            .body(DIAGRAM)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = response.json().await.unwrap();
        assert_eq!(body.error, "Unable to convert the diagram");
        assert!(body.message.contains("ws://chrome:9222/devtools/browser/test"));
    }

    #[tokio::test]
    async fn test_unsafe_query_enables_image_inlining() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"><image xlink:href="images/missing.png"/></svg>"#;
        let browser = ScriptedBrowser::new().with_render(RenderBehavior::Svg(svg.to_string()));
        let base = serve_default(&browser).await;
        let client = reqwest::Client::new();

        let safe = client
            .post(format!("{}/svg", base))
            .body(DIAGRAM)
            .send()
            .await
            .unwrap();
        assert_eq!(safe.status(), StatusCode::OK);
        assert_eq!(safe.text().await.unwrap(), svg);

        // A relative reference cannot be fetched, so inlining fails.
        let unsafe_response = client
            .post(format!("{}/svg?unsafe=true", base))
            .body(DIAGRAM)
            .send()
            .await
            .unwrap();
        assert_eq!(unsafe_response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = unsafe_response.json().await.unwrap();
        assert!(body.message.contains("images/missing.png"));
    }

    #[tokio::test]
    async fn test_unknown_endpoint() {
        let base = serve_default(&ScriptedBrowser::new()).await;

        let response = reqwest::Client::new()
            .post(format!("{}/pdf", base))
            .body(DIAGRAM)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json().await.unwrap();
        assert_eq!(body.message, "Available endpoints are /svg and /png");
    }
}
