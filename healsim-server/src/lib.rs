/// Health endpoint for the Healing Simulator
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{Json, Response};
use axum::routing::get;
use axum::Router;
use serde::Serialize;

pub const DEFAULT_MESSAGE: &str = "Healing Simulator API ready 🌙";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Health {
    pub message: String,
}

/// Build the router: `GET /` answers with the readiness message
pub fn app(message: impl Into<String>) -> Router {
    let health = Arc::new(Health {
        message: message.into(),
    });
    Router::new()
        .route("/", get(health_check))
        .with_state(health)
        .layer(middleware::from_fn(log_request))
}

async fn health_check(State(health): State<Arc<Health>>) -> Json<Health> {
    Json(Health::clone(&health))
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    log::info!(
        "{method} {path} -> {} in {:.2?}",
        response.status().as_u16(),
        started.elapsed()
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    async fn call(method: Method, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app(DEFAULT_MESSAGE).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_health_returns_ready_message() {
        let (status, body) = call(Method::GET, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            String::from_utf8(body).unwrap(),
            r#"{"message":"Healing Simulator API ready 🌙"}"#
        );
    }

    #[tokio::test]
    async fn test_health_is_stable_across_calls() {
        let first = call(Method::GET, "/").await;
        for _ in 0..3 {
            assert_eq!(call(Method::GET, "/").await, first);
        }
    }

    #[tokio::test]
    async fn test_other_routes_and_methods_are_rejected() {
        assert_eq!(call(Method::GET, "/scenes").await.0, StatusCode::NOT_FOUND);
        assert_eq!(call(Method::POST, "/").await.0, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_custom_message() {
        let request = axum::http::Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app("resting").oneshot(request).await.unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, serde_json::json!({ "message": "resting" }));
    }
}
