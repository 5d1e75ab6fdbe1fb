//! HTTP surface of the load balancer: registration plus pass-through.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::lb::{LoadBalancer, RegisterError};

/// Upper bound on a buffered request body.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Base URL of the backend to register.
    pub url: String,
}

#[derive(Debug, Serialize)]
struct RegisterResponse {
    status: String,
    url: String,
}

/// Build the load balancer router: the registration endpoint plus a
/// fallback that proxies everything else.
pub fn build_router(lb: Arc<LoadBalancer>) -> Router {
    Router::new()
        .route("/register", post(register))
        .fallback(proxy)
        .with_state(lb)
}

async fn register(
    State(lb): State<Arc<LoadBalancer>>,
    Json(request): Json<RegisterRequest>,
) -> Response {
    match lb.register(&request.url) {
        Ok(()) => (
            StatusCode::CREATED,
            Json(RegisterResponse {
                status: "Server registered successfully".to_string(),
                url: request.url,
            }),
        )
            .into_response(),
        Err(error @ RegisterError::Duplicate(_)) => {
            (StatusCode::CONFLICT, error.to_string()).into_response()
        }
        Err(error) => (StatusCode::BAD_REQUEST, error.to_string()).into_response(),
    }
}

async fn proxy(State(lb): State<Arc<LoadBalancer>>, request: Request) -> Response {
    let Some(backend) = lb.next_backend() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "no healthy backends available",
        )
            .into_response();
    };

    tracing::debug!(url = %backend.url(), path = %request.uri().path(), "proxying request");

    match forward(lb.proxy_client(), &backend, request).await {
        Ok(response) => response,
        Err(error) => {
            tracing::error!(url = %backend.url(), error = %error, "proxy error");
            (StatusCode::BAD_GATEWAY, "upstream request failed").into_response()
        }
    }
}

async fn forward(
    client: &reqwest::Client,
    backend: &Backend,
    request: Request,
) -> Result<Response, Box<dyn std::error::Error + Send + Sync>> {
    let path_and_query = request
        .uri()
        .path_and_query()
        .map_or("/", |pq| pq.as_str());
    let target = backend.url().join(path_and_query)?;

    let (parts, body) = request.into_parts();
    let bytes: Bytes = axum::body::to_bytes(body, MAX_BODY_BYTES).await?;

    let mut headers = parts.headers;
    // The upstream sets its own host.
    headers.remove(header::HOST);

    let upstream = client
        .request(parts.method, target)
        .headers(headers)
        .body(bytes)
        .send()
        .await?;

    let mut builder = Response::builder().status(upstream.status());
    if let Some(response_headers) = builder.headers_mut() {
        response_headers.extend(upstream.headers().clone());
    }
    let body = upstream.bytes().await?;

    Ok(builder.body(Body::from(body))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use std::time::Duration;
    use tokio::sync::watch;

    async fn spawn_echo_backend() -> String {
        let app = Router::new()
            .route("/readyz", get(|| async { StatusCode::OK }))
            .route("/hello", get(|| async { "hello from upstream" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn spawn_lb() -> (Arc<LoadBalancer>, String) {
        let (tx, rx) = watch::channel(false);
        // Long interval: probes stay quiet during the test.
        let lb = LoadBalancer::new(Duration::from_secs(3600), rx);
        let app = build_router(lb.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _tx = tx;
            axum::serve(listener, app).await.unwrap();
        });
        (lb, format!("http://{addr}"))
    }

    #[tokio::test]
    async fn register_returns_created_with_the_url() {
        let (_lb, lb_url) = spawn_lb().await;
        let backend = spawn_echo_backend().await;

        let client = reqwest::Client::new();
        let response = client
            .post(format!("{lb_url}/register"))
            .json(&serde_json::json!({ "url": backend }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["url"], serde_json::json!(backend));
    }

    #[tokio::test]
    async fn duplicate_registration_returns_conflict() {
        let (_lb, lb_url) = spawn_lb().await;
        let backend = spawn_echo_backend().await;

        let client = reqwest::Client::new();
        for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
            let response = client
                .post(format!("{lb_url}/register"))
                .json(&serde_json::json!({ "url": backend }))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), expected);
        }
    }

    #[tokio::test]
    async fn invalid_url_returns_bad_request() {
        let (_lb, lb_url) = spawn_lb().await;

        let client = reqwest::Client::new();
        let response = client
            .post(format!("{lb_url}/register"))
            .json(&serde_json::json!({ "url": "not a url" }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn requests_are_proxied_to_a_backend() {
        let (_lb, lb_url) = spawn_lb().await;
        let backend = spawn_echo_backend().await;

        let client = reqwest::Client::new();
        client
            .post(format!("{lb_url}/register"))
            .json(&serde_json::json!({ "url": backend }))
            .send()
            .await
            .unwrap();

        let response = client
            .get(format!("{lb_url}/hello"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "hello from upstream");
    }

    #[tokio::test]
    async fn no_backends_means_service_unavailable() {
        let (_lb, lb_url) = spawn_lb().await;

        let client = reqwest::Client::new();
        let response = client
            .get(format!("{lb_url}/hello"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
