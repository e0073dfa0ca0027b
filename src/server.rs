//! Health endpoints for the agentbot backend stub.
//!
//! Two static routes and nothing else: `GET /health` for liveness probes and
//! `GET /` as a greeting. No state, no parameters, no error paths.

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use std::error::Error;
use std::net::SocketAddr;

use crate::config::AgentBotConfig;

/// Router with the two static endpoints.
pub fn routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Hello from agentbot!" }))
}

/// Bind to the configured host/port and serve the health endpoints until the
/// process is stopped.
///
/// # Errors
/// Returns an error if the address is invalid or the listener cannot bind.
pub async fn start_server(config: &AgentBotConfig) -> Result<(), Box<dyn Error>> {
    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;

    tracing::info!("Starting health server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, routes()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_body() {
        let Json(body) = health_check().await;
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_root_body() {
        let Json(body) = root().await;
        assert_eq!(body, json!({ "message": "Hello from agentbot!" }));
    }

    #[tokio::test]
    async fn test_health_endpoint_over_http() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, routes()).await.unwrap();
        });

        let response = reqwest::get(format!("http://{addr}/health")).await.unwrap();
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "status": "ok" }));
    }
}
