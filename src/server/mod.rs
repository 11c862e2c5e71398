//! HTTP server for the chat API.
//!
//! Provides REST endpoints for:
//! - Asking the finance advisor
//! - Paginated chat history
//! - User profile and financial-level evaluation

pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Default server port.
pub const DEFAULT_PORT: u16 = 5000;

/// Start the HTTP server with graceful shutdown support.
///
/// The server will stop accepting new connections when `shutdown_signal` completes.
/// The web client is served from another origin, so CORS is left open.
///
/// # Errors
/// Returns an error if the server fails to start.
pub async fn run_server_with_shutdown<F>(
    state: Arc<AppState>,
    port: u16,
    shutdown_signal: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Conversafina server listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

/// API router wrapped in the CORS and trace layers.
fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::chat::core::config::AppConfig;
    use crate::chat::history::memory_store::InMemoryChatDocumentStore;
    use crate::chat::users::user_store::InMemoryUserDirectory;
    use crate::llm::ollama_chat::{OllamaChatClient, OllamaTranslator};

    fn test_app() -> Router {
        let config = AppConfig::default();
        let client = OllamaChatClient::new(&config.llm, "m").unwrap();
        let state = AppState::from_parts(
            config,
            Arc::new(InMemoryUserDirectory::new()),
            Arc::new(InMemoryChatDocumentStore::new()),
            Arc::new(client.clone()),
            Arc::new(OllamaTranslator::new(client)),
        );
        app(state)
    }

    #[tokio::test]
    async fn cross_origin_requests_are_allowed() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("origin", "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn preflight_is_answered_for_the_identity_header() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/chat/history")
                    .header("origin", "http://localhost:3000")
                    .header("access-control-request-method", "GET")
                    .header("access-control-request-headers", routes::USER_ID_HEADER)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_success());
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }
}
