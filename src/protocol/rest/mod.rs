//! HTTP API Module
//!
//! Provides the HTTP server: session endpoints, the question catalog, health
//! reporting and optional static frontend serving. The idle-session sweeper
//! runs alongside the server and is stopped before the engine pool is released.

pub mod dto;
pub mod error;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::config::HttpConfig;
use crate::service::PracticeService;
use crate::sweeper;

use self::handlers::{admin, questions, sessions};

/// Largest accepted request body. SQL text is small.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// How long shutdown waits for the pool to be released.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Creates the Axum router
pub fn create_router(service: Arc<PracticeService>, config: &HttpConfig) -> Router {
    // Build CORS layer
    let cors = if !config.cors_origins.is_empty() {
        // Explicit origins configured: restrict to those
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|s| {
                let parsed = s.parse();
                if parsed.is_err() {
                    tracing::warn!(origin = %s, "invalid_cors_origin_ignored");
                }
                parsed.ok()
            })
            .collect();
        Some(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else if config.cors_allow_all {
        // Explicit dev mode opt-in: allow all origins
        Some(CorsLayer::permissive())
    } else {
        // Default: same-origin only
        None
    };

    let mut app = Router::new()
        .route("/health", get(admin::health))
        .route("/api/login", post(sessions::login))
        .route("/api/execute", post(sessions::execute))
        .route("/api/logout", post(sessions::logout))
        .route("/api/session/:token", get(sessions::get_session))
        .route("/api/questions", get(questions::list_questions))
        .route("/api/questions/:slug", get(questions::get_question))
        .route("/api/admin/sweep", post(admin::sweep))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(Extension(service));

    if let Some(cors) = cors {
        app = app.layer(cors);
    }

    // Serve the frontend, falling back to index.html for client-side routes
    if let Some(static_dir) = &config.static_dir {
        let index_file = format!("{static_dir}/index.html");
        app = app.fallback_service(ServeDir::new(static_dir).fallback(ServeFile::new(index_file)));
    }

    app
}

/// Starts the HTTP server with graceful shutdown support.
///
/// Listens for SIGINT (ctrl-c) and SIGTERM to trigger graceful shutdown.
/// On shutdown: stops accepting connections, stops the session sweeper,
/// then releases the engine pool via `service.shutdown()`.
pub async fn start_http_server(
    service: Arc<PracticeService>,
    config: &HttpConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = create_router(Arc::clone(&service), config);

    let sessions = service.session_config();
    let sweeper = sweeper::spawn(
        Arc::clone(service.store()),
        sessions.sweep_interval(),
        sessions.idle_timeout(),
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let socket = tokio::net::TcpSocket::new_v4()?;
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    let listener = socket.listen(1024)?;

    tracing::info!(%addr, static_dir = ?config.static_dir, "http_server_listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let swept = sweeper.stop().await;
    tracing::info!(swept, "http_server_stopped");

    let shutdown_service = Arc::clone(&service);
    match tokio::time::timeout(
        SHUTDOWN_TIMEOUT,
        tokio::task::spawn_blocking(move || shutdown_service.shutdown()),
    )
    .await
    {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "shutdown_task_panicked");
        }
        Err(_) => {
            tracing::warn!(
                timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
                "shutdown_timed_out"
            );
        }
    }

    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "sigterm_handler_failed");
                    std::future::pending::<()>().await;
                }
            }
        };
        tokio::select! {
            () = ctrl_c => tracing::info!(signal = "SIGINT", "shutdown_requested"),
            () = terminate => tracing::info!(signal = "SIGTERM", "shutdown_requested"),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
        tracing::info!(signal = "SIGINT", "shutdown_requested");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::FakeEngine;
    use crate::Config;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn make_service() -> Arc<PracticeService> {
        let mut config = Config::default();
        config.pool.size = 2;
        Arc::new(PracticeService::with_engine(&FakeEngine::new(), &config).unwrap())
    }

    #[tokio::test]
    async fn test_router_health() {
        let app = create_router(make_service(), &HttpConfig::default());
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_unavailable_after_shutdown() {
        let service = make_service();
        service.shutdown();
        let app = create_router(service, &HttpConfig::default());
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404_without_static_dir() {
        let app = create_router(make_service(), &HttpConfig::default());
        let req = Request::builder().uri("/nope").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let app = create_router(make_service(), &HttpConfig::default());
        let body = format!(
            "{{\"session_token\":\"x\",\"user_sql\":\"{}\"}}",
            "a".repeat(MAX_BODY_BYTES + 1)
        );
        let req = Request::builder()
            .method("POST")
            .uri("/api/execute")
            .header("content-type", "application/json")
            .header("content-length", body.len())
            .body(Body::from(body))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_static_dir_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("index.html"), "<h1>sqldrill</h1>").unwrap();
        let config = HttpConfig {
            static_dir: Some(tmp.path().to_string_lossy().into_owned()),
            ..HttpConfig::default()
        };
        let app = create_router(make_service(), &config);
        let req = Request::builder()
            .uri("/practice/q1")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
