//! HTTP transport for the Parlor chat relay
//!
//! Exposes a single chat endpoint that validates the incoming prompt and
//! conversation identifier, hands them to a [`ChatHandler`] and returns the
//! model's reply. Health and memory statistics endpoints sit alongside it for
//! operators.

pub mod error;
pub mod handler;
pub mod request;

pub use error::{Result, ServerError, GENERATION_FAILED_MESSAGE};
pub use handler::ChatHandler;
pub use request::{ChatRequest, ChatResponse, FieldErrors, ValidatedChat, DEFAULT_MAX_PROMPT_CHARS};

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Json as AxumJson, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, options, post};
use axum::{middleware, Router};
use serde::Serialize;
use serde_json::json;
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

/// Configuration for the Parlor server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Enable CORS
    pub enable_cors: bool,
    /// CORS allowed origins (if None, allows any origin)
    pub cors_origins: Option<Vec<String>>,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
    /// Enable request logging
    pub enable_logging: bool,
    /// Longest accepted prompt in characters
    pub max_prompt_chars: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 3000)),
            enable_cors: true,
            cors_origins: None,
            max_body_size: 64 * 1024,
            enable_logging: true,
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
        }
    }
}

impl ServerConfig {
    /// Create a new server configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the port, keeping the bind host.
    pub fn with_port(mut self, port: u16) -> Self {
        self.bind_addr.set_port(port);
        self
    }

    /// Parse and set the bind address from a string.
    pub fn with_bind_addr_str(mut self, addr: &str) -> Result<Self> {
        self.bind_addr = addr
            .parse()
            .map_err(|e| ServerError::config_error(format!("Invalid bind address '{}': {}", addr, e)))?;
        Ok(self)
    }

    /// Enable or disable CORS.
    pub fn with_cors(mut self, enable: bool) -> Self {
        self.enable_cors = enable;
        self
    }

    /// Set allowed CORS origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Enable or disable request logging.
    pub fn with_logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }

    /// Set the longest accepted prompt.
    pub fn with_max_prompt_chars(mut self, chars: usize) -> Self {
        self.max_prompt_chars = chars;
        self
    }
}

/// Shared application state containing the handler and configuration.
#[derive(Clone)]
pub struct AppState<T: ChatHandler> {
    pub handler: T,
    pub config: ServerConfig,
}

/// Handler for the /api/chat POST endpoint.
async fn chat_handler<T: ChatHandler>(
    State(app_state): State<AppState<T>>,
    body: std::result::Result<AxumJson<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let AxumJson(request) = body.map_err(|e| {
        log::warn!("Rejected chat request body: {}", e);
        ServerError::invalid_request(e.body_text())
    })?;

    let chat = request
        .validate(app_state.config.max_prompt_chars)
        .map_err(|fields| {
            log::warn!("Chat request validation failed: {}", fields);
            ServerError::Validation(fields)
        })?;

    log::info!(
        "Received chat message for conversation {} ({} chars)",
        chat.conversation_id,
        chat.prompt.chars().count()
    );

    let reply = app_state
        .handler
        .send_message(&chat.prompt, &chat.conversation_id)
        .await?;

    Ok(Json(ChatResponse { prompt: reply }))
}

/// Handler for the /memory/stats GET endpoint.
async fn memory_stats_handler<T: ChatHandler>(
    State(app_state): State<AppState<T>>,
) -> std::result::Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    log::debug!("Received memory stats request");

    match app_state.handler.memory_stats().await {
        Ok(Some(stats)) => Ok(Json(json!({
            "status": "success",
            "memory_stats": stats,
            "timestamp": chrono::Utc::now()
        }))),
        Ok(None) => Ok(Json(json!({
            "status": "not_available",
            "message": "Memory stats not available for this handler",
            "timestamp": chrono::Utc::now()
        }))),
        Err(e) => {
            log::error!("Failed to get memory stats: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to get memory stats",
                    "timestamp": chrono::Utc::now()
                })),
            ))
        }
    }
}

/// The Parlor HTTP server.
pub struct ParlorServer<T: ChatHandler> {
    handler: T,
    config: ServerConfig,
}

impl<T: ChatHandler> ParlorServer<T> {
    /// Create a new server with the given handler and default configuration.
    pub fn new(handler: T) -> Self {
        Self {
            handler,
            config: ServerConfig::default(),
        }
    }

    /// Create a new server with custom configuration.
    pub fn with_config(handler: T, config: ServerConfig) -> Self {
        Self { handler, config }
    }

    /// Build the Axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let state = AppState {
            handler: self.handler.clone(),
            config: self.config.clone(),
        };

        let mut router = Router::new()
            .route("/", get(|| async { "Hello, World!" }))
            .route("/health", get(|| async {
                Json(HealthResponse {
                    status: "healthy".to_string(),
                    timestamp: chrono::Utc::now(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                })
            }))
            .route("/api/chat", post(chat_handler::<T>))
            .route("/memory/stats", get(memory_stats_handler::<T>))
            // CORS preflight
            .route("/api/chat", options(|| async { StatusCode::OK }))
            .route("/memory/stats", options(|| async { StatusCode::OK }))
            .layer(DefaultBodyLimit::max(self.config.max_body_size))
            .with_state(state);

        if self.config.enable_logging {
            router = router.layer(middleware::from_fn(
                |request: axum::http::Request<axum::body::Body>, next: axum::middleware::Next| async {
                    let request_id = uuid::Uuid::new_v4().to_string();
                    let method = request.method().clone();
                    let uri = request.uri().clone();

                    // Health checks are frequent; keep them out of the info log.
                    let quiet = uri.path() == "/health";
                    if quiet {
                        log::debug!("Request {} {} {}", request_id, method, uri);
                    } else {
                        log::info!("Request {} {} {}", request_id, method, uri);
                    }

                    let start = std::time::Instant::now();
                    let response = next.run(request).await;
                    let duration = start.elapsed();

                    if quiet {
                        log::debug!("Response {} {} in {:?}", request_id, response.status(), duration);
                    } else {
                        log::info!("Response {} {} in {:?}", request_id, response.status(), duration);
                    }

                    response
                },
            ));
        }

        router = router.layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            let cors_layer = if let Some(ref origins) = self.config.cors_origins {
                let origins: std::result::Result<Vec<_>, _> =
                    origins.iter().map(|s| s.parse()).collect();
                match origins {
                    Ok(origins) => CorsLayer::new()
                        .allow_origin(origins)
                        .allow_methods(Any)
                        .allow_headers(Any),
                    Err(_) => {
                        log::warn!("Invalid CORS origin configured, allowing any origin");
                        CorsLayer::permissive()
                    }
                }
            } else {
                CorsLayer::permissive()
            };
            router = router.layer(cors_layer);
        }

        router
    }

    /// Start the server with graceful shutdown support.
    ///
    /// The server will shut down when the provided shutdown signal is received.
    pub async fn serve_with_shutdown<F>(self, shutdown_signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();
        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| {
                ServerError::config_error(format!(
                    "Failed to bind to {}: {}",
                    self.config.bind_addr, e
                ))
            })?;

        log::info!("Parlor server starting on {}", self.config.bind_addr);
        log::info!("Chat endpoint: http://{}/api/chat", self.config.bind_addr);
        log::info!("Health check: http://{}/health", self.config.bind_addr);
        log::info!("Memory stats: http://{}/memory/stats", self.config.bind_addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::internal(format!("Server error: {}", e)))?;

        log::info!("Parlor server shut down gracefully");
        Ok(())
    }
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            log::info!("Received SIGTERM, shutting down...");
        },
    }
}
