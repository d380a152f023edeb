//! Axum HTTP server for the gateway.
//!
//! Single entry point that terminates CORS preflight, applies the per-client
//! rate limit, and routes by path to a capability handler. Handlers are
//! statically registered at compile time.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::sync::oneshot;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::GatewayError;
use crate::fallback::FallbackGenerator;
use crate::providers::{
    GenerateOptions, OpenAiChatProvider, ProviderAdapter, StabilityImageProvider,
};
use crate::ratelimit::SlidingWindowLimiter;

use super::handlers::{chat_handler, code_handler, image_handler};
use super::types::*;

/// Sentinel client identity used when no forwarding header is present.
/// Best-effort degradation for direct connections, not a security control:
/// all unattributed traffic shares one quota.
const UNKNOWN_CLIENT: &str = "unknown";

/// Shared state for all gateway handlers.
pub struct GatewayState {
    /// Product name stamped into envelopes and the X-Powered-By header.
    pub app_name: String,
    /// Include internal detail in 500 bodies.
    pub debug_errors: bool,
    /// Chat provider adapter, if configured.
    pub chat_provider: Option<Arc<dyn ProviderAdapter>>,
    /// Image provider adapter, if configured.
    pub image_provider: Option<Arc<dyn ProviderAdapter>>,
    /// Code provider adapter, if configured.
    pub code_provider: Option<Arc<dyn ProviderAdapter>>,
    /// Tuning knobs for chat completions.
    pub chat_options: GenerateOptions,
    /// Tuning knobs for code completions.
    pub code_options: GenerateOptions,
    /// Fallback generator consulted when a provider fails.
    pub fallback: FallbackGenerator,
    /// Per-client request quota, consulted before dispatch.
    pub rate_limiter: SlidingWindowLimiter,
    /// Shutdown signal sender.
    pub shutdown_tx: tokio::sync::RwLock<Option<oneshot::Sender<()>>>,
}

impl GatewayState {
    /// Build gateway state from configuration. The OpenAI adapter is shared
    /// by the chat and code capabilities; only instruction and knobs differ.
    ///
    /// Fails if a configured provider's HTTP client cannot be built, rather
    /// than starting with a silently misconfigured adapter.
    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        let timeout = config.providers.timeout();
        let openai: Option<Arc<dyn ProviderAdapter>> = match &config.providers.openai {
            Some(c) => Some(Arc::new(
                OpenAiChatProvider::new(c.clone(), timeout).map_err(|e| {
                    GatewayError::ProviderSetupFailed {
                        provider: "openai".to_string(),
                        reason: e.to_string(),
                    }
                })?,
            ) as Arc<dyn ProviderAdapter>),
            None => None,
        };
        let stability: Option<Arc<dyn ProviderAdapter>> = match &config.providers.stability {
            Some(c) => Some(Arc::new(
                StabilityImageProvider::new(c.clone(), timeout).map_err(|e| {
                    GatewayError::ProviderSetupFailed {
                        provider: "stability".to_string(),
                        reason: e.to_string(),
                    }
                })?,
            ) as Arc<dyn ProviderAdapter>),
            None => None,
        };

        Ok(Self {
            app_name: config.app_name.clone(),
            debug_errors: config.debug_errors,
            chat_provider: openai.clone(),
            image_provider: stability,
            code_provider: openai,
            chat_options: GenerateOptions {
                max_tokens: Some(500),
                temperature: Some(0.7),
            },
            code_options: GenerateOptions {
                max_tokens: Some(1024),
                temperature: Some(0.2),
            },
            fallback: FallbackGenerator::new(config.chat.fallback_interpolate),
            rate_limiter: SlidingWindowLimiter::new(
                config.rate_limit.max_requests,
                config.rate_limit.window(),
            ),
            shutdown_tx: tokio::sync::RwLock::new(None),
        })
    }

    /// Signal the server to shut down gracefully.
    pub async fn shutdown(&self) {
        if let Some(tx) = self.shutdown_tx.write().await.take() {
            let _ = tx.send(());
        }
    }
}

/// Build the gateway router.
pub fn build_router(state: Arc<GatewayState>) -> Router {
    // Capability routes: rate-limited, POST-only (with a JSON 405 for other
    // methods). OPTIONS preflight is answered by the CORS layer and never
    // reaches the rate limiter.
    let api = Router::new()
        .route(
            "/api/chat",
            post(chat_handler).fallback(method_not_allowed_handler),
        )
        .route(
            "/api/image",
            post(image_handler).fallback(method_not_allowed_handler),
        )
        .route(
            "/api/code",
            post(code_handler).fallback(method_not_allowed_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    // Public API posture: any origin may call the gateway.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .merge(api)
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
        .layer(cors)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            powered_by_middleware,
        ))
        .layer(CatchPanicLayer::custom(PanicResponder {
            debug_errors: state.debug_errors,
        }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// Returns the actual bound `SocketAddr` (useful when binding to port 0).
pub async fn start_server(
    addr: SocketAddr,
    state: Arc<GatewayState>,
) -> Result<SocketAddr, GatewayError> {
    let listener =
        tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::StartupFailed {
                addr: addr.to_string(),
                reason: e.to_string(),
            })?;
    let bound_addr = listener
        .local_addr()
        .map_err(|e| GatewayError::StartupFailed {
            addr: addr.to_string(),
            reason: format!("failed to get local addr: {e}"),
        })?;

    let app = build_router(state.clone());

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    *state.shutdown_tx.write().await = Some(shutdown_tx);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("gateway shutting down");
            })
            .await
        {
            tracing::error!("gateway server error: {}", e);
        }
    });

    Ok(bound_addr)
}

/// Derive the client identity from the trusted proxy header.
fn client_identity(request: &Request) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Admit-or-reject gate in front of every capability handler.
async fn rate_limit_middleware(
    State(state): State<Arc<GatewayState>>,
    request: Request,
    next: Next,
) -> Response {
    let client_id = client_identity(&request);
    if state.rate_limiter.admit(&client_id) {
        next.run(request).await
    } else {
        tracing::info!(client_id = %client_id, "rate limit exceeded");
        GatewayError::RateLimited.into_response()
    }
}

/// Stamp `X-Powered-By: {APP_NAME}` onto every response.
async fn powered_by_middleware(
    State(state): State<Arc<GatewayState>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&state.app_name) {
        response.headers_mut().insert("x-powered-by", value);
    }
    response
}

/// Convert downstream panics into the structured 500 shape. Stack detail is
/// exposed only when `DEBUG_ERRORS` is set.
#[derive(Clone)]
struct PanicResponder {
    debug_errors: bool,
}

impl tower_http::catch_panic::ResponseForPanic for PanicResponder {
    type ResponseBody = axum::body::Body;

    fn response_for_panic(
        &mut self,
        err: Box<dyn std::any::Any + Send + 'static>,
    ) -> axum::http::Response<Self::ResponseBody> {
        let detail = err
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| err.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic with non-string payload".to_string());
        tracing::error!(error = %detail, "handler panicked");
        GatewayError::internal(detail, self.debug_errors).into_response()
    }
}

async fn method_not_allowed_handler() -> GatewayError {
    GatewayError::MethodNotAllowed
}

async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Endpoint not found",
            message: None,
            available_endpoints: Some(AVAILABLE_ENDPOINTS.to_vec()),
        }),
    )
}

/// `GET /health`: unconditional, bypasses rate limiting.
async fn health_handler(State(state): State<Arc<GatewayState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        app: state.app_name.clone(),
        timestamp: envelope_timestamp(),
        services: HealthServices {
            chat: state.chat_provider.is_some(),
            image: state.image_provider.is_some(),
        },
    })
}
