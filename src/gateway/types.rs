//! Request and response DTOs for the gateway API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GatewayError;

/// Paths listed in 404 responses.
pub const AVAILABLE_ENDPOINTS: &[&str] = &["/api/chat", "/api/image", "/api/code", "/health"];

/// Where the response content came from.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Provider,
    Fallback,
}

// --- Chat ---

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub source: Source,
    pub app: String,
    pub timestamp: String,
}

// --- Image ---

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    /// Base64 data URL of provider-generated image bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Placeholder URL when the provider could not complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub prompt: String,
    pub image_id: Uuid,
    pub source: Source,
    pub app: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

// --- Code ---

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub prompt: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CodeResponse {
    pub code: String,
    pub language: String,
    pub source: Source,
    pub app: String,
    pub timestamp: String,
}

// --- Health ---

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub app: String,
    pub timestamp: String,
    pub services: HealthServices,
}

/// Which provider adapters are configured (not whether they are up).
#[derive(Debug, Serialize)]
pub struct HealthServices {
    pub chat: bool,
    pub image: bool,
}

// --- Errors ---

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_endpoints: Option<Vec<&'static str>>,
}

impl ErrorResponse {
    fn new(error: &'static str, message: Option<String>) -> Self {
        Self {
            error,
            message,
            available_endpoints: None,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest { message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("Bad request", Some(message)),
            ),
            Self::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                ErrorResponse::new(
                    "Method not allowed",
                    Some("Only POST requests are supported".to_string()),
                ),
            ),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorResponse::new("Rate limit exceeded", None),
            ),
            Self::Internal { detail } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("Internal server error", detail),
            ),
            // Startup-time errors never reach a request path; the arms exist
            // so the impl stays total.
            Self::StartupFailed { .. } | Self::ProviderSetupFailed { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("Internal server error", None),
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// RFC3339 timestamp for response envelopes.
pub(crate) fn envelope_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
