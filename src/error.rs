//! Error types for the Burme Mark gateway.

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Environment variable {key} is not valid UTF-8")]
    NotUtf8 { key: String },
}

/// Errors surfaced to HTTP callers by the gateway itself.
///
/// Provider failures never appear here: capability handlers recover them
/// locally through the fallback generator, so callers only ever see their
/// own mistakes (`BadRequest`, `MethodNotAllowed`), their own request rate
/// (`RateLimited`), or a genuine gateway bug (`Internal`).
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Failed to bind to {addr}: {reason}")]
    StartupFailed { addr: String, reason: String },

    #[error("Failed to build HTTP client for provider {provider}: {reason}")]
    ProviderSetupFailed { provider: String, reason: String },

    #[error("Internal server error")]
    Internal {
        /// Populated only when `DEBUG_ERRORS` is set; never by default.
        detail: Option<String>,
    },
}

impl GatewayError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Wrap an unexpected failure, exposing detail only in debug mode.
    /// Callers log the failure with their own context before wrapping.
    pub fn internal(err: impl std::fmt::Display, debug_errors: bool) -> Self {
        Self::Internal {
            detail: debug_errors.then_some(err.to_string()),
        }
    }
}

/// Provider adapter failures, classified once at the adapter boundary.
///
/// Downstream code matches on these variants and never re-inspects raw
/// vendor payloads. All four kinds are recoverable: capability handlers map
/// them to fallback output instead of propagating them to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider {provider} rate limited")]
    RateLimited { provider: String },

    #[error("Provider {provider} unavailable: HTTP {status}")]
    Unavailable {
        provider: String,
        status: u16,
        /// Vendor status/message, kept for logging only.
        message: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Network error reaching {provider}: {reason}")]
    Network { provider: String, reason: String },
}

impl ProviderError {
    /// Classify a transport-level reqwest failure (DNS, refused connection,
    /// timeout) as `Network`.
    pub fn network(provider: &str, err: &reqwest::Error) -> Self {
        Self::Network {
            provider: provider.to_string(),
            reason: err.to_string(),
        }
    }

    /// Short label for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::Unavailable { .. } => "unavailable",
            Self::InvalidResponse { .. } => "invalid_response",
            Self::Network { .. } => "network",
        }
    }
}
