//! Configuration for the Burme Mark gateway.
//!
//! Everything is resolved from env vars (a `.env` file is loaded via dotenvy
//! early in startup). Provider API keys are optional on purpose: a missing
//! key leaves that adapter slot empty and the capability degrades to
//! fallback output for every request, which matches the product's
//! graceful-degradation posture.

pub(crate) mod helpers;

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

use self::helpers::{env_bool, env_or, optional_env};

pub const DEFAULT_APP_NAME: &str = "Burme Mark AI";

/// Main configuration for the gateway.
#[derive(Debug, Clone)]
pub struct Config {
    /// Product name stamped into every response envelope.
    pub app_name: String,
    /// Include internal error detail in 500 bodies. Default off.
    pub debug_errors: bool,
    pub gateway: GatewayConfig,
    pub rate_limit: RateLimitConfig,
    pub providers: ProvidersConfig,
    pub chat: ChatConfig,
}

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

/// Sliding-window quota applied to every capability endpoint.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Provider adapter configuration.
#[derive(Debug, Clone)]
pub struct ProvidersConfig {
    pub openai: Option<OpenAiConfig>,
    pub stability: Option<StabilityConfig>,
    /// Upper bound on every outbound provider call.
    pub timeout_secs: u64,
}

impl ProvidersConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// OpenAI-style chat completion provider.
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Stability-style image generation provider.
#[derive(Clone)]
pub struct StabilityConfig {
    pub api_key: SecretString,
    pub base_url: String,
}

impl std::fmt::Debug for StabilityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StabilityConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Chat capability tuning.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Interpolate the caller's original message into canned fallback
    /// sentences. On by default; see DESIGN.md.
    pub fallback_interpolate: bool,
}

impl Config {
    /// Resolve the full configuration from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let openai = optional_env("OPENAI_API_KEY")?.map(|key| {
            Ok::<_, ConfigError>(OpenAiConfig {
                api_key: SecretString::from(key),
                base_url: optional_env("OPENAI_BASE_URL")?
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
                model: optional_env("OPENAI_MODEL")?
                    .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            })
        });
        let openai = openai.transpose()?;

        let stability = optional_env("STABILITY_API_KEY")?.map(|key| {
            Ok::<_, ConfigError>(StabilityConfig {
                api_key: SecretString::from(key),
                base_url: optional_env("STABILITY_BASE_URL")?
                    .unwrap_or_else(|| "https://api.stability.ai".to_string()),
            })
        });
        let stability = stability.transpose()?;

        Ok(Self {
            app_name: optional_env("APP_NAME")?.unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            debug_errors: env_bool("DEBUG_ERRORS", false)?,
            gateway: GatewayConfig {
                host: optional_env("GATEWAY_HOST")?.unwrap_or_else(|| "0.0.0.0".to_string()),
                port: env_or("GATEWAY_PORT", 8787)?,
            },
            rate_limit: RateLimitConfig {
                max_requests: env_or("RATE_LIMIT_MAX_REQUESTS", 10)?,
                window_secs: env_or("RATE_LIMIT_WINDOW_SECS", 60)?,
            },
            providers: ProvidersConfig {
                openai,
                stability,
                timeout_secs: env_or("PROVIDER_TIMEOUT_SECS", 30)?,
            },
            chat: ChatConfig {
                fallback_interpolate: env_bool("CHAT_FALLBACK_INTERPOLATE", true)?,
            },
        })
    }
}
