//! Provider adapters for external AI vendors.
//!
//! Each adapter hides one vendor's HTTP contract behind the uniform
//! [`ProviderAdapter`] trait. Failures are classified into
//! [`crate::error::ProviderError`] variants exactly once, at this boundary,
//! by inspecting the vendor response status: 429 maps to `RateLimited`, any
//! other non-2xx to `Unavailable`, a 2xx that does not parse into the
//! expected shape to `InvalidResponse`, and transport errors (including the
//! per-request timeout) to `Network`.

mod openai;
mod stability;

pub use openai::OpenAiChatProvider;
pub use stability::StabilityImageProvider;

use async_trait::async_trait;

use crate::error::ProviderError;

/// Capability tuning knobs passed through to the vendor request. These are
/// pass-through parameters, not adapter logic.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Result content from a provider call.
///
/// Binary output (image bytes) is returned as-is; encoding it for the
/// response envelope is the capability handler's concern.
#[derive(Debug, Clone)]
pub enum ProviderOutput {
    Text(String),
    Binary(Vec<u8>),
}

/// Uniform contract over one external AI vendor.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Stable provider name for logging and the response envelope.
    fn name(&self) -> &str;

    /// Run one generation request against the vendor.
    async fn generate(
        &self,
        instruction: &str,
        input: &str,
        options: &GenerateOptions,
    ) -> Result<ProviderOutput, ProviderError>;
}

/// Map a vendor response status outside 2xx to the matching failure class.
///
/// `body` is the vendor's error text, truncated for logging; it is never
/// surfaced to callers.
pub(crate) fn classify_status(
    provider: &str,
    status: reqwest::StatusCode,
    body: String,
) -> ProviderError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        ProviderError::RateLimited {
            provider: provider.to_string(),
        }
    } else {
        let mut message = body;
        if message.len() > 512 {
            // Cut on a char boundary; vendor bodies are arbitrary UTF-8.
            let mut cut = 512;
            while !message.is_char_boundary(cut) {
                cut -= 1;
            }
            message.truncate(cut);
        }
        ProviderError::Unavailable {
            provider: provider.to_string(),
            status: status.as_u16(),
            message,
        }
    }
}
