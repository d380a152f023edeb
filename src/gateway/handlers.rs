//! Capability handlers: chat, image, and code generation.
//!
//! Each handler validates its input, attempts the primary provider adapter,
//! and recovers any provider failure through the fallback generator. The
//! caller always receives HTTP 200 with a `source`-tagged envelope once
//! validation has passed; provider errors are never propagated.

use std::future::Future;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use base64::Engine;
use uuid::Uuid;

use crate::error::{GatewayError, ProviderError};
use crate::providers::ProviderOutput;

use super::server::GatewayState;
use super::types::*;

const CHAT_INSTRUCTION: &str =
    "You are a helpful assistant that responds in Burmese language. Be friendly and helpful.";

/// Run the primary provider call, degrading to `fallback` on any failure.
///
/// `primary` is `None` when no adapter is configured for the capability,
/// which degrades the same way. The fallback only runs after the provider
/// call has definitively failed; there is no speculative parallel fallback.
async fn with_fallback<T, Fut>(
    capability: &'static str,
    primary: Option<Fut>,
    fallback: impl FnOnce() -> T,
) -> (T, Source)
where
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let Some(primary) = primary else {
        tracing::debug!(capability, "no provider configured, using fallback");
        return (fallback(), Source::Fallback);
    };

    match primary.await {
        Ok(content) => (content, Source::Provider),
        Err(err) => {
            match &err {
                ProviderError::InvalidResponse { .. } => {
                    tracing::warn!(capability, kind = err.kind(), error = %err, "provider returned malformed payload, using fallback");
                }
                _ => {
                    tracing::info!(capability, kind = err.kind(), error = %err, "provider failed, using fallback");
                }
            }
            (fallback(), Source::Fallback)
        }
    }
}

/// Unwrap the JSON extractor, mapping body rejections to a 400.
fn require_json<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, GatewayError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| GatewayError::bad_request(format!("invalid JSON body: {rejection}")))
}

/// Validate a required, non-empty text field.
fn require_field(value: Option<String>, name: &str) -> Result<String, GatewayError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| GatewayError::bad_request(format!("{name} is required")))
}

/// `POST /api/chat`
pub(super) async fn chat_handler(
    State(state): State<Arc<GatewayState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, GatewayError> {
    let request = require_json(payload)?;
    let message = require_field(request.message, "message")?;

    let primary = state.chat_provider.as_ref().map(|provider| {
        let provider = provider.clone();
        let options = state.chat_options.clone();
        let message = message.clone();
        async move {
            match provider
                .generate(CHAT_INSTRUCTION, &message, &options)
                .await?
            {
                ProviderOutput::Text(text) => Ok(text),
                ProviderOutput::Binary(_) => Err(ProviderError::InvalidResponse {
                    provider: provider.name().to_string(),
                    reason: "expected text content, got binary".to_string(),
                }),
            }
        }
    });

    let (response, source) =
        with_fallback("chat", primary, || state.fallback.chat_reply(&message)).await;

    Ok(Json(ChatResponse {
        response,
        source,
        app: state.app_name.clone(),
        timestamp: envelope_timestamp(),
    }))
}

/// Image content, shaped per path: provider bytes become a data URL, the
/// fallback is a placeholder URL.
enum ImageContent {
    Data(String),
    PlaceholderUrl(String),
}

/// `POST /api/image`
pub(super) async fn image_handler(
    State(state): State<Arc<GatewayState>>,
    payload: Result<Json<ImageRequest>, JsonRejection>,
) -> Result<Json<ImageResponse>, GatewayError> {
    let request = require_json(payload)?;
    let prompt = require_field(request.prompt, "prompt")?;

    let primary = state.image_provider.as_ref().map(|provider| {
        let provider = provider.clone();
        let prompt = prompt.clone();
        async move {
            match provider.generate("", &prompt, &Default::default()).await? {
                ProviderOutput::Binary(bytes) => {
                    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
                    Ok(ImageContent::Data(format!("data:image/png;base64,{encoded}")))
                }
                ProviderOutput::Text(_) => Err(ProviderError::InvalidResponse {
                    provider: provider.name().to_string(),
                    reason: "expected image bytes, got text".to_string(),
                }),
            }
        }
    });

    let (content, source) = with_fallback("image", primary, || {
        ImageContent::PlaceholderUrl(state.fallback.image_placeholder(&prompt))
    })
    .await;

    let (image, image_url, note) = match content {
        ImageContent::Data(data_url) => (Some(data_url), None, None),
        ImageContent::PlaceholderUrl(url) => (
            None,
            Some(url),
            Some("Using placeholder image due to API limitations"),
        ),
    };

    Ok(Json(ImageResponse {
        image,
        image_url,
        prompt,
        image_id: Uuid::new_v4(),
        source,
        app: state.app_name.clone(),
        timestamp: envelope_timestamp(),
        note,
    }))
}

/// `POST /api/code`
pub(super) async fn code_handler(
    State(state): State<Arc<GatewayState>>,
    payload: Result<Json<CodeRequest>, JsonRejection>,
) -> Result<Json<CodeResponse>, GatewayError> {
    let request = require_json(payload)?;
    let language = request
        .language
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| crate::fallback::DEFAULT_CODE_LANGUAGE.to_string());
    let prompt = require_field(request.prompt, "prompt")?;

    let primary = state.code_provider.as_ref().map(|provider| {
        let provider = provider.clone();
        let options = state.code_options.clone();
        let prompt = prompt.clone();
        let language = language.clone();
        async move {
            let instruction = format!(
                "You are an expert {language} programmer. Respond with {language} code only, no prose."
            );
            match provider.generate(&instruction, &prompt, &options).await? {
                ProviderOutput::Text(code) => Ok((code, language)),
                ProviderOutput::Binary(_) => Err(ProviderError::InvalidResponse {
                    provider: provider.name().to_string(),
                    reason: "expected text content, got binary".to_string(),
                }),
            }
        }
    });

    let (content, source) = with_fallback("code", primary, || {
        let (code, resolved) = state.fallback.code_template(&language);
        (code.to_string(), resolved.to_string())
    })
    .await;
    let (code, language) = content;

    Ok(Json(CodeResponse {
        code,
        language,
        source,
        app: state.app_name.clone(),
        timestamp: envelope_timestamp(),
    }))
}
