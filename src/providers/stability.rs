//! Stability-style image generation adapter.
//!
//! Wraps `POST {base}/v2beta/stable-image/generate/core` with
//! `Accept: image/*`, returning raw PNG bytes. Base64/data-URL encoding is
//! a presentation concern handled by the image capability handler.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::config::StabilityConfig;
use crate::error::ProviderError;

use super::{GenerateOptions, ProviderAdapter, ProviderOutput, classify_status};

const PROVIDER_NAME: &str = "stability";

pub struct StabilityImageProvider {
    config: StabilityConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ImageGenerationRequest<'a> {
    prompt: &'a str,
    output_format: &'a str,
}

impl StabilityImageProvider {
    pub fn new(
        config: StabilityConfig,
        timeout: std::time::Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl ProviderAdapter for StabilityImageProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn generate(
        &self,
        _instruction: &str,
        input: &str,
        _options: &GenerateOptions,
    ) -> Result<ProviderOutput, ProviderError> {
        let url = format!(
            "{}/v2beta/stable-image/generate/core",
            self.config.base_url
        );
        let body = ImageGenerationRequest {
            prompt: input,
            output_format: "png",
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .header(reqwest::header::ACCEPT, "image/*")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::network(PROVIDER_NAME, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(PROVIDER_NAME, status, body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::network(PROVIDER_NAME, &e))?;
        if bytes.is_empty() {
            return Err(ProviderError::InvalidResponse {
                provider: PROVIDER_NAME.to_string(),
                reason: "empty image body".to_string(),
            });
        }

        Ok(ProviderOutput::Binary(bytes.to_vec()))
    }
}
