//! Artwork synthesis
//!
//! Optional stage: one bounded-timeout call to an images-generations
//! endpoint, returning raw PNG bytes decoded from the base64 payload.
//! Every failure maps to `ArtworkFailed`, which the orchestrator treats as
//! a skip, not an abort.

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::Args;
use crate::types::{KilnError, Result};

/// Seam for artwork generation
#[async_trait]
pub trait ArtworkSource: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>>;
}

/// Images-generations API client
pub struct ImageApi {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    size: String,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
}

impl ImageApi {
    pub fn new(args: &Args, api_key: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(args.image_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            api_url: args.image_api_url.clone(),
            api_key,
            model: args.image_model.clone(),
            size: args.image_size.clone(),
        })
    }
}

#[async_trait]
impl ArtworkSource for ImageApi {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "n": 1,
            "size": self.size,
            "response_format": "b64_json",
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| KilnError::ArtworkFailed(format!("transport: {}", e)))?;

        if !response.status().is_success() {
            return Err(KilnError::ArtworkFailed(format!(
                "status {}",
                response.status()
            )));
        }

        let parsed: ImageResponse = response
            .json()
            .await
            .map_err(|e| KilnError::ArtworkFailed(format!("decode: {}", e)))?;

        let b64 = parsed
            .data
            .first()
            .and_then(|d| d.b64_json.as_deref())
            .ok_or_else(|| KilnError::ArtworkFailed("no image payload in response".to_string()))?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .map_err(|e| KilnError::ArtworkFailed(format!("base64: {}", e)))?;

        debug!(bytes = bytes.len(), "artwork generated");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_response_shape_parses() {
        let json = r#"{"data": [{"b64_json": "aGVsbG8="}]}"#;
        let parsed: ImageResponse = serde_json::from_str(json).unwrap();
        let b64 = parsed.data[0].b64_json.as_deref().unwrap();
        let bytes = base64::engine::general_purpose::STANDARD.decode(b64).unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn url_only_response_yields_no_payload() {
        // Some deployments return hosted URLs instead of inline bytes; kiln
        // requires inline bytes and treats that as a degradation.
        let json = r#"{"data": [{"url": "https://example.com/img.png"}]}"#;
        let parsed: ImageResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.data[0].b64_json.is_none());
    }
}
