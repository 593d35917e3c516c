use super::types::{IdentificationRequest, IdentificationResponse, IdentificationResult};
use crate::config::IdentificationConfig;
use crate::error::IdentificationError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Remote service turning an image into ranked species suggestions
#[async_trait]
pub trait ClassificationService: Send + Sync {
    /// `image` may carry a data-URI prefix; implementations strip it
    async fn identify(&self, image: &str) -> Result<IdentificationResult, IdentificationError>;
}

/// plant.id v3 client
pub struct PlantIdClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    health: String,
    similar_images: bool,
    timeout: Duration,
}

impl PlantIdClient {
    pub fn new(config: &IdentificationConfig) -> Result<Self, IdentificationError> {
        let timeout = Duration::from_secs(config.timeout_seconds as u64);
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string);

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            health: config.health.clone(),
            similar_images: config.similar_images,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl ClassificationService for PlantIdClient {
    async fn identify(&self, image: &str) -> Result<IdentificationResult, IdentificationError> {
        let body = IdentificationRequest::single(image, &self.health, self.similar_images);
        debug!(
            "Sending identification request to {} ({} base64 chars)",
            self.endpoint,
            body.images[0].len()
        );

        let mut request = self.client.post(&self.endpoint).json(&body);
        match &self.api_key {
            Some(key) => request = request.header("Api-Key", key),
            None => warn!("Sending identification request without an API key"),
        }

        let resp = request.send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(IdentificationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await?;
        let response: IdentificationResponse =
            serde_json::from_slice(&bytes).map_err(|e| IdentificationError::Decode {
                details: e.to_string(),
            })?;

        let result = IdentificationResult::from(response);
        info!(
            "Identification returned {} suggestion(s)",
            result.suggestions.len()
        );
        Ok(result)
    }
}
