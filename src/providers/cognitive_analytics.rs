use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::cognitive_common;
use crate::Result;
use crate::analysis::TextAnalyticsModel;
use crate::profile::{DEFAULT_BASE_URL, EndpointPaths, Env, ServiceConfig};
use crate::transport::{HttpTransport, Transport};
use crate::types::{
    AnalysisResponse, DetectLanguageResponse, DocumentBatch, KeyPhrasesResponse, SentimentResponse,
};

#[derive(Clone)]
pub struct CognitiveTextAnalytics {
    transport: Arc<dyn Transport>,
    base_url: String,
    endpoints: EndpointPaths,
    default_language: String,
    retry_delay: Option<Duration>,
}

impl CognitiveTextAnalytics {
    pub fn new(api_key: impl AsRef<str>) -> Self {
        Self::with_transport(HttpTransport::new(api_key))
    }

    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoints: EndpointPaths::default(),
            default_language: cognitive_common::DEFAULT_LANGUAGE.to_string(),
            retry_delay: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_endpoints(mut self, endpoints: EndpointPaths) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into();
        self
    }

    /// When set, a response carrying errors is re-issued once after `delay`.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    pub async fn from_config(config: &ServiceConfig, env: &Env) -> Result<Self> {
        let transport = cognitive_common::transport_from_config(config, env).await?;
        let mut out = Self::with_transport(transport)
            .with_base_url(config.base_url())
            .with_endpoints(config.endpoints.clone());
        if let Some(language) = config.default_language() {
            out = out.with_default_language(language);
        }
        out.retry_delay = config.retry_delay();
        Ok(out)
    }

    fn url(&self, endpoint: &str) -> String {
        cognitive_common::join_endpoint(&self.base_url, endpoint)
    }

    async fn call<D: DeserializeOwned>(
        &self,
        operation: &'static str,
        endpoint: &str,
        batch: &DocumentBatch,
    ) -> Result<AnalysisResponse<D>> {
        let url = self.url(endpoint);
        let body = serde_json::to_value(batch)?;

        let response = self.post(operation, &url, &body).await?;
        let Some(delay) = self.retry_delay.filter(|_| !response.errors.is_empty()) else {
            return Ok(response);
        };

        tracing::info!(
            operation,
            delay_ms = delay.as_millis() as u64,
            "retrying text analytics call once"
        );
        tokio::time::sleep(delay).await;
        self.post(operation, &url, &body).await
    }

    async fn post<D: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<AnalysisResponse<D>> {
        let response = self.transport.post_json(url, body).await?;
        let decoded = cognitive_common::decode_analysis_response::<D>(&response);
        if let Some(error) = decoded.first_error() {
            tracing::warn!(
                operation,
                status = response.status.as_u16(),
                document = %error.id,
                errors = decoded.errors.len(),
                "text analytics call reported errors: {}",
                error.message
            );
        }
        Ok(decoded)
    }
}

impl std::fmt::Debug for CognitiveTextAnalytics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CognitiveTextAnalytics")
            .field("base_url", &self.base_url)
            .field("endpoints", &self.endpoints)
            .field("default_language", &self.default_language)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TextAnalyticsModel for CognitiveTextAnalytics {
    fn provider(&self) -> &str {
        "cognitive-services"
    }

    fn default_language(&self) -> &str {
        &self.default_language
    }

    async fn key_phrases(&self, batch: DocumentBatch) -> Result<KeyPhrasesResponse> {
        self.call("key phrases", &self.endpoints.key_phrases, &batch)
            .await
    }

    async fn sentiment(&self, batch: DocumentBatch) -> Result<SentimentResponse> {
        self.call("sentiment", &self.endpoints.sentiment, &batch)
            .await
    }

    async fn detect_languages(&self, batch: DocumentBatch) -> Result<DetectLanguageResponse> {
        self.call("languages", &self.endpoints.languages, &batch)
            .await
    }
}
