use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::cognitive_common;
use crate::Result;
use crate::job::{PollObservation, Submission};
use crate::profile::{DEFAULT_BASE_URL, EndpointPaths, Env, PollingConfig, ServiceConfig};
use crate::topics::TopicsClient;
use crate::transport::{HttpTransport, Transport};
use crate::types::{OperationHandle, TopicsRequest};

#[derive(Clone)]
pub struct CognitiveTopics {
    transport: Arc<dyn Transport>,
    base_url: String,
    path: String,
    polling: PollingConfig,
}

impl CognitiveTopics {
    pub fn new(api_key: impl AsRef<str>) -> Self {
        Self::with_transport(HttpTransport::new(api_key))
    }

    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            base_url: DEFAULT_BASE_URL.to_string(),
            path: EndpointPaths::default().topics,
            polling: PollingConfig::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_polling(mut self, polling: PollingConfig) -> Self {
        self.polling = polling;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.polling.poll_interval = poll_interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.polling.timeout = timeout;
        self
    }

    pub async fn from_config(config: &ServiceConfig, env: &Env) -> Result<Self> {
        let transport = cognitive_common::transport_from_config(config, env).await?;
        Ok(Self::with_transport(transport)
            .with_base_url(config.base_url())
            .with_path(config.endpoints.topics.clone())
            .with_polling(config.polling()))
    }

    fn topics_url(&self) -> String {
        cognitive_common::join_endpoint(&self.base_url, &self.path)
    }
}

impl std::fmt::Debug for CognitiveTopics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CognitiveTopics")
            .field("base_url", &self.base_url)
            .field("path", &self.path)
            .field("polling", &self.polling)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TopicsClient for CognitiveTopics {
    fn provider(&self) -> &str {
        "cognitive-services"
    }

    fn polling(&self) -> PollingConfig {
        self.polling
    }

    async fn submit(&self, request: &TopicsRequest) -> Result<Submission> {
        let body = serde_json::to_value(request)?;
        let response = self.transport.post_json(&self.topics_url(), &body).await?;
        tracing::debug!(
            status = response.status.as_u16(),
            documents = request.documents.len(),
            "topic detection submission answered"
        );
        Ok(Submission::from_response(
            &response,
            request.documents.len(),
            &self.base_url,
        ))
    }

    async fn poll(&self, handle: &OperationHandle) -> Result<PollObservation> {
        let response = self.transport.get(handle.as_str()).await?;
        Ok(PollObservation::from_response(response))
    }
}
