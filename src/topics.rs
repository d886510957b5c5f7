use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::job::{self, PollObservation, Submission};
use crate::profile::PollingConfig;
use crate::types::{OperationHandle, TopicsOutcome, TopicsRequest};

/// Single calls against the topic-detection service. Neither method blocks
/// on job progress; [`TopicsClientExt`] drives them to completion.
#[async_trait]
pub trait TopicsClient: Send + Sync {
    fn provider(&self) -> &str;

    fn polling(&self) -> PollingConfig {
        PollingConfig::default()
    }

    async fn submit(&self, request: &TopicsRequest) -> Result<Submission>;
    async fn poll(&self, handle: &OperationHandle) -> Result<PollObservation>;
}

#[async_trait]
pub trait TopicsClientExt: TopicsClient {
    /// Submits and polls until the job succeeds, fails, fails to start or
    /// exceeds the client's polling budget.
    async fn detect_topics(&self, request: &TopicsRequest) -> Result<TopicsOutcome> {
        self.detect_topics_with_cancel(request, &CancellationToken::new())
            .await
    }

    async fn detect_topics_with_cancel(
        &self,
        request: &TopicsRequest,
        cancel: &CancellationToken,
    ) -> Result<TopicsOutcome> {
        let polling = self.polling();
        job::run_topics_job(self, request, &polling, cancel).await
    }
}

impl<T> TopicsClientExt for T where T: TopicsClient + ?Sized {}
