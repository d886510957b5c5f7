//! Run-to-completion wrappers for callers without an async runtime.
//!
//! Each [`Blocking`] owns a current-thread runtime; do not use it from inside
//! another runtime.

use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::analysis::{TextAnalyticsExt, TextAnalyticsModel};
use crate::topics::{TopicsClient, TopicsClientExt};
use crate::types::{
    DetectLanguageResponse, DocumentBatch, KeyPhrasesResponse, SentimentResponse, TopicsOutcome,
    TopicsRequest,
};

#[derive(Debug)]
pub struct Blocking<C> {
    client: C,
    runtime: tokio::runtime::Runtime,
}

impl<C> Blocking<C> {
    pub fn new(client: C) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self { client, runtime })
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_inner(self) -> C {
        self.client
    }
}

impl<C: TextAnalyticsModel> Blocking<C> {
    pub fn key_phrases(&self, batch: DocumentBatch) -> Result<KeyPhrasesResponse> {
        self.runtime.block_on(self.client.key_phrases(batch))
    }

    pub fn sentiment(&self, batch: DocumentBatch) -> Result<SentimentResponse> {
        self.runtime.block_on(self.client.sentiment(batch))
    }

    pub fn detect_languages(&self, batch: DocumentBatch) -> Result<DetectLanguageResponse> {
        self.runtime.block_on(self.client.detect_languages(batch))
    }

    pub fn key_phrases_for_text(&self, text: &str, language: Option<&str>) -> Result<Vec<String>> {
        self.runtime
            .block_on(self.client.key_phrases_for_text(text, language))
    }

    pub fn sentiment_for_text(&self, text: &str, language: Option<&str>) -> Result<f64> {
        self.runtime
            .block_on(self.client.sentiment_for_text(text, language))
    }

    pub fn detect_language_for_text(&self, text: &str) -> Result<String> {
        self.runtime
            .block_on(self.client.detect_language_for_text(text))
    }
}

impl<C: TopicsClient> Blocking<C> {
    /// Blocks the calling thread for up to the client's polling timeout.
    pub fn detect_topics(&self, request: &TopicsRequest) -> Result<TopicsOutcome> {
        self.runtime.block_on(self.client.detect_topics(request))
    }

    pub fn detect_topics_with_cancel(
        &self,
        request: &TopicsRequest,
        cancel: &CancellationToken,
    ) -> Result<TopicsOutcome> {
        self.runtime
            .block_on(self.client.detect_topics_with_cancel(request, cancel))
    }
}
