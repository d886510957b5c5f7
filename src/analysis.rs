use async_trait::async_trait;

use crate::types::{
    AnalysisResponse, DetectLanguageResponse, DocumentBatch, KeyPhrasesResponse, SentimentResponse,
};
use crate::{AnalyticsError, Result};

const KEY_PHRASES: &str = "key phrases";
const SENTIMENT: &str = "sentiment";
const LANGUAGES: &str = "languages";

/// Synchronous batch analyses. Each call issues exactly one request and hands
/// back per-document results and per-document errors together.
#[async_trait]
pub trait TextAnalyticsModel: Send + Sync {
    fn provider(&self) -> &str;

    /// Language tag used by the single-document helpers when none is given.
    fn default_language(&self) -> &str {
        "en"
    }

    async fn key_phrases(&self, batch: DocumentBatch) -> Result<KeyPhrasesResponse>;
    async fn sentiment(&self, batch: DocumentBatch) -> Result<SentimentResponse>;
    async fn detect_languages(&self, batch: DocumentBatch) -> Result<DetectLanguageResponse>;
}

/// Single-document helpers. Unlike the batch calls these fail hard on any
/// reported error, since a lone document cannot be partially successful.
#[async_trait]
pub trait TextAnalyticsExt: TextAnalyticsModel {
    async fn key_phrases_for_text(&self, text: &str, language: Option<&str>) -> Result<Vec<String>> {
        let language = language.unwrap_or(self.default_language()).to_string();
        let response = self
            .key_phrases(DocumentBatch::single(text, Some(language)))
            .await?;
        Ok(single_document(KEY_PHRASES, response)?.key_phrases)
    }

    async fn sentiment_for_text(&self, text: &str, language: Option<&str>) -> Result<f64> {
        let language = language.unwrap_or(self.default_language()).to_string();
        let response = self
            .sentiment(DocumentBatch::single(text, Some(language)))
            .await?;
        Ok(single_document(SENTIMENT, response)?.score)
    }

    /// ISO 639-1 name of the most likely language.
    async fn detect_language_for_text(&self, text: &str) -> Result<String> {
        let response = self
            .detect_languages(DocumentBatch::single(text, None))
            .await?;
        single_document(LANGUAGES, response)?
            .detected_languages
            .into_iter()
            .next()
            .map(|language| language.iso6391_name)
            .ok_or(AnalyticsError::NoLanguageDetected)
    }
}

impl<T> TextAnalyticsExt for T where T: TextAnalyticsModel + ?Sized {}

fn single_document<D>(operation: &'static str, response: AnalysisResponse<D>) -> Result<D> {
    let AnalysisResponse { documents, errors } = response;
    if let Some(error) = errors.into_iter().next() {
        return Err(AnalyticsError::Service {
            operation,
            message: error.message,
        });
    }
    documents
        .into_iter()
        .next()
        .ok_or(AnalyticsError::NoDocument { operation })
}
