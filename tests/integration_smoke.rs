#![cfg(feature = "integration")]

use std::time::Duration;

use text_analytics::{
    CognitiveTextAnalytics, CognitiveTopics, DocumentBatch, JobStatus, Result, TextAnalyticsExt,
    TextAnalyticsModel, TopicsClientExt, TopicsRequest,
};

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn api_key() -> Option<String> {
    env_nonempty("TEXT_ANALYTICS_API_KEY").or_else(|| env_nonempty("AZURE_TEXT_ANALYTICS_KEY"))
}

fn client(api_key: &str) -> CognitiveTextAnalytics {
    let client = CognitiveTextAnalytics::new(api_key);
    match env_nonempty("TEXT_ANALYTICS_BASE_URL") {
        Some(base_url) => client.with_base_url(base_url),
        None => client,
    }
}

#[tokio::test]
async fn key_phrases_smoke() -> Result<()> {
    let Some(api_key) = api_key() else {
        return Ok(());
    };

    let batch = DocumentBatch::from_texts(["How now, brown cow?", "Trust, but verify."]);
    let response = client(&api_key).key_phrases(batch.clone()).await?;
    assert!(response.is_success(), "{:?}", response.first_error());
    assert_eq!(response.documents.len(), batch.len());
    Ok(())
}

#[tokio::test]
async fn single_document_smoke() -> Result<()> {
    let Some(api_key) = api_key() else {
        return Ok(());
    };

    let client = client(&api_key);
    let score = client
        .sentiment_for_text("What a wonderful day.", None)
        .await?;
    assert!((0.0..=1.0).contains(&score));

    let language = client
        .detect_language_for_text("Este es un documento escrito en español.")
        .await?;
    assert_eq!(language, "es");
    Ok(())
}

#[tokio::test]
async fn topics_below_minimum_fails_to_start() -> Result<()> {
    let Some(api_key) = api_key() else {
        return Ok(());
    };

    let mut topics = CognitiveTopics::new(api_key)
        .with_poll_interval(Duration::from_secs(5))
        .with_timeout(Duration::from_secs(60));
    if let Some(base_url) = env_nonempty("TEXT_ANALYTICS_BASE_URL") {
        topics = topics.with_base_url(base_url);
    }
    let outcome = topics
        .detect_topics(&TopicsRequest::from_texts(["too few documents"]))
        .await?;
    assert_eq!(outcome.status(), JobStatus::FailedToStart);
    Ok(())
}
