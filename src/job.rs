use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::profile::PollingConfig;
use crate::providers::cognitive_common;
use crate::topics::TopicsClient;
use crate::transport::TransportResponse;
use crate::types::{
    JobStatus, MIN_TOPICS_DOCUMENTS, OperationHandle, OperationStatus, TopicsOutcome,
    TopicsRequest, TopicsResponse,
};
use crate::utils::http::preview;

const OPERATION_LOCATION: &str = "operation-location";
const SUCCEEDED_MARKER: &str = "\"status\":\"Succeeded\"";
const FAILED_MARKER: &str = "\"status\":\"Failed\"";
const LOG_PREVIEW_CHARS: usize = 4096;

/// Result of the single submission call.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Accepted(OperationHandle),
    FailedToStart {
        status: StatusCode,
        message: String,
        body: String,
    },
}

impl Submission {
    /// A 2xx reply with a non-blank `Operation-Location` header is accepted;
    /// relative locations are resolved against `base_url`.
    pub fn from_response(response: &TransportResponse, documents: usize, base_url: &str) -> Self {
        let location = response
            .header(OPERATION_LOCATION)
            .map(str::trim)
            .filter(|location| !location.is_empty());
        match location {
            Some(location) if response.status.is_success() => Self::Accepted(OperationHandle::new(
                cognitive_common::resolve_location(base_url, location),
            )),
            _ => Self::FailedToStart {
                status: response.status,
                message: failed_to_start_message(response.status, documents),
                body: response.body.clone(),
            },
        }
    }
}

fn failed_to_start_message(status: StatusCode, documents: usize) -> String {
    let mut message = if status.is_success() {
        format!("topic detection failed to start: status {status} without an operation location")
    } else {
        format!("topic detection failed to start: status {status}")
    };
    if documents < MIN_TOPICS_DOCUMENTS {
        message.push_str(&format!(
            "; the batch has {documents} documents and the service requires at least \
             {MIN_TOPICS_DOCUMENTS}, which is the likely cause"
        ));
    }
    message
}

/// One status check against an operation handle.
#[derive(Debug, Clone, PartialEq)]
pub struct PollObservation {
    pub status: OperationStatus,
    pub http_status: StatusCode,
    pub raw: String,
}

impl PollObservation {
    pub fn from_response(response: TransportResponse) -> Self {
        Self {
            status: classify_payload(&response.body),
            http_status: response.status,
            raw: response.body,
        }
    }
}

#[derive(Deserialize)]
struct StatusProbe {
    #[serde(default)]
    status: Option<OperationStatus>,
}

/// Reads the `status` field of a poll payload.
///
/// Payloads that cannot be read structurally (duplicate keys, non-JSON text)
/// fall back to raw markers, with Succeeded checked before Failed.
pub fn classify_payload(raw: &str) -> OperationStatus {
    match serde_json::from_str::<StatusProbe>(raw) {
        Ok(probe) => probe.status.unwrap_or_default(),
        Err(_) => classify_markers(raw),
    }
}

fn classify_markers(raw: &str) -> OperationStatus {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.contains(SUCCEEDED_MARKER) {
        OperationStatus::Succeeded
    } else if compact.contains(FAILED_MARKER) {
        OperationStatus::Failed
    } else {
        OperationStatus::Unknown
    }
}

/// Submits `request` and waits for the job to reach a terminal outcome.
pub async fn run_topics_job<C>(
    client: &C,
    request: &TopicsRequest,
    polling: &PollingConfig,
    cancel: &CancellationToken,
) -> Result<TopicsOutcome>
where
    C: TopicsClient + ?Sized,
{
    let submission = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            return Ok(cancelled(JobStatus::Submitted, Duration::ZERO, 0));
        }
        submission = client.submit(request) => submission?,
    };

    match submission {
        Submission::Accepted(handle) => {
            tracing::info!(
                provider = client.provider(),
                handle = %handle,
                documents = request.documents.len(),
                "topic detection submitted"
            );
            wait_for_operation(client, &handle, polling, cancel).await
        }
        Submission::FailedToStart {
            status,
            message,
            body,
        } => {
            tracing::warn!(
                provider = client.provider(),
                status = status.as_u16(),
                documents = request.documents.len(),
                "{message}"
            );
            Ok(TopicsOutcome::FailedToStart {
                status,
                message,
                body,
            })
        }
    }
}

/// Polls `handle` until a terminal status, the timeout or cancellation.
///
/// The budget is checked before every poll, so a zero timeout never polls.
pub async fn wait_for_operation<C>(
    client: &C,
    handle: &OperationHandle,
    polling: &PollingConfig,
    cancel: &CancellationToken,
) -> Result<TopicsOutcome>
where
    C: TopicsClient + ?Sized,
{
    let started = Instant::now();
    let mut polls: u32 = 0;
    let mut last_status = JobStatus::Submitted;
    let mut last_response: Option<String> = None;

    loop {
        let elapsed = started.elapsed();
        if cancel.is_cancelled() {
            return Ok(cancelled(last_status, elapsed, polls));
        }
        if elapsed >= polling.timeout {
            tracing::warn!(
                handle = %handle,
                polls,
                elapsed_ms = elapsed.as_millis() as u64,
                last_status = %last_status,
                "topic detection timed out"
            );
            return Ok(TopicsOutcome::TimedOut {
                last_status,
                elapsed,
                polls,
                last_response,
            });
        }

        let observation = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Ok(cancelled(last_status, started.elapsed(), polls));
            }
            observation = client.poll(handle) => observation?,
        };
        polls += 1;

        tracing::info!(
            handle = %handle,
            poll = polls,
            status = %observation.status,
            http_status = observation.http_status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "topic detection poll: {}",
            preview(&observation.raw, LOG_PREVIEW_CHARS)
        );
        if !observation.http_status.is_success() {
            tracing::warn!(
                handle = %handle,
                poll = polls,
                http_status = observation.http_status.as_u16(),
                "topic detection poll returned a non-success status; continuing"
            );
        }

        match observation.status {
            OperationStatus::Succeeded => {
                let response = parse_terminal(&observation.raw, OperationStatus::Succeeded);
                return Ok(TopicsOutcome::Succeeded {
                    response,
                    raw: observation.raw,
                });
            }
            OperationStatus::Failed => {
                let response = parse_terminal(&observation.raw, OperationStatus::Failed);
                return Ok(TopicsOutcome::Failed {
                    response,
                    raw: observation.raw,
                });
            }
            OperationStatus::NotStarted => last_status = JobStatus::Submitted,
            OperationStatus::Running | OperationStatus::Unknown => {
                last_status = JobStatus::Running;
            }
        }
        last_response = Some(observation.raw);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Ok(cancelled(last_status, started.elapsed(), polls));
            }
            _ = tokio::time::sleep(polling.poll_interval) => {}
        }
    }
}

/// The classified status wins over whatever the payload's own field says.
fn parse_terminal(raw: &str, status: OperationStatus) -> TopicsResponse {
    match serde_json::from_str::<TopicsResponse>(raw) {
        Ok(mut response) => {
            response.status = status;
            response
        }
        Err(err) => {
            tracing::warn!(status = %status, "unreadable terminal topic detection payload: {err}");
            TopicsResponse {
                status,
                message: Some(format!("unreadable topic detection payload: {err}")),
                ..TopicsResponse::default()
            }
        }
    }
}

fn cancelled(last_status: JobStatus, elapsed: Duration, polls: u32) -> TopicsOutcome {
    tracing::info!(
        polls,
        elapsed_ms = elapsed.as_millis() as u64,
        "topic detection cancelled"
    );
    TopicsOutcome::Cancelled {
        last_status,
        elapsed,
        polls,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::CognitiveTopics;
    use crate::utils::test_support::{RecordedCall, ScriptedTransport};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    const HANDLE: &str = "https://svc.test/text/analytics/v2.0/operations/abc";

    fn accepted() -> TransportResponse {
        TransportResponse::new(StatusCode::ACCEPTED, "").with_header("Operation-Location", HANDLE)
    }

    fn client(script: &ScriptedTransport, polling: PollingConfig) -> CognitiveTopics {
        CognitiveTopics::with_transport(script.clone())
            .with_base_url("https://svc.test/")
            .with_polling(polling)
    }

    fn fast() -> PollingConfig {
        PollingConfig::new(Duration::from_millis(1), Duration::from_secs(60))
    }

    #[test]
    fn classifies_structured_status() {
        assert_eq!(
            classify_payload(r#"{"status":"Running"}"#),
            OperationStatus::Running
        );
        assert_eq!(
            classify_payload(r#"{ "status" : "succeeded", "operationProcessingResult": {} }"#),
            OperationStatus::Succeeded
        );
        assert_eq!(
            classify_payload(r#"{"message":"Failed","detail":"status"}"#),
            OperationStatus::Unknown
        );
        assert_eq!(
            classify_payload(r#"{"status":"NotStarted"}"#),
            OperationStatus::NotStarted
        );
    }

    #[test]
    fn unreadable_payloads_fall_back_to_markers_with_succeeded_first() {
        assert_eq!(
            classify_payload(r#"{"status":"Failed","status":"Succeeded"}"#),
            OperationStatus::Succeeded
        );
        assert_eq!(
            classify_payload(r#"garbage "status": "Failed" trailer"#),
            OperationStatus::Failed
        );
        assert_eq!(classify_payload("<html>busy</html>"), OperationStatus::Unknown);
    }

    #[test]
    fn failed_to_start_hint_depends_on_batch_size() {
        let rejected = TransportResponse::new(StatusCode::BAD_REQUEST, r#"{"code":"BadRequest"}"#);
        let Submission::FailedToStart {
            status,
            message,
            body,
        } = Submission::from_response(&rejected, 3, "https://svc.test/")
        else {
            panic!("400 must not be accepted");
        };
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(message.contains("400"));
        assert!(message.contains("at least 100"));
        assert_eq!(body, r#"{"code":"BadRequest"}"#);

        let Submission::FailedToStart { message, .. } =
            Submission::from_response(&rejected, 250, "https://svc.test/")
        else {
            panic!("400 must not be accepted");
        };
        assert!(message.contains("400"));
        assert!(!message.contains("at least"));
    }

    #[test]
    fn accepted_requires_location_header() {
        let missing = TransportResponse::new(StatusCode::ACCEPTED, "");
        assert!(matches!(
            Submission::from_response(&missing, 120, "https://svc.test/"),
            Submission::FailedToStart { status: StatusCode::ACCEPTED, .. }
        ));

        let blank = missing.clone().with_header("Operation-Location", "  ");
        assert!(matches!(
            Submission::from_response(&blank, 120, "https://svc.test/"),
            Submission::FailedToStart { .. }
        ));

        let relative = missing.with_header("Operation-Location", "/operations/7");
        assert_eq!(
            Submission::from_response(&relative, 120, "https://svc.test/"),
            Submission::Accepted(OperationHandle::new("https://svc.test/operations/7"))
        );
    }

    #[tokio::test]
    async fn stops_polling_on_first_terminal_status() -> Result<()> {
        let script = ScriptedTransport::new()
            .push_post(accepted())
            .push_get_json(json!({ "status": "NotStarted" }))
            .push_get_json(json!({ "status": "Running" }))
            .push_get_json(json!({
                "status": "Succeeded",
                "operationProcessingResult": {
                    "topics": [{ "id": "t1", "score": 12.0, "keyPhrase": "service" }],
                    "topicAssignments": [{ "documentId": "1", "topicId": "t1", "distance": 0.1 }],
                    "errors": []
                }
            }))
            .push_get_json(json!({ "status": "Running" }));

        let outcome = run_topics_job(
            &client(&script, fast()),
            &TopicsRequest::from_texts(["a", "b"]),
            &fast(),
            &CancellationToken::new(),
        )
        .await?;

        assert_eq!(script.post_count(), 1);
        assert_eq!(script.get_count(), 3);
        assert!(outcome.is_success());
        let response = outcome.response().expect("succeeded carries a response");
        assert_eq!(response.topics()[0].key_phrase, "service");
        assert_eq!(response.assignments_by_document()["1"][0].topic_id, "t1");
        assert!(
            script
                .calls()
                .iter()
                .skip(1)
                .all(|call| call == &RecordedCall::Get { url: HANDLE.to_string() })
        );
        Ok(())
    }

    #[tokio::test]
    async fn failed_status_is_terminal() -> Result<()> {
        let script = ScriptedTransport::new()
            .push_post(accepted())
            .push_get_json(json!({ "status": "Failed", "message": "Internal error" }));

        let outcome = run_topics_job(
            &client(&script, fast()),
            &TopicsRequest::from_texts(["a"]),
            &fast(),
            &CancellationToken::new(),
        )
        .await?;

        assert_eq!(script.get_count(), 1);
        assert_eq!(outcome.status(), JobStatus::Failed);
        assert_eq!(outcome.message().as_deref(), Some("Internal error"));
        Ok(())
    }

    #[tokio::test]
    async fn failed_to_start_never_polls() -> Result<()> {
        let script = ScriptedTransport::new().push_post(TransportResponse::new(
            StatusCode::BAD_REQUEST,
            r#"{"code":"BadRequest","message":"Invalid request"}"#,
        ));

        let outcome = run_topics_job(
            &client(&script, fast()),
            &TopicsRequest::from_texts(["only one"]),
            &fast(),
            &CancellationToken::new(),
        )
        .await?;

        assert_eq!(script.get_count(), 0);
        match outcome {
            TopicsOutcome::FailedToStart {
                status,
                message,
                body,
            } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert!(message.contains("400"));
                assert!(message.contains("100"));
                assert!(body.contains("Invalid request"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_after_budget_with_last_response() -> Result<()> {
        let script = ScriptedTransport::new()
            .push_post(accepted())
            .push_get_json(json!({ "status": "Running" }));
        let polling = PollingConfig::new(Duration::from_secs(60), Duration::from_secs(150));

        let outcome = run_topics_job(
            &client(&script, polling),
            &TopicsRequest::from_texts(["a"]),
            &polling,
            &CancellationToken::new(),
        )
        .await?;

        assert_eq!(script.get_count(), 3);
        match outcome {
            TopicsOutcome::TimedOut {
                last_status,
                elapsed,
                polls,
                last_response,
            } => {
                assert_eq!(last_status, JobStatus::Running);
                assert_eq!(polls, 3);
                assert!(elapsed >= Duration::from_secs(150));
                assert_eq!(last_response.as_deref(), Some(r#"{"status":"Running"}"#));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn zero_timeout_never_polls() -> Result<()> {
        let script = ScriptedTransport::new().push_post(accepted());
        let polling = PollingConfig::new(Duration::from_secs(1), Duration::ZERO);

        let outcome = run_topics_job(
            &client(&script, polling),
            &TopicsRequest::from_texts(["a"]),
            &polling,
            &CancellationToken::new(),
        )
        .await?;

        assert_eq!(script.get_count(), 0);
        assert!(matches!(
            outcome,
            TopicsOutcome::TimedOut {
                polls: 0,
                last_status: JobStatus::Submitted,
                last_response: None,
                ..
            }
        ));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn non_success_polls_keep_polling() -> Result<()> {
        let script = ScriptedTransport::new()
            .push_post(accepted())
            .push_get(TransportResponse::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "<html>busy</html>",
            ))
            .push_get_json(json!({ "status": "Succeeded" }));

        let outcome = run_topics_job(
            &client(&script, PollingConfig::default()),
            &TopicsRequest::from_texts(["a"]),
            &PollingConfig::default(),
            &CancellationToken::new(),
        )
        .await?;

        assert_eq!(script.get_count(), 2);
        assert!(outcome.is_success());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_sleep_yields_cancelled() -> Result<()> {
        let script = ScriptedTransport::new()
            .push_post(accepted())
            .push_get_json(json!({ "status": "Running" }));
        let polling = PollingConfig::default();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(90)).await;
            trigger.cancel();
        });

        let outcome = run_topics_job(
            &client(&script, polling),
            &TopicsRequest::from_texts(["a"]),
            &polling,
            &cancel,
        )
        .await?;

        assert_eq!(script.get_count(), 2);
        match outcome {
            TopicsOutcome::Cancelled {
                last_status, polls, ..
            } => {
                assert_eq!(last_status, JobStatus::Running);
                assert_eq!(polls, 2);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn cancelled_before_submission_sends_nothing() -> Result<()> {
        let script = ScriptedTransport::new().push_post(accepted());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = run_topics_job(
            &client(&script, fast()),
            &TopicsRequest::from_texts(["a"]),
            &fast(),
            &cancel,
        )
        .await?;

        assert!(script.calls().is_empty());
        assert_eq!(outcome.status(), JobStatus::Cancelled);
        Ok(())
    }

    #[tokio::test]
    async fn ambiguous_terminal_payload_resolves_to_succeeded() -> Result<()> {
        let script = ScriptedTransport::new()
            .push_post(accepted())
            .push_get(TransportResponse::new(
                StatusCode::OK,
                r#"{"status":"Failed","status":"Succeeded"}"#,
            ));

        let outcome = run_topics_job(
            &client(&script, fast()),
            &TopicsRequest::from_texts(["a"]),
            &fast(),
            &CancellationToken::new(),
        )
        .await?;

        assert_eq!(script.get_count(), 1);
        match outcome {
            TopicsOutcome::Succeeded { response, raw } => {
                assert_eq!(response.status, OperationStatus::Succeeded);
                assert!(
                    response
                        .message
                        .as_deref()
                        .is_some_and(|message| message.contains("unreadable"))
                );
                assert!(raw.contains("Failed"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        Ok(())
    }

    #[derive(Clone, Default)]
    struct PollEvents(Arc<Mutex<Vec<(u64, String)>>>);

    #[derive(Default)]
    struct PollFields {
        message: String,
        poll: Option<u64>,
        status: Option<String>,
    }

    impl tracing::field::Visit for PollFields {
        fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
            if field.name() == "poll" {
                self.poll = Some(value);
            }
        }

        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            match field.name() {
                "status" => self.status = Some(format!("{value:?}")),
                "message" => self.message = format!("{value:?}"),
                _ => {}
            }
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for PollEvents {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if *event.metadata().level() != tracing::Level::INFO {
                return;
            }
            let mut fields = PollFields::default();
            event.record(&mut fields);
            if let (true, Some(poll), Some(status)) = (
                fields.message.starts_with("topic detection poll:"),
                fields.poll,
                fields.status,
            ) {
                self.0
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .push((poll, status));
            }
        }
    }

    #[tokio::test]
    async fn logs_one_info_event_per_poll() -> Result<()> {
        use tracing_subscriber::layer::SubscriberExt as _;

        let events = PollEvents::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(events.clone()));

        let script = ScriptedTransport::new()
            .push_post(accepted())
            .push_get_json(json!({ "status": "NotStarted" }))
            .push_get_json(json!({ "status": "Running" }))
            .push_get_json(json!({ "status": "Succeeded", "operationProcessingResult": {} }));

        let outcome = run_topics_job(
            &client(&script, fast()),
            &TopicsRequest::from_texts(["a"]),
            &fast(),
            &CancellationToken::new(),
        )
        .await?;

        assert_eq!(outcome.status(), JobStatus::Succeeded);
        let seen = events
            .0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        assert_eq!(
            seen,
            [
                (1, "NotStarted".to_string()),
                (2, "Running".to_string()),
                (3, "Succeeded".to_string()),
            ]
        );
        Ok(())
    }
}
