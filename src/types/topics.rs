use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Smallest corpus the service accepts for topic detection. Not enforced
/// locally; only used to explain submissions that fail to start.
pub const MIN_TOPICS_DOCUMENTS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopicDocument {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TopicsRequest {
    #[serde(default)]
    pub stop_words: Vec<String>,
    #[serde(default)]
    pub topics_to_exclude: Vec<String>,
    pub documents: Vec<TopicDocument>,
}

impl TopicsRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a request with ids `"1"`, `"2"`, ... in iteration order.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let documents = texts
            .into_iter()
            .enumerate()
            .map(|(idx, text)| TopicDocument {
                id: (idx + 1).to_string(),
                text: text.into(),
            })
            .collect();
        Self {
            documents,
            ..Self::default()
        }
    }

    pub fn push(mut self, id: impl Into<String>, text: impl Into<String>) -> Self {
        self.documents.push(TopicDocument {
            id: id.into(),
            text: text.into(),
        });
        self
    }

    pub fn with_stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_words = words.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_topics_to_exclude<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics_to_exclude = topics.into_iter().map(Into::into).collect();
        self
    }

    pub fn below_minimum(&self) -> bool {
        self.documents.len() < MIN_TOPICS_DOCUMENTS
    }
}

/// Status string reported by the service while an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    #[default]
    Unknown,
}

impl OperationStatus {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("notstarted") {
            Self::NotStarted
        } else if raw.eq_ignore_ascii_case("running") {
            Self::Running
        } else if raw.eq_ignore_ascii_case("succeeded") {
            Self::Succeeded
        } else if raw.eq_ignore_ascii_case("failed") {
            Self::Failed
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "NotStarted",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OperationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OperationStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Submitted,
    Running,
    Succeeded,
    Failed,
    FailedToStart,
    TimedOut,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Submitted | Self::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Submitted => "Submitted",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::FailedToStart => "FailedToStart",
            Self::TimedOut => "TimedOut",
            Self::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

/// Location returned by a topic submission; only valid for polling that one job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationHandle(String);

impl OperationHandle {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub key_phrase: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopicAssignment {
    pub document_id: String,
    pub topic_id: String,
    #[serde(default)]
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct OperationProcessingResult {
    #[serde(default)]
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub topic_assignments: Vec<TopicAssignment>,
    #[serde(default)]
    pub errors: Vec<super::DocumentError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TopicsResponse {
    #[serde(default)]
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_processing_result: Option<OperationProcessingResult>,
}

impl TopicsResponse {
    pub fn topics(&self) -> &[Topic] {
        self.operation_processing_result
            .as_ref()
            .map(|result| result.topics.as_slice())
            .unwrap_or_default()
    }

    pub fn assignments(&self) -> &[TopicAssignment] {
        self.operation_processing_result
            .as_ref()
            .map(|result| result.topic_assignments.as_slice())
            .unwrap_or_default()
    }

    pub fn errors(&self) -> &[super::DocumentError] {
        self.operation_processing_result
            .as_ref()
            .map(|result| result.errors.as_slice())
            .unwrap_or_default()
    }

    pub fn topic(&self, topic_id: &str) -> Option<&Topic> {
        self.topics().iter().find(|topic| topic.id == topic_id)
    }

    /// Groups assignments by document id. Documents without any assignment are absent.
    pub fn assignments_by_document(&self) -> BTreeMap<&str, Vec<&TopicAssignment>> {
        let mut out = BTreeMap::<&str, Vec<&TopicAssignment>>::new();
        for assignment in self.assignments() {
            out.entry(assignment.document_id.as_str())
                .or_default()
                .push(assignment);
        }
        out
    }
}

/// Terminal result of one topic-detection job.
#[derive(Debug, Clone, PartialEq)]
pub enum TopicsOutcome {
    Succeeded {
        response: TopicsResponse,
        raw: String,
    },
    Failed {
        response: TopicsResponse,
        raw: String,
    },
    FailedToStart {
        status: StatusCode,
        message: String,
        body: String,
    },
    TimedOut {
        last_status: JobStatus,
        elapsed: Duration,
        polls: u32,
        last_response: Option<String>,
    },
    Cancelled {
        last_status: JobStatus,
        elapsed: Duration,
        polls: u32,
    },
}

impl TopicsOutcome {
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Succeeded { .. } => JobStatus::Succeeded,
            Self::Failed { .. } => JobStatus::Failed,
            Self::FailedToStart { .. } => JobStatus::FailedToStart,
            Self::TimedOut { .. } => JobStatus::TimedOut,
            Self::Cancelled { .. } => JobStatus::Cancelled,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn response(&self) -> Option<&TopicsResponse> {
        match self {
            Self::Succeeded { response, .. } | Self::Failed { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn into_response(self) -> Option<TopicsResponse> {
        match self {
            Self::Succeeded { response, .. } | Self::Failed { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Human-readable reason for any non-success outcome.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Succeeded { .. } => None,
            Self::Failed { response, .. } => Some(
                response
                    .message
                    .clone()
                    .unwrap_or_else(|| "topic detection failed".to_string()),
            ),
            Self::FailedToStart { message, .. } => Some(message.clone()),
            Self::TimedOut {
                last_status,
                elapsed,
                polls,
                ..
            } => Some(format!(
                "topic detection timed out after {}s and {polls} polls (last status {last_status})",
                elapsed.as_secs()
            )),
            Self::Cancelled { elapsed, polls, .. } => Some(format!(
                "topic detection cancelled after {}s and {polls} polls",
                elapsed.as_secs()
            )),
        }
    }
}
