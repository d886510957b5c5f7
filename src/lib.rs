mod error;
mod profile;

pub mod analysis;
pub mod blocking;
pub mod job;
pub mod providers;
pub mod telemetry;
pub mod topics;
pub mod transport;
pub mod types;
pub mod utils;

pub use error::{AnalyticsError, Result};
pub use profile::{
    DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, EndpointPaths, Env, PollingConfig, ServiceAuth,
    ServiceConfig, parse_dotenv, resolve_auth_token, resolve_auth_token_with_default_keys,
};

pub use analysis::{TextAnalyticsExt, TextAnalyticsModel};
pub use blocking::Blocking;
pub use job::{PollObservation, Submission, classify_payload, run_topics_job, wait_for_operation};
pub use providers::{CognitiveTextAnalytics, CognitiveTopics};
pub use topics::{TopicsClient, TopicsClientExt};
pub use transport::{HttpTransport, Transport, TransportResponse};
pub use types::{
    AnalysisResponse, DetectLanguageResponse, DetectedLanguage, Document, DocumentBatch,
    DocumentError, JobStatus, KeyPhrasesDocument, KeyPhrasesResponse, LanguageDocument,
    MIN_TOPICS_DOCUMENTS, OperationHandle, OperationStatus, SentimentDocument, SentimentResponse,
    Topic, TopicAssignment, TopicsOutcome, TopicsRequest, TopicsResponse,
};

pub use tokio_util::sync::CancellationToken;
