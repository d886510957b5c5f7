pub mod cognitive_analytics;
pub(crate) mod cognitive_common;
pub mod cognitive_topics;

pub use cognitive_analytics::CognitiveTextAnalytics;
pub use cognitive_topics::CognitiveTopics;
