use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to run auth command: {0}")]
    AuthCommand(String),
    #[error("error calling {operation}: {message}")]
    Service {
        operation: &'static str,
        message: String,
    },
    #[error("error calling {operation}: no document returned")]
    NoDocument { operation: &'static str },
    #[error("no languages detected by the service")]
    NoLanguageDetected,
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
