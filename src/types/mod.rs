use serde::{Deserialize, Serialize};

mod topics;

pub use topics::{
    JobStatus, MIN_TOPICS_DOCUMENTS, OperationHandle, OperationProcessingResult, OperationStatus,
    Topic, TopicAssignment, TopicDocument, TopicsOutcome, TopicsRequest, TopicsResponse,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            language: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Documents sent together to one of the synchronous analysis endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DocumentBatch {
    pub documents: Vec<Document>,
}

impl DocumentBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a batch with ids `"1"`, `"2"`, ... in iteration order.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let documents = texts
            .into_iter()
            .enumerate()
            .map(|(idx, text)| Document::new((idx + 1).to_string(), text))
            .collect();
        Self { documents }
    }

    pub(crate) fn single(text: impl Into<String>, language: Option<String>) -> Self {
        let mut document = Document::new("1", text);
        document.language = language;
        Self {
            documents: vec![document],
        }
    }

    pub fn push(mut self, document: Document) -> Self {
        self.documents.push(document);
        self
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.documents.iter().map(|doc| doc.id.as_str())
    }
}

impl From<Vec<Document>> for DocumentBatch {
    fn from(documents: Vec<Document>) -> Self {
        Self { documents }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentError {
    pub id: String,
    pub message: String,
}

/// Per-document results and per-document errors of one synchronous call.
///
/// Both lists can be non-empty at once: a batch may be partially successful.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResponse<D> {
    #[serde(default = "Vec::new")]
    pub documents: Vec<D>,
    #[serde(default)]
    pub errors: Vec<DocumentError>,
}

impl<D> Default for AnalysisResponse<D> {
    fn default() -> Self {
        Self {
            documents: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<D> AnalysisResponse<D> {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn first_error(&self) -> Option<&DocumentError> {
        self.errors.first()
    }

    pub(crate) fn from_error(error: DocumentError) -> Self {
        Self {
            documents: Vec::new(),
            errors: vec![error],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeyPhrasesDocument {
    pub id: String,
    #[serde(default)]
    pub key_phrases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentDocument {
    pub id: String,
    /// 0.0 is negative, 1.0 is positive.
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectedLanguage {
    #[serde(default)]
    pub name: String,
    pub iso6391_name: String,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LanguageDocument {
    pub id: String,
    #[serde(default)]
    pub detected_languages: Vec<DetectedLanguage>,
}

pub type KeyPhrasesResponse = AnalysisResponse<KeyPhrasesDocument>;
pub type SentimentResponse = AnalysisResponse<SentimentDocument>;
pub type DetectLanguageResponse = AnalysisResponse<LanguageDocument>;
