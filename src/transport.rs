use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use crate::Result;
use crate::profile::HttpAuth;
use crate::providers::cognitive_common;
use crate::utils::http::{MAX_RESPONSE_BODY_BYTES, read_body_checked};

/// A completed HTTP exchange, whatever its status code.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Adds a header; invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    }
}

/// Moves JSON requests to the service. Errors mean the call could not be
/// completed or its body could not be read in full; non-2xx replies are
/// returned as responses.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse>;
    async fn get(&self, url: &str) -> Result<TransportResponse>;
}

#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    auth: Option<HttpAuth>,
    max_body_bytes: usize,
}

impl HttpTransport {
    pub fn new(api_key: impl AsRef<str>) -> Self {
        Self {
            http: cognitive_common::default_http_client(),
            auth: cognitive_common::auth_from_api_key(api_key.as_ref()),
            max_body_bytes: MAX_RESPONSE_BODY_BYTES,
        }
    }

    pub(crate) fn from_parts(http: reqwest::Client, auth: Option<HttpAuth>) -> Self {
        Self {
            http,
            auth,
            max_body_bytes: MAX_RESPONSE_BODY_BYTES,
        }
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Largest success body accepted; anything bigger fails the call.
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    fn prepare(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let req = req.header(ACCEPT, "application/json");
        match self.auth.as_ref() {
            Some(auth) => auth.apply(req),
            None => req,
        }
    }

    async fn read(&self, response: reqwest::Response) -> Result<TransportResponse> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = read_body_checked(response, self.max_body_bytes).await?;
        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("auth", &self.auth)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse> {
        let response = self.prepare(self.http.post(url)).json(body).send().await?;
        self.read(response).await
    }

    async fn get(&self, url: &str) -> Result<TransportResponse> {
        let response = self.prepare(self.http.get(url)).send().await?;
        self.read(response).await
    }
}
