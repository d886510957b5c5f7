use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::Result;
use crate::profile::{
    DEFAULT_API_KEY_ENV, Env, HttpAuth, ServiceConfig, build_http_client, resolve_request_auth,
};
use crate::transport::{HttpTransport, TransportResponse};
use crate::types::{AnalysisResponse, DocumentError};

pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(300);
pub(crate) const DEFAULT_LANGUAGE: &str = "en";

/// Id given to the synthesized error when a body cannot be read.
pub(crate) const FALLBACK_ERROR_ID: &str = "1";

pub(crate) fn join_endpoint(base_url: &str, endpoint: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let endpoint = endpoint.trim_start_matches('/');
    if base.ends_with(&format!("/{endpoint}")) {
        base.to_string()
    } else {
        format!("{base}/{endpoint}")
    }
}

/// Absolute locations are used as-is; anything else hangs off the base url.
pub(crate) fn resolve_location(base_url: &str, location: &str) -> String {
    if location.starts_with("https://") || location.starts_with("http://") {
        location.to_string()
    } else {
        join_endpoint(base_url, location)
    }
}

pub(crate) fn default_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

pub(crate) fn auth_from_api_key(api_key: &str) -> Option<HttpAuth> {
    if api_key.trim().is_empty() {
        return None;
    }
    HttpAuth::subscription_key(api_key.trim()).ok()
}

pub(crate) async fn transport_from_config(
    config: &ServiceConfig,
    env: &Env,
) -> Result<HttpTransport> {
    let auth = match config.auth.as_ref() {
        Some(auth) => Some(resolve_request_auth(auth, env).await?),
        None => env
            .first_of(DEFAULT_API_KEY_ENV)
            .and_then(|key| auth_from_api_key(&key)),
    };
    let http = build_http_client(config.request_timeout(), &config.http_headers)?;
    Ok(HttpTransport::from_parts(http, auth))
}

#[derive(Deserialize)]
struct AnalysisEnvelope<D> {
    #[serde(default = "Vec::new")]
    documents: Vec<D>,
    #[serde(default)]
    errors: Option<Vec<DocumentError>>,
}

/// Reads a synchronous-analysis body. Anything without an `errors` list becomes
/// a single synthesized error carrying the raw body.
pub(crate) fn decode_analysis_response<D: DeserializeOwned>(
    response: &TransportResponse,
) -> AnalysisResponse<D> {
    match serde_json::from_str::<AnalysisEnvelope<D>>(&response.body) {
        Ok(AnalysisEnvelope {
            documents,
            errors: Some(errors),
        }) => AnalysisResponse { documents, errors },
        // Weak signal: valid JSON lacking `errors` and plain garbage end up
        // indistinguishable here, both reported through the raw body text.
        _ => AnalysisResponse::from_error(DocumentError {
            id: FALLBACK_ERROR_ID.to_string(),
            message: fallback_message(response),
        }),
    }
}

fn fallback_message(response: &TransportResponse) -> String {
    if response.body.trim().is_empty() {
        format!("empty response body (status {})", response.status)
    } else {
        response.body.clone()
    }
}
