use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::{AnalyticsError, Result};

/// Converts `[http_headers]` into default request headers. Blank names are skipped.
pub(super) fn header_map_from_pairs(headers: &BTreeMap<String, String>) -> Result<HeaderMap> {
    headers
        .iter()
        .map(|(name, value)| (name.trim(), value))
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| -> Result<(HeaderName, HeaderValue)> {
            let header = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                AnalyticsError::Config(format!("http_headers: bad header name {name:?}: {err}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|err| {
                AnalyticsError::Config(format!("http_headers: bad value for {name:?}: {err}"))
            })?;
            Ok((header, value))
        })
        .collect()
}

pub(crate) fn build_http_client(
    timeout: Duration,
    headers: &BTreeMap<String, String>,
) -> Result<reqwest::Client> {
    let default_headers = header_map_from_pairs(headers)?;
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .default_headers(default_headers)
        .build()?)
}
