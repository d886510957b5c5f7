use futures_util::StreamExt;

use crate::{AnalyticsError, Result};

/// Upper bound on any body we keep in memory; topic results can be large.
pub(crate) const MAX_RESPONSE_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Reads the body, failing on any stream error.
///
/// A success body over `max_bytes` is an error, never data. Error bodies are cut
/// and marked with `...(truncated)` since they are only diagnostics.
pub(crate) async fn read_body_checked(
    response: reqwest::Response,
    max_bytes: usize,
) -> Result<String> {
    let status = response.status();
    let (bytes, truncated) = response_bytes_capped(response, max_bytes).await?;
    if truncated && status.is_success() {
        return Err(AnalyticsError::InvalidResponse(format!(
            "response exceeded max bytes ({max_bytes}) with status {status}"
        )));
    }

    let mut body = String::from_utf8_lossy(&bytes).into_owned();
    if truncated {
        if !body.is_empty() {
            body.push('\n');
        }
        body.push_str("...(truncated)");
    }
    Ok(body)
}

async fn response_bytes_capped(
    response: reqwest::Response,
    max_bytes: usize,
) -> Result<(Vec<u8>, bool)> {
    let limit = max_bytes.max(1);
    let mut bytes = Vec::<u8>::new();

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let room = limit - bytes.len();
        if chunk.len() > room {
            bytes.extend_from_slice(&chunk[..room]);
            return Ok((bytes, true));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok((bytes, false))
}

/// First `max_chars` characters of a body, for log lines.
pub(crate) fn preview(body: &str, max_chars: usize) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
