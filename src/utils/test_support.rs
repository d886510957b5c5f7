use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use crate::Result;
use crate::transport::{Transport, TransportResponse};

pub fn should_skip_httpmock() -> bool {
    if can_bind_localhost() {
        return false;
    }
    eprintln!("skipping httpmock test: sandbox forbids binding to localhost");
    true
}

fn can_bind_localhost() -> bool {
    match std::net::TcpListener::bind(("127.0.0.1", 0)) {
        Ok(listener) => {
            drop(listener);
            true
        }
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => false,
        Err(err) => panic!("failed to bind localhost for httpmock tests: {err}"),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Post { url: String, body: Value },
    Get { url: String },
}

#[derive(Debug, Default)]
struct Script {
    posts: VecDeque<TransportResponse>,
    gets: VecDeque<TransportResponse>,
    calls: Vec<RecordedCall>,
    last_get: Option<TransportResponse>,
}

/// In-memory [`Transport`] that replays queued responses and records every call.
///
/// When the GET queue runs dry the last GET response is repeated, so a
/// never-finishing job can be scripted with a single entry.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_post(self, response: TransportResponse) -> Self {
        self.lock().posts.push_back(response);
        self
    }

    pub fn push_get(self, response: TransportResponse) -> Self {
        self.lock().gets.push_back(response);
        self
    }

    pub fn push_get_json(self, body: Value) -> Self {
        self.push_get(TransportResponse::new(StatusCode::OK, body.to_string()))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn post_count(&self) -> usize {
        self.count(|call| matches!(call, RecordedCall::Post { .. }))
    }

    pub fn get_count(&self) -> usize {
        self.count(|call| matches!(call, RecordedCall::Get { .. }))
    }

    fn count(&self, pred: impl Fn(&RecordedCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| pred(call)).count()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse> {
        let mut script = self.lock();
        script.calls.push(RecordedCall::Post {
            url: url.to_string(),
            body: body.clone(),
        });
        Ok(script
            .posts
            .pop_front()
            .unwrap_or_else(|| TransportResponse::new(StatusCode::NOT_FOUND, "")))
    }

    async fn get(&self, url: &str) -> Result<TransportResponse> {
        let mut script = self.lock();
        script.calls.push(RecordedCall::Get {
            url: url.to_string(),
        });
        let response = match script.gets.pop_front() {
            Some(response) => {
                script.last_get = Some(response.clone());
                response
            }
            None => script
                .last_get
                .clone()
                .unwrap_or_else(|| TransportResponse::new(StatusCode::NOT_FOUND, "")),
        };
        Ok(response)
    }
}

/// Serves one request on localhost, then answers 200 with a `content-length` of
/// `declared_len` but only `body` on the wire before closing the socket.
///
/// Returns the base url, ending in `/`.
#[cfg(test)]
pub(crate) async fn serve_short_body_once(body: &str, declared_len: usize) -> Result<String> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await?;
    let addr = listener.local_addr()?;
    let reply = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {declared_len}\r\n\r\n{body}"
    );

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
            if request_complete(&request) {
                break;
            }
        }
        let _ = socket.write_all(reply.as_bytes()).await;
        let _ = socket.shutdown().await;
    });

    Ok(format!("http://{addr}/"))
}

#[cfg(test)]
fn request_complete(request: &[u8]) -> bool {
    let Some(head_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let head = String::from_utf8_lossy(&request[..head_end]);
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    request.len() >= head_end + 4 + content_length
}
