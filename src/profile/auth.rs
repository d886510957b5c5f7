use std::process::Stdio;

use reqwest::header::{HeaderName, HeaderValue};
use serde::Deserialize;

use crate::{AnalyticsError, Result};

use super::config::ServiceAuth;
use super::env::Env;

pub(crate) const SUBSCRIPTION_KEY_HEADER: &str = "ocp-apim-subscription-key";

/// Environment variables searched for the subscription key when none are configured.
pub const DEFAULT_API_KEY_ENV: &[&str] = &["TEXT_ANALYTICS_API_KEY", "AZURE_TEXT_ANALYTICS_KEY"];

/// The credential header attached to every request.
#[derive(Clone)]
pub(crate) struct HttpAuth {
    pub(crate) header: HeaderName,
    pub(crate) value: HeaderValue,
}

impl std::fmt::Debug for HttpAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAuth")
            .field("header", &self.header)
            .field("value", &"<redacted>")
            .finish()
    }
}

impl HttpAuth {
    pub(crate) fn subscription_key(key: &str) -> Result<Self> {
        Self::header_value(SUBSCRIPTION_KEY_HEADER, None, key)
    }

    pub(crate) fn header_value(header: &str, prefix: Option<&str>, token: &str) -> Result<Self> {
        let name = header.trim();
        if name.is_empty() {
            return Err(AnalyticsError::Config(
                "auth header name must be non-empty".to_string(),
            ));
        }
        let header = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
            AnalyticsError::Config(format!("auth header {name:?} is not a valid name: {err}"))
        })?;
        let mut value = HeaderValue::from_str(&format!("{}{token}", prefix.unwrap_or_default()))
            .map_err(|err| {
                AnalyticsError::Config(format!("credential for {name:?} is not a valid header value: {err}"))
            })?;
        value.set_sensitive(true);
        Ok(Self { header, value })
    }

    pub(crate) fn apply(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header(self.header.clone(), self.value.clone())
    }
}

pub(crate) async fn resolve_request_auth(auth: &ServiceAuth, env: &Env) -> Result<HttpAuth> {
    let token = resolve_auth_token(auth, env).await?;
    match auth {
        ServiceAuth::HttpHeaderEnv { header, prefix, .. } => {
            HttpAuth::header_value(header, prefix.as_deref(), &token)
        }
        ServiceAuth::ApiKeyEnv { .. } | ServiceAuth::Command { .. } => {
            HttpAuth::subscription_key(&token)
        }
    }
}

pub async fn resolve_auth_token(auth: &ServiceAuth, env: &Env) -> Result<String> {
    resolve_auth_token_with_default_keys(auth, env, DEFAULT_API_KEY_ENV).await
}

/// `default_keys` are only consulted when the auth entry names no keys itself.
pub async fn resolve_auth_token_with_default_keys(
    auth: &ServiceAuth,
    env: &Env,
    default_keys: &[&str],
) -> Result<String> {
    match auth {
        ServiceAuth::ApiKeyEnv { keys } | ServiceAuth::HttpHeaderEnv { keys, .. } => {
            token_from_env(env, keys, default_keys)
        }
        ServiceAuth::Command { command } => token_from_command(command).await,
    }
}

fn token_from_env(env: &Env, keys: &[String], default_keys: &[&str]) -> Result<String> {
    let candidates: Vec<&str> = if keys.is_empty() {
        default_keys.to_vec()
    } else {
        keys.iter().map(String::as_str).collect()
    };
    env.first_of(&candidates)
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            AnalyticsError::AuthCommand(format!(
                "no subscription key in env (tried: {})",
                candidates.join(", ")
            ))
        })
}

#[derive(Deserialize)]
struct CommandToken {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

/// Runs `command` and reads `{"api_key": ...}` or `{"token": ...}` from its stdout.
async fn token_from_command(command: &[String]) -> Result<String> {
    let Some((program, args)) = command.split_first() else {
        return Err(AnalyticsError::AuthCommand("command is empty".to_string()));
    };
    let output = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|err| AnalyticsError::AuthCommand(format!("spawn {program}: {err}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AnalyticsError::AuthCommand(format!(
            "{program} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let parsed: CommandToken = serde_json::from_slice(output.stdout.trim_ascii())?;
    parsed
        .api_key
        .or(parsed.token)
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AnalyticsError::AuthCommand(format!("{program} printed no api_key or token")))
}
