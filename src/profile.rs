mod auth;
mod config;
mod env;
mod http;

pub(crate) use auth::{HttpAuth, resolve_request_auth};
pub use auth::{DEFAULT_API_KEY_ENV, resolve_auth_token, resolve_auth_token_with_default_keys};
pub use config::{DEFAULT_BASE_URL, EndpointPaths, PollingConfig, ServiceAuth, ServiceConfig};
pub use env::{Env, parse_dotenv};
pub(crate) use http::build_http_client;
