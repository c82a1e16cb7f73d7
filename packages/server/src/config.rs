//! Gateway configuration.

use std::time::Duration;

use crate::infrastructure::auth::TokenGrant;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_AI_BACKEND_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_UNARY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_STREAM_CONNECT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 5;

/// Everything the gateway needs to start, resolved from CLI flags and
/// environment variables by the server binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Base URL of the AI backend (`/chat` and `/chat/stream` are appended)
    pub ai_backend_url: String,
    /// Relay mode for `chat` frames that carry no `stream` flag
    pub stream_by_default: bool,
    /// Accepted bearer tokens
    pub auth_tokens: Vec<TokenGrant>,
    pub heartbeat_interval: Duration,
    /// Total bound on a unary backend call
    pub unary_timeout: Duration,
    /// Bound on the connect and response-header phase of a streaming call
    pub stream_connect_timeout: Duration,
    /// Bound on closing connections and on each resource release at shutdown
    pub shutdown_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            ai_backend_url: DEFAULT_AI_BACKEND_URL.to_string(),
            stream_by_default: false,
            auth_tokens: Vec::new(),
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_INTERVAL_SECS),
            unary_timeout: Duration::from_secs(DEFAULT_UNARY_TIMEOUT_SECS),
            stream_connect_timeout: Duration::from_secs(DEFAULT_STREAM_CONNECT_TIMEOUT_SECS),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
        }
    }
}
