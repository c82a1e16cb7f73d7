//! Kakehashi chat gateway.
//!
//! Accepts authenticated WebSocket clients and relays their questions to the
//! AI backend.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin kakehashi-server -- --auth-token secret:u-1:alice
//! cargo run --bin kakehashi-server -- --host 0.0.0.0 --port 3000 --stream
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use kakehashi_server::{
    config::{
        DEFAULT_AI_BACKEND_URL, DEFAULT_HEARTBEAT_INTERVAL_SECS, DEFAULT_HOST, DEFAULT_PORT,
        DEFAULT_SHUTDOWN_TIMEOUT_SECS, DEFAULT_STREAM_CONNECT_TIMEOUT_SECS,
        DEFAULT_UNARY_TIMEOUT_SECS, GatewayConfig,
    },
    infrastructure::{
        ai_backend::HttpAiBackend,
        auth::{StaticTokenAuthenticator, TokenGrant},
    },
    ui::{Collaborators, Server},
};
use kakehashi_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "kakehashi-server")]
#[command(about = "Real-time AI chat gateway over WebSocket", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "CHAT_GATEWAY_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "CHAT_GATEWAY_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Base URL of the AI backend
    #[arg(long, env = "CHAT_GATEWAY_AI_BACKEND_URL", default_value = DEFAULT_AI_BACKEND_URL)]
    ai_backend_url: String,

    /// Stream answers token by token unless a message says otherwise
    #[arg(long, env = "CHAT_GATEWAY_STREAM")]
    stream: bool,

    /// Accepted credential as `token:user_id:username` (repeatable)
    #[arg(
        long = "auth-token",
        env = "CHAT_GATEWAY_AUTH_TOKENS",
        value_delimiter = ','
    )]
    auth_tokens: Vec<TokenGrant>,

    /// Seconds between heartbeat sweeps
    #[arg(long, env = "CHAT_GATEWAY_HEARTBEAT_INTERVAL_SECS", default_value_t = DEFAULT_HEARTBEAT_INTERVAL_SECS)]
    heartbeat_interval_secs: u64,

    /// Total timeout of a unary backend call, in seconds
    #[arg(long, env = "CHAT_GATEWAY_UNARY_TIMEOUT_SECS", default_value_t = DEFAULT_UNARY_TIMEOUT_SECS)]
    unary_timeout_secs: u64,

    /// Timeout until a streaming backend call starts answering, in seconds
    #[arg(long, env = "CHAT_GATEWAY_STREAM_CONNECT_TIMEOUT_SECS", default_value_t = DEFAULT_STREAM_CONNECT_TIMEOUT_SECS)]
    stream_connect_timeout_secs: u64,

    /// Bound on each shutdown step, in seconds
    #[arg(long, env = "CHAT_GATEWAY_SHUTDOWN_TIMEOUT_SECS", default_value_t = DEFAULT_SHUTDOWN_TIMEOUT_SECS)]
    shutdown_timeout_secs: u64,

    /// Default log level when RUST_LOG is not set
    #[arg(long, env = "CHAT_GATEWAY_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl From<Args> for GatewayConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            ai_backend_url: args.ai_backend_url,
            stream_by_default: args.stream,
            auth_tokens: args.auth_tokens,
            heartbeat_interval: Duration::from_secs(args.heartbeat_interval_secs),
            unary_timeout: Duration::from_secs(args.unary_timeout_secs),
            stream_connect_timeout: Duration::from_secs(args.stream_connect_timeout_secs),
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout_secs),
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let config = GatewayConfig::from(args);

    // Initialize dependencies in order:
    // 1. Collaborators (authenticator, AI backend, analytics, escalations)
    // 2. Server (registry, use cases, handlers)

    // 1. Create collaborators
    let authenticator = StaticTokenAuthenticator::new(config.auth_tokens.clone());
    if authenticator.is_empty() {
        tracing::warn!("No auth tokens configured; every connection will be rejected");
    } else {
        tracing::info!("{} auth token(s) configured", authenticator.len());
    }
    let backend = match HttpAiBackend::new(
        config.ai_backend_url.clone(),
        config.unary_timeout,
        config.stream_connect_timeout,
    ) {
        Ok(backend) => backend,
        Err(e) => {
            tracing::error!("Failed to set up AI backend client: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("AI backend: {}", config.ai_backend_url);
    let collaborators = Collaborators::in_memory(Arc::new(authenticator), Arc::new(backend));

    // 2. Create and run the server
    let server = Server::new(&config, collaborators);
    if let Err(e) = server.run(config.host.clone(), config.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
