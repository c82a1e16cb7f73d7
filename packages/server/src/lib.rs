//! Real-time AI chat gateway.
//!
//! Accepts authenticated WebSocket connections, keeps a conversation session
//! per connection, routes inbound messages by type and relays answers from an
//! external AI backend (whole or token by token) back to the asking client.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
