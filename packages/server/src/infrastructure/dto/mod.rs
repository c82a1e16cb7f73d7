//! Data Transfer Objects (DTOs) for the gateway.
//!
//! DTOs are organized by protocol:
//! - `websocket`: client-facing WebSocket envelopes
//! - `http`: REST responses and AI backend request/response bodies

pub mod conversion;
pub mod http;
pub mod websocket;
