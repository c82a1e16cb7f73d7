//! AI backend implementations

pub mod http;

pub use http::HttpAiBackend;
