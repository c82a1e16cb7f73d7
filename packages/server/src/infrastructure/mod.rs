//! Infrastructure layer: concrete implementations of the domain traits and the
//! wire DTOs.

pub mod ai_backend;
pub mod analytics;
pub mod auth;
pub mod dto;
pub mod escalation;
pub mod repository;
