//! Shared utilities for the Kakehashi chat gateway packages.

pub mod logger;
pub mod time;
