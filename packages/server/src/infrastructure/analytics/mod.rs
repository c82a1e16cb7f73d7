//! Analytics implementations

pub mod inmemory;

pub use inmemory::InMemoryAnalytics;
