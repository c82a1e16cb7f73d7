//! Escalation store implementations

pub mod inmemory;

pub use inmemory::InMemoryEscalationStore;
