//! Resources released on shutdown

use async_trait::async_trait;

use super::CollaboratorError;

/// An upstream resource owned by the gateway process (e.g. a persistence
/// connection) that must be released during shutdown.
#[async_trait]
pub trait OwnedResource: Send + Sync {
    fn name(&self) -> &str;

    /// Release the resource. Must tolerate being called more than once.
    async fn release(&self) -> Result<(), CollaboratorError>;
}
