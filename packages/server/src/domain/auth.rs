//! Authenticator trait
//!
//! Verifies the bearer credential presented at handshake time. Token issuance
//! lives outside the gateway.

use async_trait::async_trait;

use super::{AuthError, Identity};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve a credential into the identity it was issued for
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}
