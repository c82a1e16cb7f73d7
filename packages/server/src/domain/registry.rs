//! ConnectionRegistry trait 定義
//!
//! 接続中のクライアントと、それぞれに紐づくセッションを管理するインターフェース。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! ## ライフサイクル
//!
//! Connection と Session は常にペアで登録・削除されます。接続が切れたクライアントの
//! セッションは残りません（再接続による再開はサポートしない）。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ClientId, Connection, Message, RegistryError, Session};

/// A frame queued for a client's socket writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Serialized JSON envelope
    Text(String),
    /// Transport-level liveness ping
    Ping,
    /// Close the transport
    Close,
}

/// Channel feeding a client's socket writer task.
///
/// The channel counts as closed once the writer task has gone away, which is
/// how the registry tells whether a client's transport is still open.
pub type PusherChannel = mpsc::UnboundedSender<OutboundFrame>;

/// Outcome of one heartbeat sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub pinged: usize,
    pub reaped: usize,
}

/// Connection Registry trait
///
/// The sole owner of the live connection set. Every session mutation goes
/// through it, which serializes appends to a given session.
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Register a connection together with a fresh session
    async fn register(
        &self,
        connection: Connection,
        channel: PusherChannel,
    ) -> Result<(), RegistryError>;

    /// Queue a payload for one client.
    ///
    /// Returns `false` when the client is absent or its transport is closed;
    /// never fails.
    async fn send(&self, client_id: &ClientId, payload: String) -> bool;

    /// Queue a payload for every open client; returns how many received it
    async fn broadcast(&self, payload: String) -> usize;

    /// Remove a connection and its session. Idempotent.
    async fn remove(&self, client_id: &ClientId) -> bool;

    /// Number of registered connections
    async fn count(&self) -> usize;

    /// Snapshot of a client's session
    async fn lookup_session(&self, client_id: &ClientId) -> Option<Session>;

    /// Snapshot of a client's connection metadata
    async fn connection(&self, client_id: &ClientId) -> Option<Connection>;

    /// Append to a client's session history
    async fn append_message(
        &self,
        client_id: &ClientId,
        message: Message,
    ) -> Result<(), RegistryError>;

    /// Refresh a client's last activity time
    async fn touch(&self, client_id: &ClientId);

    /// Whether the client is registered and its transport still open
    async fn is_open(&self, client_id: &ClientId) -> bool;

    /// Handle on a client's channel, used by long-running flows to notice
    /// (via [`mpsc::UnboundedSender::closed`]) that the transport went away
    async fn channel(&self, client_id: &ClientId) -> Option<PusherChannel>;

    /// Ping every open transport and drop every closed one
    async fn sweep(&self) -> SweepReport;

    /// Ask every transport to close and clear the registry; returns how many
    /// connections were dropped
    async fn close_all(&self) -> usize;
}
