//! InMemory ConnectionRegistry 実装
//!
//! ドメイン層が定義する ConnectionRegistry trait の具体的な実装。
//! HashMap をインメモリストアとして使用し、Connection・Session・送信チャンネルを
//! 1 つのエントリとしてまとめて保持します。
//!
//! ## 並行性
//!
//! 全ての操作は単一の `Mutex` の下で行われます。セッションへの追記もこのロックで
//! 直列化されるため、同じセッションに複数のフローが同時に追記しても履歴が壊れることは
//! ありません。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ClientId, Connection, ConnectionRegistry, Message, OutboundFrame, PusherChannel,
    RegistryError, Session, SweepReport, Timestamp,
};

/// 1 クライアント分の登録情報
struct Entry {
    connection: Connection,
    session: Session,
    channel: PusherChannel,
}

impl Entry {
    fn is_open(&self) -> bool {
        !self.channel.is_closed()
    }
}

/// インメモリ ConnectionRegistry 実装
#[derive(Default)]
pub struct InMemoryConnectionRegistry {
    entries: Mutex<HashMap<ClientId, Entry>>,
}

impl InMemoryConnectionRegistry {
    /// 新しい InMemoryConnectionRegistry を作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRegistry for InMemoryConnectionRegistry {
    async fn register(
        &self,
        connection: Connection,
        channel: PusherChannel,
    ) -> Result<(), RegistryError> {
        let mut entries = self.entries.lock().await;
        if entries.contains_key(&connection.id) {
            return Err(RegistryError::DuplicateClientId(
                connection.id.as_str().to_string(),
            ));
        }

        let session = Session::new(&connection.identity, connection.connected_at);
        tracing::debug!("Client '{}' registered", connection.id);
        entries.insert(
            connection.id.clone(),
            Entry {
                connection,
                session,
                channel,
            },
        );
        Ok(())
    }

    async fn send(&self, client_id: &ClientId, payload: String) -> bool {
        let entries = self.entries.lock().await;
        let Some(entry) = entries.get(client_id) else {
            tracing::debug!("Client '{}' not registered, dropping message", client_id);
            return false;
        };

        match entry.channel.send(OutboundFrame::Text(payload)) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!("Transport of client '{}' closed, dropping message", client_id);
                false
            }
        }
    }

    async fn broadcast(&self, payload: String) -> usize {
        let entries = self.entries.lock().await;
        let mut delivered = 0;
        for (id, entry) in entries.iter() {
            // ブロードキャストでは一部の送信失敗を許容
            if entry
                .channel
                .send(OutboundFrame::Text(payload.clone()))
                .is_ok()
            {
                delivered += 1;
            } else {
                tracing::warn!("Failed to broadcast to client '{}', skipping", id);
            }
        }
        delivered
    }

    async fn remove(&self, client_id: &ClientId) -> bool {
        let mut entries = self.entries.lock().await;
        let removed = entries.remove(client_id).is_some();
        if removed {
            tracing::debug!("Client '{}' and its session removed", client_id);
        }
        removed
    }

    async fn count(&self) -> usize {
        self.entries.lock().await.len()
    }

    async fn lookup_session(&self, client_id: &ClientId) -> Option<Session> {
        let entries = self.entries.lock().await;
        entries.get(client_id).map(|entry| entry.session.clone())
    }

    async fn connection(&self, client_id: &ClientId) -> Option<Connection> {
        let entries = self.entries.lock().await;
        entries.get(client_id).map(|entry| entry.connection.clone())
    }

    async fn append_message(
        &self,
        client_id: &ClientId,
        message: Message,
    ) -> Result<(), RegistryError> {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .get_mut(client_id)
            .ok_or_else(|| RegistryError::ClientNotFound(client_id.as_str().to_string()))?;
        entry.session.append(message);
        Ok(())
    }

    async fn touch(&self, client_id: &ClientId) {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(client_id) {
            entry.connection.touch(Timestamp::now());
        }
    }

    async fn is_open(&self, client_id: &ClientId) -> bool {
        let entries = self.entries.lock().await;
        entries.get(client_id).is_some_and(Entry::is_open)
    }

    async fn channel(&self, client_id: &ClientId) -> Option<PusherChannel> {
        let entries = self.entries.lock().await;
        entries.get(client_id).map(|entry| entry.channel.clone())
    }

    async fn sweep(&self) -> SweepReport {
        let mut entries = self.entries.lock().await;
        let before = entries.len();

        entries.retain(|id, entry| {
            let keep = entry.is_open() && entry.channel.send(OutboundFrame::Ping).is_ok();
            if !keep {
                tracing::info!("Reaping client '{}' with closed transport", id);
            }
            keep
        });

        SweepReport {
            pinged: entries.len(),
            reaped: before - entries.len(),
        }
    }

    async fn close_all(&self) -> usize {
        let mut entries = self.entries.lock().await;
        for (id, entry) in entries.iter() {
            if entry.channel.send(OutboundFrame::Close).is_err() {
                tracing::debug!("Transport of client '{}' already closed", id);
            }
        }
        let closed = entries.len();
        entries.clear();
        closed
    }
}
