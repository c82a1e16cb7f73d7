//! UseCase: セッション・接続数の参照（外部公開用）

use std::sync::Arc;

use crate::domain::{ClientId, ConnectionRegistry, Session};

/// セッション参照のユースケース
pub struct SessionQueryUseCase {
    registry: Arc<dyn ConnectionRegistry>,
}

impl SessionQueryUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// 接続中クライアントのセッション。切断済み・未知の ID なら `None`
    pub async fn get_session_data(&self, client_id: &ClientId) -> Option<Session> {
        self.registry.lookup_session(client_id).await
    }

    pub async fn get_client_count(&self) -> usize {
        self.registry.count().await
    }
}
