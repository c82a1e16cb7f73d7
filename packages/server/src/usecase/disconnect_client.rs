//! UseCase: クライアント切断処理
//!
//! 接続とセッションは常にペアで破棄される。切断済みクライアントへの
//! 二重呼び出しは何もしない。

use std::sync::Arc;

use crate::domain::{ClientId, ConnectionRegistry};

/// クライアント切断のユースケース
pub struct DisconnectClientUseCase {
    registry: Arc<dyn ConnectionRegistry>,
}

impl DisconnectClientUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// 切断を実行
    ///
    /// # Returns
    ///
    /// 実際に削除した場合は `true`（既に削除済みなら `false`）
    pub async fn execute(&self, client_id: &ClientId) -> bool {
        let removed = self.registry.remove(client_id).await;
        if removed {
            tracing::info!("Client '{}' disconnected and removed from registry", client_id);
        } else {
            tracing::debug!("Client '{}' was already removed", client_id);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::registered_client;

    #[tokio::test]
    async fn test_disconnect_removes_connection_and_session() {
        // テスト項目: 切断で接続とセッションが両方とも削除される
        // given (前提条件):
        let (registry, client_id, _rx) = registered_client().await;
        let usecase = DisconnectClientUseCase::new(registry.clone());

        // when (操作):
        let removed = usecase.execute(&client_id).await;

        // then (期待する結果):
        assert!(removed);
        assert_eq!(registry.count().await, 0);
        assert!(registry.lookup_session(&client_id).await.is_none());
        assert!(registry.connection(&client_id).await.is_none());
    }

    #[tokio::test]
    async fn test_disconnect_twice_is_noop() {
        // テスト項目: 2 回目の切断は何もしない
        // given (前提条件):
        let (registry, client_id, _rx) = registered_client().await;
        let usecase = DisconnectClientUseCase::new(registry.clone());
        usecase.execute(&client_id).await;

        // when (操作):
        let removed = usecase.execute(&client_id).await;

        // then (期待する結果):
        assert!(!removed);
        assert_eq!(registry.count().await, 0);
    }
}
