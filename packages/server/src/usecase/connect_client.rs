//! UseCase: クライアント接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectClientUseCase::authenticate() と execute() メソッド
//! - 認証 → ClientId 払い出し → レジストリ登録 → `connection` 通知 の流れ
//!
//! ### なぜこのテストが必要か
//! - 認証されていないクライアントが登録されないことを保証
//! - 同時に接続してきたクライアントに重複した ClientId が割り当てられないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：有効なトークンでの接続
//! - 異常系：トークン無し・無効なトークン
//! - エッジケース：多数のクライアントが同時に接続

use std::sync::Arc;

use crate::{
    domain::{
        AuthError, Authenticator, ClientId, Connection, ConnectionRegistry, Identity,
        PusherChannel, Timestamp,
    },
    infrastructure::dto::websocket::EnvelopeBody,
};

use super::{error::ConnectError, push};

/// Greeting carried by the `connection` envelope
pub const CONNECTED_MESSAGE: &str = "Connected to chat server";

/// クライアント接続のユースケース
pub struct ConnectClientUseCase {
    /// Authenticator（認証情報の検証）
    authenticator: Arc<dyn Authenticator>,
    /// ConnectionRegistry（接続とセッションの管理）
    registry: Arc<dyn ConnectionRegistry>,
}

impl ConnectClientUseCase {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        registry: Arc<dyn ConnectionRegistry>,
    ) -> Self {
        Self {
            authenticator,
            registry,
        }
    }

    /// ハンドシェイク時の認証
    ///
    /// 空白のみのトークンは「トークン無し」として扱う。
    pub async fn authenticate(&self, credential: Option<&str>) -> Result<Identity, ConnectError> {
        let token = credential
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ConnectError::Unauthorized(AuthError::MissingCredential))?;

        self.authenticator
            .verify(token)
            .await
            .map_err(ConnectError::Unauthorized)
    }

    /// 認証済みクライアントを登録し、`connection` エンベロープを送る
    ///
    /// # Returns
    ///
    /// * `Ok(Connection)` - 登録された接続（新しく払い出された ClientId を含む）
    /// * `Err(ConnectError)` - 登録失敗
    pub async fn execute(
        &self,
        identity: Identity,
        channel: PusherChannel,
    ) -> Result<Connection, ConnectError> {
        let connection = Connection::new(ClientId::generate(), identity, Timestamp::now());
        self.registry
            .register(connection.clone(), channel)
            .await?;

        push(
            self.registry.as_ref(),
            &connection.id,
            EnvelopeBody::Connection {
                client_id: connection.id.to_string(),
                message: CONNECTED_MESSAGE.to_string(),
                user: (&connection.identity).into(),
            },
        )
        .await;

        tracing::info!(
            "Client '{}' connected as user '{}'",
            connection.id,
            connection.identity.user_id
        );
        Ok(connection)
    }
}
