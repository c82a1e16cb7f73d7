//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{AuthError, RegistryError};

/// 接続処理のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// 認証情報が無い・無効
    #[error("unauthorized: {0}")]
    Unauthorized(AuthError),

    /// レジストリへの登録に失敗（ClientId の衝突）
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
