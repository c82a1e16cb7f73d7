//! Server state shared by every handler.

use std::sync::Arc;

use crate::usecase::{
    ConnectClientUseCase, DisconnectClientUseCase, MessageRouter, SessionQueryUseCase,
    ShutdownCoordinator,
};

/// Shared application state
pub struct AppState {
    /// ConnectClientUseCase（認証とクライアント登録）
    pub connect_client_usecase: Arc<ConnectClientUseCase>,
    /// DisconnectClientUseCase（クライアント切断）
    pub disconnect_client_usecase: Arc<DisconnectClientUseCase>,
    /// MessageRouter（受信メッセージの振り分け）
    pub message_router: Arc<MessageRouter>,
    /// SessionQueryUseCase（セッション・接続数の参照）
    pub session_query_usecase: Arc<SessionQueryUseCase>,
    /// ShutdownCoordinator（受付可否とシャットダウン）
    pub coordinator: Arc<ShutdownCoordinator>,
}
