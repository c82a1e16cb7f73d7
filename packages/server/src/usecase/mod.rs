//! UseCase 層
//!
//! WebSocket・HTTP の各ハンドラから呼ばれるアプリケーションロジック。
//! 外部とのやり取りは Domain 層の trait（ConnectionRegistry, AiBackend など）越しに行う。

pub mod chat;
pub mod connect_client;
pub mod disconnect_client;
pub mod error;
pub mod escalation;
pub mod feedback;
pub mod heartbeat;
pub mod route_message;
pub mod session_query;
pub mod shutdown;

pub use chat::{ChatUseCase, PreparedChat};
pub use connect_client::{CONNECTED_MESSAGE, ConnectClientUseCase};
pub use disconnect_client::DisconnectClientUseCase;
pub use error::ConnectError;
pub use escalation::{DEFAULT_ESCALATION_REASON, ESCALATION_ACK_MESSAGE, EscalationUseCase};
pub use feedback::{FEEDBACK_FAILED_MESSAGE, FeedbackUseCase};
pub use heartbeat::HeartbeatMonitor;
pub use route_message::{ConnectionHandle, MessageRouter, RouteOutcome};
pub use session_query::SessionQueryUseCase;
pub use shutdown::{ShutdownCoordinator, ShutdownReport};

use crate::{
    domain::{ClientId, ConnectionRegistry, GatewayError},
    infrastructure::dto::websocket::{Envelope, EnvelopeBody},
};

/// Serialize and queue an envelope for one client.
///
/// Returns `false` when the client is gone; callers treat that as a no-op.
pub(crate) async fn push(
    registry: &dyn ConnectionRegistry,
    client_id: &ClientId,
    body: EnvelopeBody,
) -> bool {
    registry
        .send(client_id, Envelope::new(body).to_json())
        .await
}

/// Queue an `error` envelope describing `error`
pub(crate) async fn push_error(
    registry: &dyn ConnectionRegistry,
    client_id: &ClientId,
    error: &GatewayError,
) -> bool {
    let envelope = Envelope::error(error.user_message(), error.code());
    registry.send(client_id, envelope.to_json()).await
}

/// Error for flows that outlive their connection
pub(crate) fn unregistered(client_id: &ClientId) -> GatewayError {
    GatewayError::Validation(format!("client '{}' is not connected", client_id))
}
