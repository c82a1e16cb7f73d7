//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{Connection, OutboundFrame},
    ui::state::AppState,
    usecase::{ConnectError, ConnectionHandle},
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

/// Token from an `Authorization: Bearer <token>` header
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim().to_string())
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    if !state.coordinator.is_accepting() {
        tracing::warn!("Rejecting WebSocket handshake: shutting down");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    // The query parameter wins over the header
    let credential = query.token.or_else(|| bearer_token(&headers));
    let identity = match state
        .connect_client_usecase
        .authenticate(credential.as_deref())
        .await
    {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!("Rejecting WebSocket handshake: {}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    // Create a channel for this client to receive messages
    let (tx, rx) = mpsc::unbounded_channel();

    // Registration queues the `connection` envelope ahead of everything else
    match state.connect_client_usecase.execute(identity, tx).await {
        Ok(connection) => {
            Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, connection, rx)))
        }
        Err(ConnectError::Registry(e)) => {
            tracing::error!("Failed to register client: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
        Err(ConnectError::Unauthorized(e)) => {
            tracing::warn!("Rejecting WebSocket handshake: {}", e);
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// Spawns a task that drains the client's channel into its WebSocket sink.
///
/// Ends after forwarding a close request or when the socket stops accepting
/// writes; the receiver is dropped with it, which marks the client's
/// transport as closed in the registry.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<OutboundFrame>,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let sent = match frame {
                OutboundFrame::Text(text) => sender.send(Message::Text(text.into())).await,
                OutboundFrame::Ping => sender.send(Message::Ping(Bytes::new())).await,
                OutboundFrame::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            };
            if sent.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    connection: Connection,
    rx: mpsc::UnboundedReceiver<OutboundFrame>,
) {
    let client_id = connection.id;
    let (sender, mut receiver) = socket.split();

    // Spawn a task to push queued frames to this client
    let mut send_task = pusher_loop(rx, sender);

    // Spawn a task to receive messages from this client
    let router = state.message_router.clone();
    let mut handle = ConnectionHandle::new(client_id.clone());
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!("WebSocket error from '{}': {}", handle.client_id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    tracing::debug!("Received from '{}': {}", handle.client_id, text.as_str());
                    router.route(&mut handle, text.as_str()).await;
                }
                Message::Pong(_) => {
                    router.record_activity(&handle.client_id).await;
                }
                Message::Ping(_) => {
                    // Answered by the WebSocket layer
                    tracing::debug!("Received ping from '{}'", handle.client_id);
                }
                Message::Binary(_) => {
                    tracing::debug!("Ignoring binary frame from '{}'", handle.client_id);
                }
                Message::Close(_) => {
                    tracing::info!("Client '{}' requested close", handle.client_id);
                    break;
                }
            }
        }
        let cancelled = handle.cancel_all();
        if cancelled > 0 {
            tracing::debug!(
                "Cancelled {} in-flight relay(s) of '{}'",
                cancelled,
                handle.client_id
            );
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    state.disconnect_client_usecase.execute(&client_id).await;
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_bearer_token_extraction() {
        // テスト項目: Authorization ヘッダーから Bearer トークンを取り出す
        // given (前提条件):
        let mut bearer = HeaderMap::new();
        bearer.insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
        let mut lowercase = HeaderMap::new();
        lowercase.insert(AUTHORIZATION, HeaderValue::from_static("bearer  secret "));
        let mut basic = HeaderMap::new();
        basic.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));

        // then (期待する結果):
        assert_eq!(bearer_token(&bearer), Some("secret".to_string()));
        assert_eq!(bearer_token(&lowercase), Some("secret".to_string()));
        assert_eq!(bearer_token(&basic), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
