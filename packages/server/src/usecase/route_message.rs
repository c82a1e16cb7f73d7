//! UseCase: 受信メッセージの振り分け
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - MessageRouter::route() メソッド
//! - 受信フレームの解析・セッションへの記録・種類ごとの処理への振り分け
//!
//! ### なぜこのテストが必要か
//! - どんな入力でも接続が切られず、エラーエンベロープで応答されることを保証
//! - チャットの中継が接続ごとのタスクとして動き、受信ループを止めないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：ping・chat・feedback・human-escalation
//! - 異常系：JSON でない入力、type の無いオブジェクト、未知の type
//! - エッジケース：エラーの直後に正しいメッセージが届く

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::{
    domain::{ClientId, ConnectionRegistry, GatewayError, Message},
    infrastructure::dto::websocket::{EnvelopeBody, InboundFrame, InboundMessage},
};

use super::{ChatUseCase, EscalationUseCase, FeedbackUseCase, push, push_error};

/// Per-connection state owned by the socket loop.
///
/// Chat relays run in `flows`; dropping the handle aborts every relay that
/// is still in flight.
pub struct ConnectionHandle {
    pub client_id: ClientId,
    flows: JoinSet<()>,
}

impl ConnectionHandle {
    pub fn new(client_id: ClientId) -> Self {
        Self {
            client_id,
            flows: JoinSet::new(),
        }
    }

    /// Number of relays still running
    #[cfg(test)]
    pub fn in_flight(&mut self) -> usize {
        while self.flows.try_join_next().is_some() {}
        self.flows.len()
    }

    /// Wait for every running relay to finish
    #[cfg(test)]
    pub async fn drain(&mut self) {
        while self.flows.join_next().await.is_some() {}
    }

    /// Abort every running relay, returning how many were still running
    pub fn cancel_all(&mut self) -> usize {
        while self.flows.try_join_next().is_some() {}
        let running = self.flows.len();
        self.flows.abort_all();
        running
    }
}

/// What happened to one inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Answered inline (pong, feedback, escalation)
    Handled,
    /// A chat relay was started on the connection's task set
    ChatSpawned,
    /// Rejected with an `error` envelope
    Rejected(GatewayError),
}

/// 受信メッセージの振り分け
pub struct MessageRouter {
    registry: Arc<dyn ConnectionRegistry>,
    chat: Arc<ChatUseCase>,
    feedback: Arc<FeedbackUseCase>,
    escalation: Arc<EscalationUseCase>,
}

impl MessageRouter {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        chat: Arc<ChatUseCase>,
        feedback: Arc<FeedbackUseCase>,
        escalation: Arc<EscalationUseCase>,
    ) -> Self {
        Self {
            registry,
            chat,
            feedback,
            escalation,
        }
    }

    /// テキストフレーム 1 件を処理する
    ///
    /// 1. 最終アクティビティを更新
    /// 2. JSON として解析（失敗したら FORMAT_ERROR）
    /// 3. 解析したフレームをユーザーメッセージとしてセッションに記録
    /// 4. 種類ごとの処理に振り分け
    pub async fn route(&self, handle: &mut ConnectionHandle, raw: &str) -> RouteOutcome {
        let client_id = handle.client_id.clone();
        self.registry.touch(&client_id).await;

        let frame = match serde_json::from_str::<InboundFrame>(raw) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("Malformed frame from client '{}': {}", client_id, e);
                return self.reject(&client_id, GatewayError::Format).await;
            }
        };

        let logged = serde_json::to_string(&frame).unwrap_or_else(|_| raw.to_string());
        if let Err(e) = self
            .registry
            .append_message(&client_id, Message::user(logged, None))
            .await
        {
            tracing::debug!("Frame from '{}' not kept in session: {}", client_id, e);
        }

        let message = match InboundMessage::try_from(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Client '{}' sent {}", client_id, e);
                return self.reject(&client_id, e).await;
            }
        };

        match message {
            InboundMessage::Chat(payload) => match self.chat.prepare(&client_id, payload).await {
                Ok(prepared) => {
                    tracing::info!(
                        "Relaying '{}' for client '{}' ({} mode)",
                        prepared.request.message_id,
                        client_id,
                        if prepared.request.stream {
                            "stream"
                        } else {
                            "unary"
                        }
                    );
                    let chat = self.chat.clone();
                    handle
                        .flows
                        .spawn(async move { chat.relay(prepared).await });
                    RouteOutcome::ChatSpawned
                }
                Err(e) => self.reject(&client_id, e).await,
            },
            InboundMessage::Feedback(payload) => {
                match self.feedback.execute(&client_id, payload).await {
                    Ok(_) => RouteOutcome::Handled,
                    Err(e) => self.reject(&client_id, e).await,
                }
            }
            InboundMessage::HumanEscalation(payload) => {
                match self.escalation.execute(&client_id, payload).await {
                    Ok(_) => RouteOutcome::Handled,
                    Err(e) => self.reject(&client_id, e).await,
                }
            }
            InboundMessage::Ping => {
                push(self.registry.as_ref(), &client_id, EnvelopeBody::Pong).await;
                RouteOutcome::Handled
            }
        }
    }

    /// Refresh activity on a transport-level pong
    pub async fn record_activity(&self, client_id: &ClientId) {
        self.registry.touch(client_id).await;
    }

    async fn reject(&self, client_id: &ClientId, error: GatewayError) -> RouteOutcome {
        push_error(self.registry.as_ref(), client_id, &error).await;
        RouteOutcome::Rejected(error)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        domain::{MessageKind, MockAiBackend, OutboundFrame},
        infrastructure::{
            analytics::InMemoryAnalytics, escalation::InMemoryEscalationStore,
            repository::InMemoryConnectionRegistry,
        },
        usecase::test_support::{drain_envelopes, kinds, registered_client},
    };

    fn create_router(
        registry: Arc<InMemoryConnectionRegistry>,
        backend: MockAiBackend,
    ) -> MessageRouter {
        let analytics = Arc::new(InMemoryAnalytics::new());
        let chat = Arc::new(ChatUseCase::new(
            registry.clone(),
            Arc::new(backend),
            analytics.clone(),
            false,
        ));
        let feedback = Arc::new(FeedbackUseCase::new(registry.clone(), analytics));
        let escalation = Arc::new(EscalationUseCase::new(
            registry.clone(),
            Arc::new(InMemoryEscalationStore::new()),
        ));
        MessageRouter::new(registry, chat, feedback, escalation)
    }

    #[tokio::test]
    async fn test_ping_is_answered_with_pong() {
        // テスト項目: ping に pong で応答し、フレームがセッションに記録される
        // given (前提条件):
        let (registry, client_id, mut rx) = registered_client().await;
        let router = create_router(registry.clone(), MockAiBackend::new());
        let mut handle = ConnectionHandle::new(client_id.clone());

        // when (操作):
        let outcome = router.route(&mut handle, r#"{"type":"ping"}"#).await;

        // then (期待する結果):
        assert_eq!(outcome, RouteOutcome::Handled);
        assert_eq!(kinds(&drain_envelopes(&mut rx)), vec!["pong"]);
        let session = registry.lookup_session(&client_id).await.unwrap();
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].kind, MessageKind::User);
        assert_eq!(session.messages()[0].content, r#"{"type":"ping"}"#);
    }

    #[tokio::test]
    async fn test_malformed_frames_get_format_error_and_connection_survives() {
        // テスト項目: JSON でない入力・type の無いオブジェクトは FORMAT_ERROR になり、
        //             直後の ping には通常どおり応答する
        // given (前提条件):
        let (registry, client_id, mut rx) = registered_client().await;
        let router = create_router(registry.clone(), MockAiBackend::new());
        let mut handle = ConnectionHandle::new(client_id.clone());

        // when (操作):
        let not_json = router.route(&mut handle, "not json").await;
        let no_type = router.route(&mut handle, r#"{"content":"hi"}"#).await;
        let array = router.route(&mut handle, "[1,2]").await;
        let ping = router.route(&mut handle, r#"{"type":"ping"}"#).await;

        // then (期待する結果):
        for outcome in [not_json, no_type, array] {
            assert_eq!(outcome, RouteOutcome::Rejected(GatewayError::Format));
        }
        assert_eq!(ping, RouteOutcome::Handled);

        let envelopes = drain_envelopes(&mut rx);
        assert_eq!(kinds(&envelopes), vec!["error", "error", "error", "pong"]);
        assert_eq!(envelopes[0]["message"], "Invalid message format");
        assert_eq!(envelopes[0]["code"], "FORMAT_ERROR");
        assert!(registry.is_open(&client_id).await);
    }

    #[tokio::test]
    async fn test_unknown_type_is_rejected_but_recorded() {
        // テスト項目: 未知の type は UNKNOWN_MESSAGE_TYPE になるが、フレームは記録される
        // given (前提条件):
        let (registry, client_id, mut rx) = registered_client().await;
        let router = create_router(registry.clone(), MockAiBackend::new());
        let mut handle = ConnectionHandle::new(client_id.clone());

        // when (操作):
        let outcome = router.route(&mut handle, r#"{"type":"dance"}"#).await;

        // then (期待する結果):
        assert_eq!(
            outcome,
            RouteOutcome::Rejected(GatewayError::UnknownMessageType("dance".to_string()))
        );
        let envelopes = drain_envelopes(&mut rx);
        assert_eq!(envelopes[0]["code"], "UNKNOWN_MESSAGE_TYPE");
        assert_eq!(envelopes[0]["message"], "Unknown message type");
        let session = registry.lookup_session(&client_id).await.unwrap();
        assert_eq!(session.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_chat_is_relayed_on_connection_task() {
        // テスト項目: chat はタスクとして中継され、完了後に ai-response が届く
        // given (前提条件):
        let (registry, client_id, mut rx) = registered_client().await;
        let mut backend = MockAiBackend::new();
        backend
            .expect_unary_chat()
            .times(1)
            .returning(|_| Ok(json!({"response": "Hello!"})));
        let router = create_router(registry.clone(), backend);
        let mut handle = ConnectionHandle::new(client_id.clone());

        // when (操作):
        let outcome = router
            .route(&mut handle, r#"{"type":"chat","content":"hi"}"#)
            .await;
        handle.drain().await;

        // then (期待する結果):
        assert_eq!(outcome, RouteOutcome::ChatSpawned);
        assert_eq!(handle.in_flight(), 0);
        let envelopes = drain_envelopes(&mut rx);
        assert_eq!(kinds(&envelopes), vec!["typing", "ai-response", "typing"]);

        // 受信フレーム・ID 付きの質問・回答の 3 件が記録される
        let session = registry.lookup_session(&client_id).await.unwrap();
        let kinds: Vec<_> = session.messages().iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![MessageKind::User, MessageKind::User, MessageKind::Assistant]
        );
    }

    #[tokio::test]
    async fn test_invalid_chat_is_rejected_inline() {
        // テスト項目: 空の chat はタスクを起動せず VALIDATION_ERROR になる
        // given (前提条件):
        let (registry, client_id, mut rx) = registered_client().await;
        let mut backend = MockAiBackend::new();
        backend.expect_unary_chat().never();
        let router = create_router(registry.clone(), backend);
        let mut handle = ConnectionHandle::new(client_id.clone());

        // when (操作):
        let outcome = router
            .route(&mut handle, r#"{"type":"chat","content":"   "}"#)
            .await;

        // then (期待する結果):
        assert!(matches!(outcome, RouteOutcome::Rejected(GatewayError::Validation(_))));
        assert_eq!(handle.in_flight(), 0);
        let envelopes = drain_envelopes(&mut rx);
        assert_eq!(envelopes[0]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_cancel_all_aborts_running_relays() {
        // テスト項目: 接続終了時に実行中の中継タスクが中断される
        // given (前提条件):
        let (registry, client_id, mut rx) = registered_client().await;
        let mut backend = MockAiBackend::new();
        backend.expect_stream_chat().returning(|_| {
            use futures_util::StreamExt;
            Ok(futures_util::stream::pending().boxed())
        });
        let router = create_router(registry.clone(), backend);
        let mut handle = ConnectionHandle::new(client_id.clone());
        router
            .route(
                &mut handle,
                r#"{"type":"chat","content":"hi","stream":true}"#,
            )
            .await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(handle.in_flight(), 1);

        // when (操作):
        let cancelled = handle.cancel_all();
        handle.drain().await;

        // then (期待する結果): stream-start の後、それ以上は何も届かない
        assert_eq!(cancelled, 1);
        assert_eq!(handle.in_flight(), 0);
        assert_eq!(handle.cancel_all(), 0);
        let frames: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(frames.len(), 1);
        assert!(matches!(&frames[0], OutboundFrame::Text(text) if text.contains("stream-start")));
    }

    #[tokio::test]
    async fn test_feedback_and_escalation_are_dispatched() {
        // テスト項目: feedback と human-escalation がそれぞれの処理に振り分けられる
        // given (前提条件):
        let (registry, client_id, mut rx) = registered_client().await;
        let router = create_router(registry.clone(), MockAiBackend::new());
        let mut handle = ConnectionHandle::new(client_id.clone());

        // when (操作):
        let feedback = router
            .route(
                &mut handle,
                r#"{"type":"feedback","messageId":"msg_1_unknown","feedbackType":"positive"}"#,
            )
            .await;
        let escalation = router
            .route(&mut handle, r#"{"type":"human-escalation"}"#)
            .await;

        // then (期待する結果): 未知の messageId への feedback は記録失敗として通知される
        assert!(matches!(feedback, RouteOutcome::Rejected(GatewayError::Collaborator(_))));
        assert_eq!(escalation, RouteOutcome::Handled);
        let envelopes = drain_envelopes(&mut rx);
        assert_eq!(kinds(&envelopes), vec!["error", "human-escalation-response"]);
        assert_eq!(envelopes[0]["message"], "Failed to record feedback");
    }
}
