//! UseCase: AI チャット処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ChatUseCase::prepare()（入力検証・MessageId 払い出し・セッション追記）
//! - ChatUseCase::relay()（一括応答モードとストリーミングモードの中継）
//!
//! ### なぜこのテストが必要か
//! - 不正な質問がバックエンドに一切送られないことを保証
//! - stream-start / stream-end の括弧が常に対になることを確認
//! - バックエンド障害がエラーエンベロープとしてクライアントに届くことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：一括応答・分割されたチャンクのストリーミング
//! - 異常系：接続拒否・不正な応答形式・ストリーム途中の切断
//! - エッジケース：クライアントが途中で切断、終わらないストリーム

use std::sync::Arc;

use crate::{
    domain::{
        AiBackend, Analytics, ChatQuery, ChatRequest, ClientId, ConnectionRegistry, GatewayError,
        HistoryTurn, Message, MessageId, PusherChannel, QuestionRecord, StreamEvent, Timestamp,
        TokenEventStream,
    },
    infrastructure::dto::{
        http::UnaryReplyDto,
        websocket::{ChatPayload, EnvelopeBody},
    },
};

use super::{push, push_error, unregistered};

/// A validated question, ready to be relayed to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedChat {
    pub client_id: ClientId,
    pub request: ChatRequest,
    pub asked_at: Timestamp,
}

/// AI チャットのユースケース
pub struct ChatUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    backend: Arc<dyn AiBackend>,
    analytics: Arc<dyn Analytics>,
    /// Relay mode used when a `chat` frame carries no `stream` flag
    default_stream: bool,
}

impl ChatUseCase {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        backend: Arc<dyn AiBackend>,
        analytics: Arc<dyn Analytics>,
        default_stream: bool,
    ) -> Self {
        Self {
            registry,
            backend,
            analytics,
            default_stream,
        }
    }

    /// 質問を検証し、バックエンドへのリクエストを組み立てる
    ///
    /// 検証に通った場合のみ MessageId を払い出し、その ID 付きの質問をセッションに追記する。
    /// 検証エラーの時点ではバックエンドも Analytics も呼ばれない。
    pub async fn prepare(
        &self,
        client_id: &ClientId,
        payload: ChatPayload,
    ) -> Result<PreparedChat, GatewayError> {
        let query = ChatQuery::new(payload.query.as_deref().unwrap_or_default())?;

        let connection = self
            .registry
            .connection(client_id)
            .await
            .ok_or_else(|| unregistered(client_id))?;
        let history = self
            .registry
            .lookup_session(client_id)
            .await
            .map(|session| {
                session
                    .conversation_history()
                    .map(|message| HistoryTurn {
                        kind: message.kind,
                        content: message.content.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let message_id = MessageId::generate();
        self.registry
            .append_message(
                client_id,
                Message::user(query.as_str(), Some(message_id.clone())),
            )
            .await
            .map_err(|_| unregistered(client_id))?;

        Ok(PreparedChat {
            client_id: client_id.clone(),
            request: ChatRequest {
                query: query.as_str().to_string(),
                user_id: connection.identity.user_id,
                username: connection.identity.username,
                session_id: client_id.clone(),
                message_id,
                stream: payload.stream.unwrap_or(self.default_stream),
                history,
            },
            asked_at: Timestamp::now(),
        })
    }

    /// 準備済みの質問をバックエンドに中継し、応答をクライアントに届ける
    ///
    /// 失敗はすべて `error` エンベロープとしてクライアントに通知し、呼び出し元には返さない。
    pub async fn relay(&self, prepared: PreparedChat) {
        self.record_question(&prepared).await;

        let Some(channel) = self.registry.channel(&prepared.client_id).await else {
            tracing::debug!(
                "Client '{}' left before '{}' was relayed",
                prepared.client_id,
                prepared.request.message_id
            );
            return;
        };

        if prepared.request.stream {
            self.relay_stream(&prepared, &channel).await;
        } else {
            self.relay_unary(&prepared, &channel).await;
        }
    }

    async fn relay_unary(&self, prepared: &PreparedChat, channel: &PusherChannel) {
        let client_id = &prepared.client_id;
        let message_id = &prepared.request.message_id;

        push(
            self.registry.as_ref(),
            client_id,
            EnvelopeBody::Typing { is_typing: true },
        )
        .await;

        let reply = tokio::select! {
            _ = channel.closed() => {
                tracing::info!("Client '{}' went away, dropping '{}'", client_id, message_id);
                return;
            }
            reply = self.backend.unary_chat(&prepared.request) => reply,
        };

        match reply
            .map_err(GatewayError::from)
            .and_then(UnaryReplyDto::try_from)
        {
            Ok(reply) => {
                push(
                    self.registry.as_ref(),
                    client_id,
                    EnvelopeBody::AiResponse {
                        message_id: message_id.to_string(),
                        content: reply.response.clone(),
                        patient_context: reply.patient_context,
                        upstream_timestamp: reply.timestamp,
                    },
                )
                .await;
                self.record_answer(prepared, &reply.response).await;
            }
            Err(e) => {
                tracing::warn!("Chat '{}' for client '{}' failed: {}", message_id, client_id, e);
                push_error(self.registry.as_ref(), client_id, &e).await;
            }
        }

        push(
            self.registry.as_ref(),
            client_id,
            EnvelopeBody::Typing { is_typing: false },
        )
        .await;
    }

    async fn relay_stream(&self, prepared: &PreparedChat, channel: &PusherChannel) {
        let client_id = &prepared.client_id;
        let message_id = &prepared.request.message_id;

        let bytes = tokio::select! {
            _ = channel.closed() => {
                tracing::info!("Client '{}' went away, dropping '{}'", client_id, message_id);
                return;
            }
            bytes = self.backend.stream_chat(&prepared.request) => bytes,
        };
        let bytes = match bytes {
            Ok(bytes) => bytes,
            Err(e) => {
                let error = GatewayError::from(e);
                tracing::warn!("Stream '{}' for client '{}' failed: {}", message_id, client_id, error);
                push_error(self.registry.as_ref(), client_id, &error).await;
                return;
            }
        };

        push(
            self.registry.as_ref(),
            client_id,
            EnvelopeBody::StreamStart {
                message_id: message_id.to_string(),
            },
        )
        .await;

        let mut events = TokenEventStream::new(bytes);
        let mut answer = String::new();
        let mut cancelled = false;
        loop {
            if !self.registry.is_open(client_id).await {
                cancelled = true;
                break;
            }
            let event = tokio::select! {
                _ = channel.closed() => {
                    cancelled = true;
                    break;
                }
                event = events.next() => event,
            };

            match event {
                StreamEvent::Token(token) => {
                    answer.push_str(&token);
                    push(
                        self.registry.as_ref(),
                        client_id,
                        EnvelopeBody::StreamToken {
                            message_id: message_id.to_string(),
                            content: token,
                        },
                    )
                    .await;
                }
                StreamEvent::Sentinel => {
                    tracing::debug!("Stream '{}' reached its end-of-stream marker", message_id);
                }
                StreamEvent::Error(e) => {
                    let error = GatewayError::from(e);
                    tracing::warn!("Stream '{}' broke off: {}", message_id, error);
                    push_error(self.registry.as_ref(), client_id, &error).await;
                }
                StreamEvent::End => break,
            }
        }

        push(
            self.registry.as_ref(),
            client_id,
            EnvelopeBody::StreamEnd {
                message_id: message_id.to_string(),
            },
        )
        .await;

        if cancelled {
            // A truncated answer is never recorded as if it were complete
            tracing::info!("Client '{}' went away, cancelled stream '{}'", client_id, message_id);
        } else if !answer.is_empty() {
            self.record_answer(prepared, &answer).await;
        }
    }

    async fn record_question(&self, prepared: &PreparedChat) {
        let record = QuestionRecord {
            message_id: prepared.request.message_id.clone(),
            client_id: prepared.client_id.clone(),
            user_id: prepared.request.user_id.clone(),
            question: prepared.request.query.clone(),
            asked_at: prepared.asked_at,
        };
        if let Err(e) = self.analytics.store_question(record).await {
            tracing::warn!(
                "Failed to store question '{}': {}",
                prepared.request.message_id,
                e
            );
        }
    }

    /// Append the answer to the session and hand it to analytics
    async fn record_answer(&self, prepared: &PreparedChat, answer: &str) {
        let message_id = &prepared.request.message_id;
        if let Err(e) = self
            .registry
            .append_message(
                &prepared.client_id,
                Message::assistant(answer, message_id.clone()),
            )
            .await
        {
            tracing::debug!("Answer '{}' not kept in session: {}", message_id, e);
        }
        if let Err(e) = self.analytics.update_ai_response(message_id, answer).await {
            tracing::warn!("Failed to record answer '{}': {}", message_id, e);
        }
    }
}
