//! WebSocket 升级与客户端事件分发
//!
//! 升级请求用 `?token=` 携带 JWT 完成登录握手；之后的客户端帧
//! 解析成 `ClientEvent`，经固定的分发表路由到各个服务。每个
//! 处理分支拿到的都是连接认证时确定的用户 id，不信任帧里自报
//! 的发送者。

use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::Response,
};
use serde::Deserialize;
use uuid::Uuid;

use application::services::{
    AcceptCallRequest, InitiateCallRequest, MarkReadRequest, SendGroupRequest, SendPrivateRequest,
    SetReactionRequest, TerminateCallRequest,
};
use application::{ApplicationError, ServerEvent};
use domain::{DomainError, UserId};

use crate::state::AppState;
use crate::ws_connection::ClientConnection;

/// WebSocket 连接查询参数
#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    /// JWT access token
    pub token: String,
}

/// 客户端 → 服务端事件。呼叫信令沿用原有协议的驼峰事件名。
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "private_message")]
    PrivateMessage { to: Uuid, message: String },

    #[serde(rename = "group_message")]
    GroupMessage { group_id: Uuid, message: String },

    #[serde(rename = "mark_read")]
    MarkRead { chat_id: Uuid, is_group: bool },

    #[serde(rename = "add_reaction")]
    AddReaction { msg_id: Uuid, emoji: String },

    #[serde(rename = "callUser")]
    CallUser {
        user_to_call: Uuid,
        signal_data: serde_json::Value,
        name: String,
    },

    #[serde(rename = "answerCall")]
    AnswerCall {
        to: Uuid,
        signal: serde_json::Value,
    },

    #[serde(rename = "endCall")]
    EndCall { to: Uuid },

    #[serde(rename = "group_updated")]
    GroupUpdated { group_id: Uuid },
}

/// 处理 WebSocket 升级：验证 token 后把连接交给 `ClientConnection`。
pub async fn websocket_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WebSocketQuery>,
) -> Result<Response, StatusCode> {
    if query.token.is_empty() {
        tracing::warn!("WebSocket upgrade failed: empty token");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user_id = match state.jwt_service.verify_token(&query.token) {
        Ok(claims) => claims.user_id,
        Err(_) => {
            tracing::warn!("WebSocket upgrade failed: invalid token");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    Ok(ws.on_upgrade(move |socket| ClientConnection::new(socket, state, user_id).run()))
}

/// 客户端事件分发表。
///
/// 出错策略遵循协议语义：发起方要么收到成功确认、要么收到失败，
/// 而"目标不存在"类错误保持线上观察到的静默丢弃行为；被动接收方
/// 永远只看到已提交的状态。
pub async fn dispatch_client_event(state: &AppState, user_id: UserId, raw: &str) {
    let event = match serde_json::from_str::<ClientEvent>(raw) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(user_id = %user_id, error = %err, "无法解析客户端事件");
            return;
        }
    };

    match event {
        ClientEvent::PrivateMessage { to, message } => {
            match state
                .message_service
                .send_private(SendPrivateRequest {
                    sender_id: user_id.into(),
                    to,
                    body: message,
                })
                .await
            {
                Ok(outcome) => {
                    state
                        .presence
                        .send_to(
                            user_id,
                            ServerEvent::MessageSentAck {
                                msg_id: outcome.message.id,
                                delivered: outcome.delivered,
                            },
                        )
                        .await;
                }
                Err(err) => {
                    tracing::warn!(user_id = %user_id, error = %err, "私聊消息发送失败");
                }
            }
        }
        ClientEvent::GroupMessage { group_id, message } => {
            match state
                .message_service
                .send_group(SendGroupRequest {
                    sender_id: user_id.into(),
                    group_id,
                    body: message,
                })
                .await
            {
                Ok(outcome) => {
                    state
                        .presence
                        .send_to(
                            user_id,
                            ServerEvent::MessageSentAck {
                                msg_id: outcome.message.id,
                                delivered: outcome.delivered,
                            },
                        )
                        .await;
                }
                // 群不存在：静默丢弃，不给发送方任何确认
                Err(ApplicationError::Domain(DomainError::GroupNotFound)) => {
                    tracing::debug!(user_id = %user_id, group_id = %group_id, "目标群不存在，消息丢弃");
                }
                Err(err) => {
                    tracing::warn!(user_id = %user_id, error = %err, "群聊消息发送失败");
                }
            }
        }
        ClientEvent::MarkRead { chat_id, is_group } => {
            if let Err(err) = state
                .receipt_service
                .mark_read(MarkReadRequest {
                    reader_id: user_id.into(),
                    chat_id,
                    is_group,
                })
                .await
            {
                tracing::debug!(user_id = %user_id, error = %err, "标记已读失败");
            }
        }
        ClientEvent::AddReaction { msg_id, emoji } => {
            if let Err(err) = state
                .reaction_service
                .set_reaction(SetReactionRequest {
                    user_id: user_id.into(),
                    msg_id,
                    emoji,
                })
                .await
            {
                tracing::debug!(user_id = %user_id, error = %err, "更新回应失败");
            }
        }
        ClientEvent::CallUser {
            user_to_call,
            signal_data,
            name,
        } => {
            if let Err(err) = state
                .call_service
                .initiate(InitiateCallRequest {
                    caller_id: user_id.into(),
                    callee_id: user_to_call,
                    caller_name: name,
                    offer: signal_data,
                })
                .await
            {
                tracing::warn!(user_id = %user_id, error = %err, "呼叫转发失败");
            }
        }
        ClientEvent::AnswerCall { to, signal } => {
            if let Err(err) = state
                .call_service
                .accept(AcceptCallRequest {
                    callee_id: user_id.into(),
                    caller_id: to,
                    answer: signal,
                })
                .await
            {
                tracing::warn!(user_id = %user_id, error = %err, "接听转发失败");
            }
        }
        ClientEvent::EndCall { to } => {
            if let Err(err) = state
                .call_service
                .terminate(TerminateCallRequest {
                    from_id: user_id.into(),
                    to_id: to,
                })
                .await
            {
                tracing::warn!(user_id = %user_id, error = %err, "挂断转发失败");
            }
        }
        ClientEvent::GroupUpdated { group_id } => {
            if let Err(err) = state
                .group_service
                .relay_group_updated(group_id, user_id.into())
                .await
            {
                tracing::debug!(user_id = %user_id, error = %err, "群资料更新转发失败");
            }
        }
    }
}
