//! 消息路由
//!
//! 接收出站消息，先持久化、再推送给在线接收方，最后给发送方
//! 返回投递确认。送达快照在发送时刻采集；离线接收方依赖之后的
//! 已读确认补齐。同一发送方的消息按提交顺序依次处理（连接的
//! 接收循环天然串行），不同发送方之间不保证全局顺序。

use std::sync::Arc;

use domain::{
    ChatTarget, DomainError, GroupId, Message, MessageBody, MessageId, UserId,
};
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::ApplicationError,
    events::ServerEvent,
    presence::PresenceRegistry,
    repository::{ChatRef, GroupRepository, MessageRepository},
};

#[derive(Debug, Clone)]
pub struct SendPrivateRequest {
    pub sender_id: Uuid,
    pub to: Uuid,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct SendGroupRequest {
    pub sender_id: Uuid,
    pub group_id: Uuid,
    pub body: String,
}

/// 删除方式：只对自己隐藏，或发送方撤回所有人的副本。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    Me,
    Everyone,
}

#[derive(Debug, Clone)]
pub struct DeleteMessageRequest {
    pub msg_id: Uuid,
    pub user_id: Uuid,
    pub mode: DeleteMode,
}

#[derive(Debug, Clone)]
pub struct HistoryRequest {
    pub requester_id: Uuid,
    pub chat_id: Uuid,
    pub is_group: bool,
}

#[derive(Debug, Clone)]
pub struct ClearChatRequest {
    pub user_id: Uuid,
    pub chat_id: Uuid,
    pub is_group: bool,
}

/// 发送结果：落库后的消息加上发送时刻的在线标志。
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub message: Message,
    pub delivered: bool,
}

pub struct MessageServiceDependencies {
    pub message_repository: Arc<dyn MessageRepository>,
    pub group_repository: Arc<dyn GroupRepository>,
    pub presence: Arc<PresenceRegistry>,
    pub clock: Arc<dyn Clock>,
}

pub struct MessageService {
    deps: MessageServiceDependencies,
}

impl MessageService {
    pub fn new(deps: MessageServiceDependencies) -> Self {
        Self { deps }
    }

    fn chat_ref(requester: UserId, chat_id: Uuid, is_group: bool) -> ChatRef {
        if is_group {
            ChatRef::Group(GroupId::from(chat_id))
        } else {
            ChatRef::Private {
                a: UserId::from(chat_id),
                b: requester,
            }
        }
    }

    /// 发送私聊消息。接收方在线则送达集合立即包含对方，
    /// 并把落库后的消息推给对方连接。
    pub async fn send_private(
        &self,
        request: SendPrivateRequest,
    ) -> Result<SendOutcome, ApplicationError> {
        let sender_id = UserId::from(request.sender_id);
        let recipient_id = UserId::from(request.to);
        let body = MessageBody::new(request.body)?;

        // 发送时刻的在线快照，决定送达标记和确认标志
        let recipient_online = self.deps.presence.is_online(recipient_id).await;

        let mut message = Message::new(
            MessageId::from(Uuid::new_v4()),
            sender_id,
            ChatTarget::User(recipient_id),
            body,
            self.deps.clock.now(),
        );
        if recipient_online {
            message.mark_delivered(recipient_id);
        }

        // 先持久化，再推送：被动接收方只会看到已提交的状态
        let stored = self.deps.message_repository.append(message).await?;

        if recipient_online
            && !self
                .deps
                .presence
                .send_to(
                    recipient_id,
                    ServerEvent::ReceivePrivateMessage {
                        message: stored.clone(),
                    },
                )
                .await
        {
            // 连接在落库与推送之间断开：消息已保存，等待对方拉取
            tracing::debug!(
                message_id = %stored.id,
                recipient = %recipient_id,
                "接收方连接在推送前断开"
            );
        }

        Ok(SendOutcome {
            message: stored,
            delivered: recipient_online,
        })
    }

    /// 发送群聊消息。送达集合取发送时刻在线成员快照（不含发送者），
    /// 随后推送给每个在线成员。
    pub async fn send_group(
        &self,
        request: SendGroupRequest,
    ) -> Result<SendOutcome, ApplicationError> {
        let sender_id = UserId::from(request.sender_id);
        let group_id = GroupId::from(request.group_id);
        let body = MessageBody::new(request.body)?;

        let group = self
            .deps
            .group_repository
            .find_by_id(group_id)
            .await?
            .ok_or(DomainError::GroupNotFound)?;

        if !group.is_member(sender_id) {
            return Err(DomainError::NotGroupMember.into());
        }

        let mut online_members = Vec::new();
        for member in group.members.iter().copied() {
            if member != sender_id && self.deps.presence.is_online(member).await {
                online_members.push(member);
            }
        }

        let mut message = Message::new(
            MessageId::from(Uuid::new_v4()),
            sender_id,
            ChatTarget::Group(group_id),
            body,
            self.deps.clock.now(),
        );
        for member in online_members.iter().copied() {
            message.mark_delivered(member);
        }

        let stored = self.deps.message_repository.append(message).await?;

        for member in online_members.iter().copied() {
            self.deps
                .presence
                .send_to(
                    member,
                    ServerEvent::ReceiveGroupMessage {
                        message: stored.clone(),
                    },
                )
                .await;
        }

        Ok(SendOutcome {
            message: stored,
            delivered: !online_members.is_empty(),
        })
    }

    /// 删除消息。`Me` 只打软删除标记；`Everyone` 仅发送方可用，
    /// 从日志中彻底移除并向先前的接收方推送撤回事件。
    pub async fn delete_message(
        &self,
        request: DeleteMessageRequest,
    ) -> Result<(), ApplicationError> {
        let user_id = UserId::from(request.user_id);
        let msg_id = MessageId::from(request.msg_id);

        let message = self
            .deps
            .message_repository
            .find_by_id(msg_id)
            .await?
            .ok_or(DomainError::MessageNotFound)?;

        match request.mode {
            DeleteMode::Me => {
                self.deps
                    .message_repository
                    .add_deleted_for(msg_id, user_id)
                    .await?;
                Ok(())
            }
            DeleteMode::Everyone => {
                if message.sender_id != user_id {
                    return Err(DomainError::NotMessageSender.into());
                }

                self.deps.message_repository.delete_by_id(msg_id).await?;

                let retraction = ServerEvent::MessageDeleted { msg_id };
                match message.target {
                    ChatTarget::Group(group_id) => {
                        // 群可能已在消息之后被解散，此时没有可通知的成员
                        if let Some(group) =
                            self.deps.group_repository.find_by_id(group_id).await?
                        {
                            for member in group.members.iter().copied() {
                                self.deps
                                    .presence
                                    .send_to(member, retraction.clone())
                                    .await;
                            }
                        }
                    }
                    ChatTarget::User(recipient_id) => {
                        self.deps
                            .presence
                            .send_to(recipient_id, retraction.clone())
                            .await;
                        self.deps.presence.send_to(user_id, retraction).await;
                    }
                }
                Ok(())
            }
        }
    }

    /// 会话历史，排除请求者已删除的条目。
    pub async fn history(&self, request: HistoryRequest) -> Result<Vec<Message>, ApplicationError> {
        let requester = UserId::from(request.requester_id);
        let chat = Self::chat_ref(requester, request.chat_id, request.is_group);
        let messages = self
            .deps
            .message_repository
            .list_for_chat(chat, requester)
            .await?;
        Ok(messages)
    }

    /// 清空聊天记录：会话内所有消息对该用户打软删除标记。
    pub async fn clear_chat(&self, request: ClearChatRequest) -> Result<(), ApplicationError> {
        let user = UserId::from(request.user_id);
        let chat = Self::chat_ref(user, request.chat_id, request.is_group);
        self.deps
            .message_repository
            .mark_chat_deleted_for(chat, user)
            .await?;
        Ok(())
    }
}
