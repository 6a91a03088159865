//! 表情回应协调
//!
//! 每用户每消息至多一条回应：没有则添加、同表情则取消、
//! 不同表情则替换。变更在存储层原子完成，然后把重算后的
//! 完整回应集合广播给会话的所有在线参与者——广播全量而非
//! 增量，晚到的观察者也能看到一致状态。

use std::sync::Arc;

use domain::{ChatTarget, Emoji, MessageId, UserId};
use uuid::Uuid;

use crate::{
    error::ApplicationError,
    events::ServerEvent,
    presence::PresenceRegistry,
    repository::{GroupRepository, MessageRepository},
};

#[derive(Debug, Clone)]
pub struct SetReactionRequest {
    pub user_id: Uuid,
    pub msg_id: Uuid,
    pub emoji: String,
}

pub struct ReactionServiceDependencies {
    pub message_repository: Arc<dyn MessageRepository>,
    pub group_repository: Arc<dyn GroupRepository>,
    pub presence: Arc<PresenceRegistry>,
}

pub struct ReactionService {
    deps: ReactionServiceDependencies,
}

impl ReactionService {
    pub fn new(deps: ReactionServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn set_reaction(&self, request: SetReactionRequest) -> Result<(), ApplicationError> {
        let user_id = UserId::from(request.user_id);
        let msg_id = MessageId::from(request.msg_id);
        let emoji = Emoji::parse(request.emoji)?;

        let updated = self
            .deps
            .message_repository
            .toggle_reaction(msg_id, user_id, emoji)
            .await?;

        let Some(message) = updated else {
            // 消息刚好被彻底删除：静默忽略
            tracing::debug!(msg_id = %msg_id, "回应目标消息不存在");
            return Ok(());
        };

        let event = ServerEvent::ReactionUpdated {
            msg_id,
            reactions: message.reactions.clone(),
        };

        match message.target {
            ChatTarget::Group(group_id) => {
                if let Some(group) = self.deps.group_repository.find_by_id(group_id).await? {
                    for member in group.members.iter().copied() {
                        self.deps.presence.send_to(member, event.clone()).await;
                    }
                }
            }
            ChatTarget::User(recipient_id) => {
                self.deps
                    .presence
                    .send_to(recipient_id, event.clone())
                    .await;
                self.deps.presence.send_to(message.sender_id, event).await;
            }
        }

        Ok(())
    }
}
