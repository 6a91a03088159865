//! 已读/送达聚合
//!
//! 读者打开会话时一次性补齐该会话所有未读消息的回执：
//! 已读蕴含已送达，两个集合只增不减。操作幂等，重复调用
//! 不再改变状态。状态指示（sent/delivered/read）不落库，
//! 由 `Message::status` 在展示时计算。

use std::sync::Arc;

use domain::{DomainError, GroupId, UserId};
use uuid::Uuid;

use crate::{
    error::ApplicationError,
    events::ServerEvent,
    presence::PresenceRegistry,
    repository::{ChatRef, GroupRepository, MessageRepository},
};

#[derive(Debug, Clone)]
pub struct MarkReadRequest {
    pub reader_id: Uuid,
    pub chat_id: Uuid,
    pub is_group: bool,
}

pub struct ReceiptServiceDependencies {
    pub message_repository: Arc<dyn MessageRepository>,
    pub group_repository: Arc<dyn GroupRepository>,
    pub presence: Arc<PresenceRegistry>,
}

pub struct ReceiptService {
    deps: ReceiptServiceDependencies,
}

impl ReceiptService {
    pub fn new(deps: ReceiptServiceDependencies) -> Self {
        Self { deps }
    }

    /// 标记会话为已读，并把新的已读状态通知给相关的在线连接，
    /// 好让发送方刷新状态指示。
    pub async fn mark_read(&self, request: MarkReadRequest) -> Result<(), ApplicationError> {
        let reader = UserId::from(request.reader_id);

        if request.is_group {
            let group_id = GroupId::from(request.chat_id);
            let group = self
                .deps
                .group_repository
                .find_by_id(group_id)
                .await?
                .ok_or(DomainError::GroupNotFound)?;

            if !group.is_member(reader) {
                return Err(DomainError::NotGroupMember.into());
            }

            self.deps
                .message_repository
                .mark_chat_read(ChatRef::Group(group_id), reader)
                .await?;

            // 推给所有在线成员，各自的发送方视角据此重算状态
            let event = ServerEvent::GroupReadUpdate {
                chat_id: group_id,
                reader,
            };
            for member in group.members.iter().copied() {
                self.deps.presence.send_to(member, event.clone()).await;
            }
        } else {
            let peer = UserId::from(request.chat_id);

            self.deps
                .message_repository
                .mark_chat_read(ChatRef::Private { a: peer, b: reader }, reader)
                .await?;

            // 对端是这些消息的发送方；读者一侧的会话以自己的 id 标识
            self.deps
                .presence
                .send_to(
                    peer,
                    ServerEvent::PrivateReadUpdate {
                        chat_id: reader,
                        reader,
                    },
                )
                .await;
        }

        Ok(())
    }
}
