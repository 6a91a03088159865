//! 持久化网关契约
//!
//! 核心子系统消费的抽象存储接口。消息是追加写入的日志，
//! 送达/已读/回应/删除标记是可变覆盖层；实现必须保证单条
//! 消息的覆盖层变更是原子的（内存实现靠锁串行化，PostgreSQL
//! 实现靠单条语句），集合型字段只合并、绝不整体覆盖。

use async_trait::async_trait;
use domain::{ChatTarget, Emoji, Group, GroupId, Message, MessageId, RepositoryError, User, UserEmail, UserId};

/// 会话标识：私聊是一对用户（顺序无关），群聊是群组。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRef {
    Private { a: UserId, b: UserId },
    Group(GroupId),
}

impl ChatRef {
    /// 判断一条消息是否属于这个会话。
    pub fn matches(&self, message: &Message) -> bool {
        match (self, message.target) {
            (ChatRef::Group(group_id), ChatTarget::Group(target)) => *group_id == target,
            (ChatRef::Private { a, b }, ChatTarget::User(recipient)) => {
                (message.sender_id == *a && recipient == *b)
                    || (message.sender_id == *b && recipient == *a)
            }
            _ => false,
        }
    }
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// 追加一条新消息，返回落库后的完整记录。
    async fn append(&self, message: Message) -> Result<Message, RepositoryError>;

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError>;

    /// 把 reader 加入会话内所有其未发送、未读过的消息的
    /// `read_by` 与 `delivered_to`（已读蕴含已送达）。
    /// 幂等：重复调用不再产生变化。返回真正被修改的消息。
    async fn mark_chat_read(
        &self,
        chat: ChatRef,
        reader: UserId,
    ) -> Result<Vec<Message>, RepositoryError>;

    /// 原子地应用"添加/取消/替换"回应规则，返回更新后的消息；
    /// 消息不存在返回 None。
    async fn toggle_reaction(
        &self,
        id: MessageId,
        user: UserId,
        emoji: Emoji,
    ) -> Result<Option<Message>, RepositoryError>;

    /// 为单个用户打软删除标记。
    async fn add_deleted_for(&self, id: MessageId, user: UserId) -> Result<(), RepositoryError>;

    /// 彻底删除一条消息。
    async fn delete_by_id(&self, id: MessageId) -> Result<(), RepositoryError>;

    /// 会话消息列表，排除 requester 已软删除的条目，按创建时间升序。
    async fn list_for_chat(
        &self,
        chat: ChatRef,
        requester: UserId,
    ) -> Result<Vec<Message>, RepositoryError>;

    /// 把会话内所有消息对某个用户标记为已删除（清空聊天记录）。
    async fn mark_chat_deleted_for(
        &self,
        chat: ChatRef,
        user: UserId,
    ) -> Result<(), RepositoryError>;

    /// 删除群组的全部消息（解散群组时级联）。
    async fn delete_all_for_group(&self, group_id: GroupId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn create(&self, group: Group) -> Result<Group, RepositoryError>;
    async fn update(&self, group: Group) -> Result<Group, RepositoryError>;
    async fn find_by_id(&self, id: GroupId) -> Result<Option<Group>, RepositoryError>;
    async fn delete(&self, id: GroupId) -> Result<(), RepositoryError>;
    async fn list_for_member(&self, user_id: UserId) -> Result<Vec<Group>, RepositoryError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 创建用户，邮箱重复返回 `Conflict`。
    async fn create(&self, user: User) -> Result<User, RepositoryError>;
    async fn update(&self, user: User) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: &UserEmail) -> Result<Option<User>, RepositoryError>;
    async fn list_all(&self) -> Result<Vec<User>, RepositoryError>;
}
