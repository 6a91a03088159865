use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::value_objects::{Emoji, GroupId, MessageBody, MessageId, Timestamp, UserId};

/// 消息的投递目标：私聊指向对端用户，群聊指向群组。
///
/// 创建后不可变更。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ChatTarget {
    User(UserId),
    Group(GroupId),
}

impl ChatTarget {
    pub fn is_group(&self) -> bool {
        matches!(self, ChatTarget::Group(_))
    }
}

/// 单个用户对消息的表情回应，每个用户至多一条。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub user: UserId,
    pub emoji: Emoji,
}

/// 回应变更结果，决定广播前是否真的发生了修改。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionChange {
    Added,
    Removed,
    Replaced,
}

/// 发送方视角的消息状态，展示时即时计算，不落库。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
}

/// 聊天消息。
///
/// 核心字段（id、发送者、目标、正文、时间）创建后不可变；
/// 送达/已读/回应/删除标记是可变覆盖层，各自独立更新。
/// `delivered_to` 与 `read_by` 只增不减，彻底删除时整条记录消失。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub target: ChatTarget,
    pub body: MessageBody,
    pub created_at: Timestamp,
    pub delivered_to: HashSet<UserId>,
    pub read_by: HashSet<UserId>,
    pub reactions: Vec<Reaction>,
    // 每用户的软删除标记不暴露给客户端
    #[serde(skip_serializing, default)]
    pub deleted_for: HashSet<UserId>,
}

impl Message {
    pub fn new(
        id: MessageId,
        sender_id: UserId,
        target: ChatTarget,
        body: MessageBody,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            sender_id,
            target,
            body,
            created_at,
            delivered_to: HashSet::new(),
            read_by: HashSet::new(),
            reactions: Vec::new(),
            deleted_for: HashSet::new(),
        }
    }

    pub fn is_group(&self) -> bool {
        self.target.is_group()
    }

    /// 记录一次送达确认，重复确认是无害的幂等操作。
    pub fn mark_delivered(&mut self, user: UserId) -> bool {
        self.delivered_to.insert(user)
    }

    /// 记录一次已读确认。已读蕴含已送达，两个集合同时增长。
    pub fn mark_read(&mut self, user: UserId) -> bool {
        self.delivered_to.insert(user);
        self.read_by.insert(user)
    }

    /// 按"添加 / 同表情取消 / 换表情替换"规则更新用户回应。
    pub fn apply_reaction(&mut self, user: UserId, emoji: Emoji) -> ReactionChange {
        match self.reactions.iter().position(|r| r.user == user) {
            Some(index) if self.reactions[index].emoji == emoji => {
                self.reactions.remove(index);
                ReactionChange::Removed
            }
            Some(index) => {
                self.reactions[index].emoji = emoji;
                ReactionChange::Replaced
            }
            None => {
                self.reactions.push(Reaction { user, emoji });
                ReactionChange::Added
            }
        }
    }

    /// 为单个用户隐藏这条消息，其他参与者不受影响。
    pub fn delete_for(&mut self, user: UserId) -> bool {
        self.deleted_for.insert(user)
    }

    pub fn is_deleted_for(&self, user: UserId) -> bool {
        self.deleted_for.contains(&user)
    }

    /// 计算发送方看到的状态指示。
    ///
    /// `total_others` 是除发送者以外的接收者数量：私聊恒为 1，
    /// 群聊为成员数减一。部分送达不单独区分，一律视作未送达。
    pub fn status(&self, total_others: usize) -> MessageStatus {
        if total_others > 0 && self.read_by.len() >= total_others {
            return MessageStatus::Read;
        }
        if self.delivered_to.len() >= total_others {
            return MessageStatus::Delivered;
        }
        MessageStatus::Sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user() -> UserId {
        UserId::from(Uuid::new_v4())
    }

    fn message(sender: UserId, target: ChatTarget) -> Message {
        Message::new(
            MessageId::from(Uuid::new_v4()),
            sender,
            target,
            MessageBody::new("hello").unwrap(),
            chrono::Utc::now(),
        )
    }

    fn emoji(s: &str) -> Emoji {
        Emoji::parse(s).unwrap()
    }

    #[test]
    fn read_implies_delivered() {
        let sender = user();
        let reader = user();
        let mut msg = message(sender, ChatTarget::User(reader));

        assert!(msg.mark_read(reader));
        assert!(msg.delivered_to.contains(&reader));
        assert!(msg.read_by.contains(&reader));

        // 重复标记已读不产生变化
        assert!(!msg.mark_read(reader));
        assert_eq!(msg.read_by.len(), 1);
        assert_eq!(msg.delivered_to.len(), 1);
    }

    #[test]
    fn reaction_toggle_returns_to_initial_state() {
        let sender = user();
        let reactor = user();
        let mut msg = message(sender, ChatTarget::User(reactor));

        let before = msg.reactions.clone();
        assert_eq!(
            msg.apply_reaction(reactor, emoji("👍")),
            ReactionChange::Added
        );
        assert_eq!(
            msg.apply_reaction(reactor, emoji("👍")),
            ReactionChange::Removed
        );
        assert_eq!(msg.reactions, before);
    }

    #[test]
    fn reaction_replaces_existing_emoji() {
        let sender = user();
        let reactor = user();
        let mut msg = message(sender, ChatTarget::User(reactor));

        msg.apply_reaction(reactor, emoji("👍"));
        assert_eq!(
            msg.apply_reaction(reactor, emoji("❤️")),
            ReactionChange::Replaced
        );
        assert_eq!(msg.reactions.len(), 1);
        assert_eq!(msg.reactions[0].emoji, emoji("❤️"));
    }

    #[test]
    fn private_status_transitions() {
        let sender = user();
        let recipient = user();
        let mut msg = message(sender, ChatTarget::User(recipient));

        assert_eq!(msg.status(1), MessageStatus::Sent);
        msg.mark_delivered(recipient);
        assert_eq!(msg.status(1), MessageStatus::Delivered);
        msg.mark_read(recipient);
        assert_eq!(msg.status(1), MessageStatus::Read);
    }

    #[test]
    fn group_status_requires_all_other_members() {
        let sender = user();
        let member_b = user();
        let member_c = user();
        let group = GroupId::from(Uuid::new_v4());
        let mut msg = message(sender, ChatTarget::Group(group));

        // 三人群，除发送者外两人
        assert_eq!(msg.status(2), MessageStatus::Sent);

        msg.mark_delivered(member_b);
        // 1 < 2：部分送达不算送达
        assert_eq!(msg.status(2), MessageStatus::Sent);

        msg.mark_read(member_c);
        assert_eq!(msg.status(2), MessageStatus::Delivered);

        msg.mark_read(member_b);
        assert_eq!(msg.status(2), MessageStatus::Read);
    }

    #[test]
    fn group_status_never_read_without_other_members() {
        let sender = user();
        let group = GroupId::from(Uuid::new_v4());
        let msg = message(sender, ChatTarget::Group(group));

        assert_ne!(msg.status(0), MessageStatus::Read);
    }

    #[test]
    fn soft_delete_hides_for_single_user() {
        let sender = user();
        let recipient = user();
        let mut msg = message(sender, ChatTarget::User(recipient));

        assert!(msg.delete_for(recipient));
        assert!(msg.is_deleted_for(recipient));
        assert!(!msg.is_deleted_for(sender));
        // 重复删除幂等
        assert!(!msg.delete_for(recipient));
    }
}
