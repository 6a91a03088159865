//! 内存仓储实现
//!
//! 测试和无数据库运行时使用。单把写锁把同一存储上的读-改-写
//! 串行化，满足覆盖层变更的原子性要求。

use std::collections::HashMap;

use async_trait::async_trait;
use domain::{
    Emoji, Group, GroupId, Message, MessageId, RepositoryError, User, UserEmail, UserId,
};
use tokio::sync::RwLock;

use application::repository::{ChatRef, GroupRepository, MessageRepository, UserRepository};

#[derive(Default)]
pub struct InMemoryMessageRepository {
    // Vec 保持追加顺序，配合 created_at 排序稳定
    messages: RwLock<Vec<Message>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn append(&self, message: Message) -> Result<Message, RepositoryError> {
        let mut messages = self.messages.write().await;
        if messages.iter().any(|m| m.id == message.id) {
            return Err(RepositoryError::Conflict);
        }
        messages.push(message.clone());
        Ok(message)
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        let messages = self.messages.read().await;
        Ok(messages.iter().find(|m| m.id == id).cloned())
    }

    async fn mark_chat_read(
        &self,
        chat: ChatRef,
        reader: UserId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let mut messages = self.messages.write().await;
        let mut changed = Vec::new();
        for message in messages.iter_mut() {
            if chat.matches(message)
                && message.sender_id != reader
                && !message.read_by.contains(&reader)
            {
                message.mark_read(reader);
                changed.push(message.clone());
            }
        }
        Ok(changed)
    }

    async fn toggle_reaction(
        &self,
        id: MessageId,
        user: UserId,
        emoji: Emoji,
    ) -> Result<Option<Message>, RepositoryError> {
        let mut messages = self.messages.write().await;
        match messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.apply_reaction(user, emoji);
                Ok(Some(message.clone()))
            }
            None => Ok(None),
        }
    }

    async fn add_deleted_for(&self, id: MessageId, user: UserId) -> Result<(), RepositoryError> {
        let mut messages = self.messages.write().await;
        if let Some(message) = messages.iter_mut().find(|m| m.id == id) {
            message.delete_for(user);
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: MessageId) -> Result<(), RepositoryError> {
        let mut messages = self.messages.write().await;
        let before = messages.len();
        messages.retain(|m| m.id != id);
        if messages.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_for_chat(
        &self,
        chat: ChatRef,
        requester: UserId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let messages = self.messages.read().await;
        let mut result: Vec<Message> = messages
            .iter()
            .filter(|m| chat.matches(m) && !m.is_deleted_for(requester))
            .cloned()
            .collect();
        result.sort_by_key(|m| m.created_at);
        Ok(result)
    }

    async fn mark_chat_deleted_for(
        &self,
        chat: ChatRef,
        user: UserId,
    ) -> Result<(), RepositoryError> {
        let mut messages = self.messages.write().await;
        for message in messages.iter_mut() {
            if chat.matches(message) {
                message.delete_for(user);
            }
        }
        Ok(())
    }

    async fn delete_all_for_group(&self, group_id: GroupId) -> Result<(), RepositoryError> {
        let mut messages = self.messages.write().await;
        messages.retain(|m| !ChatRef::Group(group_id).matches(m));
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryGroupRepository {
    groups: RwLock<HashMap<GroupId, Group>>,
}

impl InMemoryGroupRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GroupRepository for InMemoryGroupRepository {
    async fn create(&self, group: Group) -> Result<Group, RepositoryError> {
        let mut groups = self.groups.write().await;
        if groups.contains_key(&group.id) {
            return Err(RepositoryError::Conflict);
        }
        groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn update(&self, group: Group) -> Result<Group, RepositoryError> {
        let mut groups = self.groups.write().await;
        if !groups.contains_key(&group.id) {
            return Err(RepositoryError::NotFound);
        }
        groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn find_by_id(&self, id: GroupId) -> Result<Option<Group>, RepositoryError> {
        let groups = self.groups.read().await;
        Ok(groups.get(&id).cloned())
    }

    async fn delete(&self, id: GroupId) -> Result<(), RepositoryError> {
        let mut groups = self.groups.write().await;
        groups.remove(&id).ok_or(RepositoryError::NotFound)?;
        Ok(())
    }

    async fn list_for_member(&self, user_id: UserId) -> Result<Vec<Group>, RepositoryError> {
        let groups = self.groups.read().await;
        let mut result: Vec<Group> = groups
            .values()
            .filter(|g| g.is_member(user_id))
            .cloned()
            .collect();
        result.sort_by_key(|g| g.created_at);
        Ok(result)
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(RepositoryError::NotFound);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &UserEmail) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == *email).cloned())
    }

    async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        let users = self.users.read().await;
        let mut result: Vec<User> = users.values().cloned().collect();
        result.sort_by_key(|u| u.created_at);
        Ok(result)
    }
}
