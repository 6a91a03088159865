//! 消息仓储的 PostgreSQL 实现
//!
//! 覆盖层字段存成 `uuid[]` 列，回应存成 `jsonb`。集合追加都在
//! 单条带守卫条件的 UPDATE 里完成（只合并、不覆盖、天然幂等）；
//! 回应切换需要读-改-写，用行级锁的事务保证同一消息串行。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    ChatTarget, Emoji, GroupId, Message, MessageBody, MessageId, Reaction, RepositoryError, UserId,
};
use sqlx::FromRow;
use uuid::Uuid;

use application::repository::{ChatRef, MessageRepository};

use crate::db::DbPool;

/// 数据库消息行
#[derive(Debug, Clone, FromRow)]
struct DbMessage {
    id: Uuid,
    sender_id: Uuid,
    target_id: Uuid,
    is_group: bool,
    body: String,
    created_at: DateTime<Utc>,
    delivered_to: Vec<Uuid>,
    read_by: Vec<Uuid>,
    reactions: serde_json::Value,
    deleted_for: Vec<Uuid>,
}

const MESSAGE_COLUMNS: &str = "id, sender_id, target_id, is_group, body, created_at, \
     delivered_to, read_by, reactions, deleted_for";

impl DbMessage {
    fn into_domain(self) -> Result<Message, RepositoryError> {
        let target = if self.is_group {
            ChatTarget::Group(GroupId::from(self.target_id))
        } else {
            ChatTarget::User(UserId::from(self.target_id))
        };
        let body = MessageBody::new(self.body)
            .map_err(|err| RepositoryError::storage(format!("corrupt message body: {err}")))?;
        let reactions: Vec<Reaction> = serde_json::from_value(self.reactions)
            .map_err(|err| RepositoryError::storage(format!("corrupt reactions: {err}")))?;

        Ok(Message {
            id: MessageId::from(self.id),
            sender_id: UserId::from(self.sender_id),
            target,
            body,
            created_at: self.created_at,
            delivered_to: self.delivered_to.into_iter().map(UserId::from).collect(),
            read_by: self.read_by.into_iter().map(UserId::from).collect(),
            reactions,
            deleted_for: self.deleted_for.into_iter().map(UserId::from).collect(),
        })
    }
}

fn storage_error(err: sqlx::Error) -> RepositoryError {
    RepositoryError::storage(err.to_string())
}

fn target_parts(target: ChatTarget) -> (Uuid, bool) {
    match target {
        ChatTarget::User(user_id) => (user_id.into(), false),
        ChatTarget::Group(group_id) => (group_id.into(), true),
    }
}

fn uuids(ids: &std::collections::HashSet<UserId>) -> Vec<Uuid> {
    ids.iter().copied().map(Uuid::from).collect()
}

pub struct PgMessageRepository {
    pool: DbPool,
}

impl PgMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn append(&self, message: Message) -> Result<Message, RepositoryError> {
        let (target_id, is_group) = target_parts(message.target);
        let reactions = serde_json::to_value(&message.reactions)
            .map_err(|err| RepositoryError::storage(err.to_string()))?;

        sqlx::query(
            "INSERT INTO messages \
             (id, sender_id, target_id, is_group, body, created_at, \
              delivered_to, read_by, reactions, deleted_for) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.sender_id))
        .bind(target_id)
        .bind(is_group)
        .bind(message.body.as_str())
        .bind(message.created_at)
        .bind(uuids(&message.delivered_to))
        .bind(uuids(&message.read_by))
        .bind(reactions)
        .bind(uuids(&message.deleted_for))
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(message)
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        let row = sqlx::query_as::<_, DbMessage>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.map(DbMessage::into_domain).transpose()
    }

    async fn mark_chat_read(
        &self,
        chat: ChatRef,
        reader: UserId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let reader_id = Uuid::from(reader);

        // 单条 UPDATE：只挑未读的行，read_by 追加、delivered_to 去重合并。
        // WHERE 守卫保证幂等，数据库按行串行化并发更新。
        let rows = match chat {
            ChatRef::Group(group_id) => {
                sqlx::query_as::<_, DbMessage>(&format!(
                    "UPDATE messages SET \
                         read_by = array_append(read_by, $2), \
                         delivered_to = CASE WHEN $2 = ANY(delivered_to) \
                             THEN delivered_to ELSE array_append(delivered_to, $2) END \
                     WHERE is_group AND target_id = $1 \
                       AND sender_id <> $2 AND NOT ($2 = ANY(read_by)) \
                     RETURNING {MESSAGE_COLUMNS}"
                ))
                .bind(Uuid::from(group_id))
                .bind(reader_id)
                .fetch_all(&self.pool)
                .await
                .map_err(storage_error)?
            }
            ChatRef::Private { a, b } => {
                // 私聊里"非读者发送"的消息就是对端发给读者的那些
                let peer = if a == reader { b } else { a };
                sqlx::query_as::<_, DbMessage>(&format!(
                    "UPDATE messages SET \
                         read_by = array_append(read_by, $3), \
                         delivered_to = CASE WHEN $3 = ANY(delivered_to) \
                             THEN delivered_to ELSE array_append(delivered_to, $3) END \
                     WHERE NOT is_group AND sender_id = $1 AND target_id = $2 \
                       AND NOT ($3 = ANY(read_by)) \
                     RETURNING {MESSAGE_COLUMNS}"
                ))
                .bind(Uuid::from(peer))
                .bind(reader_id)
                .bind(reader_id)
                .fetch_all(&self.pool)
                .await
                .map_err(storage_error)?
            }
        };

        rows.into_iter().map(DbMessage::into_domain).collect()
    }

    async fn toggle_reaction(
        &self,
        id: MessageId,
        user: UserId,
        emoji: Emoji,
    ) -> Result<Option<Message>, RepositoryError> {
        // 读-改-写需要独占这一行，行级锁把同一消息上的并发回应串行化
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let row = sqlx::query_as::<_, DbMessage>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1 FOR UPDATE"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_error)?;

        let Some(row) = row else {
            tx.rollback().await.map_err(storage_error)?;
            return Ok(None);
        };

        let mut message = row.into_domain()?;
        message.apply_reaction(user, emoji);

        let reactions = serde_json::to_value(&message.reactions)
            .map_err(|err| RepositoryError::storage(err.to_string()))?;
        sqlx::query("UPDATE messages SET reactions = $2 WHERE id = $1")
            .bind(Uuid::from(id))
            .bind(reactions)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;
        Ok(Some(message))
    }

    async fn add_deleted_for(&self, id: MessageId, user: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE messages SET deleted_for = array_append(deleted_for, $2) \
             WHERE id = $1 AND NOT ($2 = ANY(deleted_for))",
        )
        .bind(Uuid::from(id))
        .bind(Uuid::from(user))
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn delete_by_id(&self, id: MessageId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_for_chat(
        &self,
        chat: ChatRef,
        requester: UserId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let requester_id = Uuid::from(requester);

        let rows = match chat {
            ChatRef::Group(group_id) => {
                sqlx::query_as::<_, DbMessage>(&format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages \
                     WHERE is_group AND target_id = $1 AND NOT ($2 = ANY(deleted_for)) \
                     ORDER BY created_at"
                ))
                .bind(Uuid::from(group_id))
                .bind(requester_id)
                .fetch_all(&self.pool)
                .await
                .map_err(storage_error)?
            }
            ChatRef::Private { a, b } => {
                sqlx::query_as::<_, DbMessage>(&format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages \
                     WHERE NOT is_group \
                       AND ((sender_id = $1 AND target_id = $2) \
                         OR (sender_id = $2 AND target_id = $1)) \
                       AND NOT ($3 = ANY(deleted_for)) \
                     ORDER BY created_at"
                ))
                .bind(Uuid::from(a))
                .bind(Uuid::from(b))
                .bind(requester_id)
                .fetch_all(&self.pool)
                .await
                .map_err(storage_error)?
            }
        };

        rows.into_iter().map(DbMessage::into_domain).collect()
    }

    async fn mark_chat_deleted_for(
        &self,
        chat: ChatRef,
        user: UserId,
    ) -> Result<(), RepositoryError> {
        let user_id = Uuid::from(user);

        match chat {
            ChatRef::Group(group_id) => {
                sqlx::query(
                    "UPDATE messages SET deleted_for = array_append(deleted_for, $2) \
                     WHERE is_group AND target_id = $1 AND NOT ($2 = ANY(deleted_for))",
                )
                .bind(Uuid::from(group_id))
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(storage_error)?;
            }
            ChatRef::Private { a, b } => {
                sqlx::query(
                    "UPDATE messages SET deleted_for = array_append(deleted_for, $3) \
                     WHERE NOT is_group \
                       AND ((sender_id = $1 AND target_id = $2) \
                         OR (sender_id = $2 AND target_id = $1)) \
                       AND NOT ($3 = ANY(deleted_for))",
                )
                .bind(Uuid::from(a))
                .bind(Uuid::from(b))
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(storage_error)?;
            }
        }
        Ok(())
    }

    async fn delete_all_for_group(&self, group_id: GroupId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM messages WHERE is_group AND target_id = $1")
            .bind(Uuid::from(group_id))
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(())
    }
}
