//! 群组仓储的 PostgreSQL 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Group, GroupId, RepositoryError, UserId};
use sqlx::FromRow;
use uuid::Uuid;

use application::repository::GroupRepository;

use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
struct DbGroup {
    id: Uuid,
    name: String,
    members: Vec<Uuid>,
    admin: Uuid,
    icon: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<DbGroup> for Group {
    fn from(row: DbGroup) -> Self {
        Group {
            id: GroupId::from(row.id),
            name: row.name,
            members: row.members.into_iter().map(UserId::from).collect(),
            admin: UserId::from(row.admin),
            icon: row.icon,
            created_at: row.created_at,
        }
    }
}

fn storage_error(err: sqlx::Error) -> RepositoryError {
    RepositoryError::storage(err.to_string())
}

fn member_ids(group: &Group) -> Vec<Uuid> {
    group.members.iter().copied().map(Uuid::from).collect()
}

pub struct PgGroupRepository {
    pool: DbPool,
}

impl PgGroupRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupRepository for PgGroupRepository {
    async fn create(&self, group: Group) -> Result<Group, RepositoryError> {
        sqlx::query(
            "INSERT INTO groups (id, name, members, admin, icon, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::from(group.id))
        .bind(&group.name)
        .bind(member_ids(&group))
        .bind(Uuid::from(group.admin))
        .bind(&group.icon)
        .bind(group.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(group)
    }

    async fn update(&self, group: Group) -> Result<Group, RepositoryError> {
        let result = sqlx::query(
            "UPDATE groups SET name = $2, members = $3, admin = $4, icon = $5 WHERE id = $1",
        )
        .bind(Uuid::from(group.id))
        .bind(&group.name)
        .bind(member_ids(&group))
        .bind(Uuid::from(group.admin))
        .bind(&group.icon)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(group)
    }

    async fn find_by_id(&self, id: GroupId) -> Result<Option<Group>, RepositoryError> {
        let row = sqlx::query_as::<_, DbGroup>(
            "SELECT id, name, members, admin, icon, created_at FROM groups WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(row.map(Group::from))
    }

    async fn delete(&self, id: GroupId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_for_member(&self, user_id: UserId) -> Result<Vec<Group>, RepositoryError> {
        let rows = sqlx::query_as::<_, DbGroup>(
            "SELECT id, name, members, admin, icon, created_at FROM groups \
             WHERE $1 = ANY(members) ORDER BY created_at",
        )
        .bind(Uuid::from(user_id))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(rows.into_iter().map(Group::from).collect())
    }
}
