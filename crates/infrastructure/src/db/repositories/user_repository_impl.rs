//! 用户仓储的 PostgreSQL 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{PasswordHash, RepositoryError, User, UserEmail, UserId, Username};
use sqlx::FromRow;
use uuid::Uuid;

use application::repository::UserRepository;

use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
struct DbUser {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    about: String,
    avatar_url: Option<String>,
    following: Vec<Uuid>,
    followers: Vec<Uuid>,
    follow_requests: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

const USER_COLUMNS: &str = "id, name, email, password_hash, about, avatar_url, \
     following, followers, follow_requests, created_at";

impl DbUser {
    fn into_domain(self) -> Result<User, RepositoryError> {
        let corrupt = |err: domain::DomainError| {
            RepositoryError::storage(format!("corrupt user record: {err}"))
        };
        Ok(User {
            id: UserId::from(self.id),
            name: Username::parse(self.name).map_err(corrupt)?,
            email: UserEmail::parse(self.email).map_err(corrupt)?,
            password_hash: PasswordHash::new(self.password_hash).map_err(corrupt)?,
            about: self.about,
            avatar_url: self.avatar_url,
            following: self.following.into_iter().map(UserId::from).collect(),
            followers: self.followers.into_iter().map(UserId::from).collect(),
            follow_requests: self
                .follow_requests
                .into_iter()
                .map(UserId::from)
                .collect(),
            created_at: self.created_at,
        })
    }
}

fn storage_error(err: sqlx::Error) -> RepositoryError {
    // 唯一约束冲突映射成 Conflict，应用层据此返回 409
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict;
        }
    }
    RepositoryError::storage(err.to_string())
}

fn uuid_vec(ids: &[UserId]) -> Vec<Uuid> {
    ids.iter().copied().map(Uuid::from).collect()
}

pub struct PgUserRepository {
    pool: DbPool,
}

impl PgUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        sqlx::query(
            "INSERT INTO users \
             (id, name, email, password_hash, about, avatar_url, \
              following, followers, follow_requests, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(Uuid::from(user.id))
        .bind(user.name.as_str())
        .bind(user.email.as_str())
        .bind(user.password_hash.as_str())
        .bind(&user.about)
        .bind(&user.avatar_url)
        .bind(uuid_vec(&user.following))
        .bind(uuid_vec(&user.followers))
        .bind(uuid_vec(&user.follow_requests))
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET name = $2, about = $3, avatar_url = $4, \
             following = $5, followers = $6, follow_requests = $7 WHERE id = $1",
        )
        .bind(Uuid::from(user.id))
        .bind(user.name.as_str())
        .bind(&user.about)
        .bind(&user.avatar_url)
        .bind(uuid_vec(&user.following))
        .bind(uuid_vec(&user.followers))
        .bind(uuid_vec(&user.follow_requests))
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.map(DbUser::into_domain).transpose()
    }

    async fn find_by_email(&self, email: &UserEmail) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.map(DbUser::into_domain).transpose()
    }

    async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, DbUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter().map(DbUser::into_domain).collect()
    }
}
