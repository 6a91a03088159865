//! 基础设施层。
//!
//! 持久化网关的两套实现（PostgreSQL 与内存）以及 bcrypt
//! 密码哈希适配器。

pub mod db;
pub mod memory;
pub mod password;

pub use db::repositories::{PgGroupRepository, PgMessageRepository, PgUserRepository};
pub use db::{create_pg_pool, DbPool};
pub use memory::{InMemoryGroupRepository, InMemoryMessageRepository, InMemoryUserRepository};
pub use password::BcryptPasswordHasher;
