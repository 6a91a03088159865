//! 领域模型层。
//!
//! 实体、值对象和领域错误，不依赖任何运行时或存储。
//! 消息覆盖层（送达/已读/回应/删除）的变更规则都集中在这里。

pub mod errors;
pub mod group;
pub mod message;
pub mod repository;
pub mod user;
pub mod value_objects;

pub use errors::{DomainError, DomainResult};
pub use group::Group;
pub use message::{ChatTarget, Message, MessageStatus, Reaction, ReactionChange};
pub use repository::RepositoryError;
pub use user::User;
pub use value_objects::{
    Emoji, GroupId, MessageBody, MessageId, PasswordHash, Timestamp, UserEmail, UserId, Username,
};
