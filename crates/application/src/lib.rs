//! 应用层实现。
//!
//! 围绕领域模型的用例服务：在线状态注册表、消息路由、
//! 回执聚合、回应协调、呼叫信令中继，以及外围的用户/群组
//! 管理。对外部适配器（持久化网关、密码哈希、时钟）的抽象
//! 也定义在这里。

pub mod clock;
pub mod error;
pub mod events;
pub mod password;
pub mod presence;
pub mod repository;
pub mod services;

pub use clock::{Clock, SystemClock};
pub use error::ApplicationError;
pub use events::ServerEvent;
pub use password::{PasswordHasher, PasswordHasherError};
pub use presence::{ConnectionHandle, PresenceRegistry};
pub use repository::{ChatRef, GroupRepository, MessageRepository, UserRepository};
pub use services::{
    CallService, CallServiceDependencies, GroupService, GroupServiceDependencies, MessageService,
    MessageServiceDependencies, ReactionService, ReactionServiceDependencies, ReceiptService,
    ReceiptServiceDependencies, UserService, UserServiceDependencies,
};
