mod group_repository_impl;
mod message_repository_impl;
mod user_repository_impl;

pub use group_repository_impl::PgGroupRepository;
pub use message_repository_impl::PgMessageRepository;
pub use user_repository_impl::PgUserRepository;
