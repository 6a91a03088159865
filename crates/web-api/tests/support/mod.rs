//! 端到端测试装配：内存仓储 + 低成本 bcrypt，免外部依赖。

use std::sync::Arc;

use application::{
    CallService, CallServiceDependencies, GroupRepository, GroupService, GroupServiceDependencies,
    MessageRepository, MessageService, MessageServiceDependencies, PresenceRegistry,
    ReactionService, ReactionServiceDependencies, ReceiptService, ReceiptServiceDependencies,
    SystemClock, UserRepository, UserService, UserServiceDependencies,
};
use axum::Router;
use config::JwtConfig;
use infrastructure::{
    BcryptPasswordHasher, InMemoryGroupRepository, InMemoryMessageRepository,
    InMemoryUserRepository,
};
use web_api::{router, AppState, JwtService};

pub fn build_router() -> Router {
    let presence = Arc::new(PresenceRegistry::new());
    let clock = Arc::new(SystemClock);
    // 测试用最低成本，避免哈希拖慢用例
    let password_hasher = Arc::new(BcryptPasswordHasher::new(4));

    let message_repository: Arc<dyn MessageRepository> = Arc::new(InMemoryMessageRepository::new());
    let group_repository: Arc<dyn GroupRepository> = Arc::new(InMemoryGroupRepository::new());
    let user_repository: Arc<dyn UserRepository> = Arc::new(InMemoryUserRepository::new());

    let user_service = Arc::new(UserService::new(UserServiceDependencies {
        user_repository,
        password_hasher,
        presence: presence.clone(),
        clock: clock.clone(),
    }));
    let group_service = Arc::new(GroupService::new(GroupServiceDependencies {
        group_repository: group_repository.clone(),
        message_repository: message_repository.clone(),
        presence: presence.clone(),
        clock: clock.clone(),
    }));
    let message_service = Arc::new(MessageService::new(MessageServiceDependencies {
        message_repository: message_repository.clone(),
        group_repository: group_repository.clone(),
        presence: presence.clone(),
        clock,
    }));
    let receipt_service = Arc::new(ReceiptService::new(ReceiptServiceDependencies {
        message_repository: message_repository.clone(),
        group_repository: group_repository.clone(),
        presence: presence.clone(),
    }));
    let reaction_service = Arc::new(ReactionService::new(ReactionServiceDependencies {
        message_repository,
        group_repository,
        presence: presence.clone(),
    }));
    let call_service = Arc::new(CallService::new(CallServiceDependencies {
        presence: presence.clone(),
    }));

    let jwt_service = Arc::new(JwtService::new(JwtConfig {
        secret: "test-secret-key".to_string(),
        expiration_hours: 24,
    }));

    router(AppState {
        user_service,
        group_service,
        message_service,
        receipt_service,
        reaction_service,
        call_service,
        presence,
        jwt_service,
    })
}
