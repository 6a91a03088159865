//! 服务层测试装配：内存仓储 + 通道伪装的客户端连接。

// 各测试二进制只用到装配的一部分
#![allow(dead_code)]

use std::sync::Arc;

use application::{
    CallService, CallServiceDependencies, ConnectionHandle, GroupRepository, GroupService,
    GroupServiceDependencies, MessageRepository, MessageService, MessageServiceDependencies,
    PresenceRegistry, ReactionService, ReactionServiceDependencies, ReceiptService,
    ReceiptServiceDependencies, ServerEvent, SystemClock, UserRepository, UserService,
    UserServiceDependencies,
};
use infrastructure::{
    BcryptPasswordHasher, InMemoryGroupRepository, InMemoryMessageRepository,
    InMemoryUserRepository,
};
use tokio::sync::mpsc;
use uuid::Uuid;

pub struct TestApp {
    pub presence: Arc<PresenceRegistry>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub group_repository: Arc<dyn GroupRepository>,
    pub message_service: MessageService,
    pub receipt_service: ReceiptService,
    pub reaction_service: ReactionService,
    pub call_service: CallService,
    pub group_service: GroupService,
    pub user_service: UserService,
}

impl TestApp {
    pub fn new() -> Self {
        let presence = Arc::new(PresenceRegistry::new());
        let message_repository: Arc<dyn MessageRepository> =
            Arc::new(InMemoryMessageRepository::new());
        let group_repository: Arc<dyn GroupRepository> = Arc::new(InMemoryGroupRepository::new());
        let user_repository: Arc<dyn UserRepository> = Arc::new(InMemoryUserRepository::new());
        let clock = Arc::new(SystemClock);

        let message_service = MessageService::new(MessageServiceDependencies {
            message_repository: message_repository.clone(),
            group_repository: group_repository.clone(),
            presence: presence.clone(),
            clock: clock.clone(),
        });
        let receipt_service = ReceiptService::new(ReceiptServiceDependencies {
            message_repository: message_repository.clone(),
            group_repository: group_repository.clone(),
            presence: presence.clone(),
        });
        let reaction_service = ReactionService::new(ReactionServiceDependencies {
            message_repository: message_repository.clone(),
            group_repository: group_repository.clone(),
            presence: presence.clone(),
        });
        let call_service = CallService::new(CallServiceDependencies {
            presence: presence.clone(),
        });
        let group_service = GroupService::new(GroupServiceDependencies {
            group_repository: group_repository.clone(),
            message_repository: message_repository.clone(),
            presence: presence.clone(),
            clock: clock.clone(),
        });
        let user_service = UserService::new(UserServiceDependencies {
            user_repository,
            // 测试用最低成本，避免哈希拖慢用例
            password_hasher: Arc::new(BcryptPasswordHasher::new(4)),
            presence: presence.clone(),
            clock,
        });

        Self {
            presence,
            message_repository,
            group_repository,
            message_service,
            receipt_service,
            reaction_service,
            call_service,
            group_service,
            user_service,
        }
    }

    /// 模拟一次登录：注册一条伪连接并返回其接收端。
    pub async fn connect(&self, user: Uuid) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (_, rx) = self.connect_with_id(user).await;
        rx
    }

    pub async fn connect_with_id(
        &self,
        user: Uuid,
    ) -> (Uuid, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection_id = Uuid::new_v4();
        self.presence
            .set_online(user.into(), ConnectionHandle::new(connection_id, tx))
            .await;
        (connection_id, rx)
    }
}

/// 取走接收端里已经排队的全部事件。
pub fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
