use std::sync::Arc;

use application::{
    CallService, GroupService, MessageService, PresenceRegistry, ReactionService, ReceiptService,
    UserService,
};

use crate::JwtService;

/// 每个请求处理器共享的应用状态。
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub group_service: Arc<GroupService>,
    pub message_service: Arc<MessageService>,
    pub receipt_service: Arc<ReceiptService>,
    pub reaction_service: Arc<ReactionService>,
    pub call_service: Arc<CallService>,
    pub presence: Arc<PresenceRegistry>,
    pub jwt_service: Arc<JwtService>,
}
