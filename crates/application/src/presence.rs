//! 在线状态注册表
//!
//! 进程内唯一的"谁在线"事实来源。每个用户至多一条活跃连接：
//! 新登录覆盖旧句柄（last-writer-wins），断开只在句柄仍然匹配
//! 时才移除，防止迟到的断开挤掉新登录。

use std::collections::HashMap;

use domain::UserId;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::events::ServerEvent;

/// 用户身份与存活传输通道的绑定。
///
/// 只是一个发送端的轻量克隆，投递是尽力而为：通道已关闭不算错误，
/// 查找成功也不保证随后的推送一定到达。
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub connection_id: Uuid,
    sender: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    pub fn new(connection_id: Uuid, sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            connection_id,
            sender,
        }
    }

    /// 尽力投递一个事件，连接刚好断开时返回 false。
    pub fn push(&self, event: ServerEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}

#[derive(Default)]
pub struct PresenceRegistry {
    connections: RwLock<HashMap<UserId, ConnectionHandle>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册用户上线，覆盖同一用户的旧连接，随后全量广播在线列表。
    pub async fn set_online(&self, user_id: UserId, handle: ConnectionHandle) {
        {
            let mut connections = self.connections.write().await;
            if let Some(previous) = connections.insert(user_id, handle) {
                tracing::info!(
                    user_id = %user_id,
                    previous_connection = %previous.connection_id,
                    "新登录覆盖旧连接"
                );
            }
        }
        self.broadcast_user_list().await;
    }

    /// 注销用户。只有当前注册的句柄就是发起断开的那一条时才移除，
    /// 过期连接的迟到断开不会影响新登录。
    pub async fn set_offline(&self, user_id: UserId, connection_id: Uuid) -> bool {
        let removed = {
            let mut connections = self.connections.write().await;
            match connections.get(&user_id) {
                Some(current) if current.connection_id == connection_id => {
                    connections.remove(&user_id);
                    true
                }
                _ => false,
            }
        };
        if removed {
            tracing::info!(user_id = %user_id, "用户下线");
            self.broadcast_user_list().await;
        }
        removed
    }

    pub async fn lookup(&self, user_id: UserId) -> Option<ConnectionHandle> {
        let connections = self.connections.read().await;
        connections.get(&user_id).cloned()
    }

    pub async fn is_online(&self, user_id: UserId) -> bool {
        let connections = self.connections.read().await;
        connections.contains_key(&user_id)
    }

    pub async fn list_online(&self) -> Vec<UserId> {
        let connections = self.connections.read().await;
        connections.keys().copied().collect()
    }

    /// 尽力把事件推给指定用户，不在线或通道已关闭都返回 false。
    pub async fn send_to(&self, user_id: UserId, event: ServerEvent) -> bool {
        match self.lookup(user_id).await {
            Some(handle) => handle.push(event),
            None => false,
        }
    }

    /// 向所有存活连接广播同一事件。
    pub async fn broadcast(&self, event: ServerEvent) {
        let connections = self.connections.read().await;
        for (user_id, handle) in connections.iter() {
            if !handle.push(event.clone()) {
                tracing::debug!(user_id = %user_id, "广播目标连接已关闭");
            }
        }
    }

    async fn broadcast_user_list(&self) {
        let users = self.list_online().await;
        self.broadcast(ServerEvent::UserList { users }).await;
    }
}
