//! 呼叫信令中继
//!
//! 纯转发：在两个用户之间传递呼叫建立/接听/挂断负载，
//! 不理解负载内容，不持久化，不维护会话状态——呼叫状态机
//! 完全由客户端自报。过期或重复的挂断因此是无害的空操作。

use std::sync::Arc;

use domain::UserId;
use uuid::Uuid;

use crate::{error::ApplicationError, events::ServerEvent, presence::PresenceRegistry};

#[derive(Debug, Clone)]
pub struct InitiateCallRequest {
    pub caller_id: Uuid,
    pub callee_id: Uuid,
    pub caller_name: String,
    pub offer: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct AcceptCallRequest {
    pub callee_id: Uuid,
    pub caller_id: Uuid,
    pub answer: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct TerminateCallRequest {
    pub from_id: Uuid,
    pub to_id: Uuid,
}

pub struct CallServiceDependencies {
    pub presence: Arc<PresenceRegistry>,
}

pub struct CallService {
    deps: CallServiceDependencies,
}

impl CallService {
    pub fn new(deps: CallServiceDependencies) -> Self {
        Self { deps }
    }

    /// 发起呼叫：被叫在线则转发 offer，离线则只通知主叫失败。
    /// 不重试、不排队；被叫每次呼叫至多收到一条来电通知。
    pub async fn initiate(&self, request: InitiateCallRequest) -> Result<(), ApplicationError> {
        let caller_id = UserId::from(request.caller_id);
        let callee_id = UserId::from(request.callee_id);

        if self.deps.presence.lookup(callee_id).await.is_some() {
            self.deps
                .presence
                .send_to(
                    callee_id,
                    ServerEvent::IncomingCall {
                        from: caller_id,
                        name: request.caller_name,
                        signal: request.offer,
                    },
                )
                .await;
        } else {
            tracing::debug!(caller = %caller_id, callee = %callee_id, "被叫离线，呼叫失败");
            self.deps
                .presence
                .send_to(
                    caller_id,
                    ServerEvent::CallFailed {
                        reason: "User is offline".to_owned(),
                    },
                )
                .await;
        }

        Ok(())
    }

    /// 接听：主叫仍在线则转发 answer，否则静默丢弃（主叫已离开）。
    pub async fn accept(&self, request: AcceptCallRequest) -> Result<(), ApplicationError> {
        let caller_id = UserId::from(request.caller_id);

        self.deps
            .presence
            .send_to(
                caller_id,
                ServerEvent::CallAccepted {
                    signal: request.answer,
                },
            )
            .await;

        Ok(())
    }

    /// 挂断：对端在线则通知，无论对端状态如何挂断方都视为成功。
    pub async fn terminate(&self, request: TerminateCallRequest) -> Result<(), ApplicationError> {
        let to_id = UserId::from(request.to_id);
        self.deps.presence.send_to(to_id, ServerEvent::CallEnded).await;
        Ok(())
    }
}
