//! 群组管理
//!
//! 外围的请求/响应型操作：建群、改名、换图标、增删成员、
//! 退群、解散。改名/图标/增删成员/解散只有管理员可以执行；
//! 任何成员都可以自行退出。解散群组级联删除其全部消息，
//! 并向在线成员推送关闭事件——永远先改存储、后广播。

use std::sync::Arc;

use domain::{DomainError, Group, GroupId, UserId};
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::ApplicationError,
    events::ServerEvent,
    presence::PresenceRegistry,
    repository::{GroupRepository, MessageRepository},
};

#[derive(Debug, Clone)]
pub struct CreateGroupRequest {
    pub name: String,
    pub member_ids: Vec<Uuid>,
    pub admin_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct UpdateGroupRequest {
    pub group_id: Uuid,
    pub operator_id: Uuid,
    pub name: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AddMembersRequest {
    pub group_id: Uuid,
    pub operator_id: Uuid,
    pub member_ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct RemoveMemberRequest {
    pub group_id: Uuid,
    pub operator_id: Uuid,
    pub target_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct LeaveGroupRequest {
    pub group_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct DeleteGroupRequest {
    pub group_id: Uuid,
    pub operator_id: Uuid,
}

pub struct GroupServiceDependencies {
    pub group_repository: Arc<dyn GroupRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub presence: Arc<PresenceRegistry>,
    pub clock: Arc<dyn Clock>,
}

pub struct GroupService {
    deps: GroupServiceDependencies,
}

impl GroupService {
    pub fn new(deps: GroupServiceDependencies) -> Self {
        Self { deps }
    }

    async fn find_group(&self, group_id: GroupId) -> Result<Group, ApplicationError> {
        self.deps
            .group_repository
            .find_by_id(group_id)
            .await?
            .ok_or_else(|| DomainError::GroupNotFound.into())
    }

    /// 管理员权限检查
    fn check_admin(group: &Group, operator: UserId) -> Result<(), ApplicationError> {
        if !group.is_admin(operator) {
            return Err(DomainError::NotGroupAdmin.into());
        }
        Ok(())
    }

    /// 把群资料变化推给除操作者外的在线成员。
    async fn notify_members(&self, group: &Group, skip: UserId) {
        let event = ServerEvent::GroupDataUpdated { group_id: group.id };
        for member in group.members.iter().copied() {
            if member != skip {
                self.deps.presence.send_to(member, event.clone()).await;
            }
        }
    }

    pub async fn create_group(
        &self,
        request: CreateGroupRequest,
    ) -> Result<Group, ApplicationError> {
        let admin = UserId::from(request.admin_id);
        let members = request.member_ids.into_iter().map(UserId::from).collect();

        let group = Group::new(
            GroupId::from(Uuid::new_v4()),
            request.name,
            members,
            admin,
            self.deps.clock.now(),
        )?;

        let stored = self.deps.group_repository.create(group).await?;
        self.notify_members(&stored, admin).await;
        Ok(stored)
    }

    pub async fn update_group(
        &self,
        request: UpdateGroupRequest,
    ) -> Result<Group, ApplicationError> {
        let operator = UserId::from(request.operator_id);
        let mut group = self.find_group(GroupId::from(request.group_id)).await?;
        Self::check_admin(&group, operator)?;

        if let Some(name) = request.name {
            group.rename(name)?;
        }
        if let Some(icon) = request.icon {
            group.set_icon(icon);
        }

        let updated = self.deps.group_repository.update(group).await?;
        self.notify_members(&updated, operator).await;
        Ok(updated)
    }

    pub async fn add_members(
        &self,
        request: AddMembersRequest,
    ) -> Result<Group, ApplicationError> {
        let operator = UserId::from(request.operator_id);
        let mut group = self.find_group(GroupId::from(request.group_id)).await?;
        Self::check_admin(&group, operator)?;

        let added = group.add_members(request.member_ids.into_iter().map(UserId::from).collect());
        if added.is_empty() {
            return Ok(group);
        }

        let updated = self.deps.group_repository.update(group).await?;
        self.notify_members(&updated, operator).await;
        Ok(updated)
    }

    pub async fn remove_member(
        &self,
        request: RemoveMemberRequest,
    ) -> Result<Group, ApplicationError> {
        let operator = UserId::from(request.operator_id);
        let target = UserId::from(request.target_id);
        let mut group = self.find_group(GroupId::from(request.group_id)).await?;
        Self::check_admin(&group, operator)?;

        group.remove_member(target)?;
        let updated = self.deps.group_repository.update(group).await?;

        // 被移出的人也要收到关闭提示
        self.deps
            .presence
            .send_to(
                target,
                ServerEvent::ForceGroupClose {
                    group_id: updated.id,
                },
            )
            .await;
        self.notify_members(&updated, operator).await;
        Ok(updated)
    }

    /// 成员自行退出。管理员不能退出，只能解散群组。
    pub async fn leave_group(&self, request: LeaveGroupRequest) -> Result<(), ApplicationError> {
        let user = UserId::from(request.user_id);
        let mut group = self.find_group(GroupId::from(request.group_id)).await?;

        group.remove_member(user)?;
        let updated = self.deps.group_repository.update(group).await?;
        self.notify_members(&updated, user).await;
        Ok(())
    }

    /// 解散群组：级联删除全部消息，然后通知在线成员关闭会话。
    pub async fn delete_group(&self, request: DeleteGroupRequest) -> Result<(), ApplicationError> {
        let operator = UserId::from(request.operator_id);
        let group_id = GroupId::from(request.group_id);
        let group = self.find_group(group_id).await?;
        Self::check_admin(&group, operator)?;

        self.deps
            .message_repository
            .delete_all_for_group(group_id)
            .await?;
        self.deps.group_repository.delete(group_id).await?;

        tracing::info!(group_id = %group_id, operator = %operator, "群组已解散");

        let event = ServerEvent::ForceGroupClose { group_id };
        for member in group.members.iter().copied() {
            if member != operator {
                self.deps.presence.send_to(member, event.clone()).await;
            }
        }
        Ok(())
    }

    /// 转发客户端的群资料更新提示（例如头像上传完成后）。
    pub async fn relay_group_updated(
        &self,
        group_id: Uuid,
        from: Uuid,
    ) -> Result<(), ApplicationError> {
        let from = UserId::from(from);
        let group = self.find_group(GroupId::from(group_id)).await?;
        if !group.is_member(from) {
            return Err(DomainError::NotGroupMember.into());
        }
        self.notify_members(&group, from).await;
        Ok(())
    }

    pub async fn get_group(&self, group_id: Uuid) -> Result<Group, ApplicationError> {
        self.find_group(GroupId::from(group_id)).await
    }

    pub async fn list_groups_for(&self, user_id: Uuid) -> Result<Vec<Group>, ApplicationError> {
        let groups = self
            .deps
            .group_repository
            .list_for_member(UserId::from(user_id))
            .await?;
        Ok(groups)
    }
}
