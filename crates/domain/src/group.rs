use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{GroupId, Timestamp, UserId};

/// 聊天群组。
///
/// 成员列表唯一且无序；有且仅有一个管理员，管理员必须是成员。
/// 改名、换图标、增删成员、解散群组只有管理员可以执行，
/// 普通成员只能自行退出。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub members: Vec<UserId>,
    pub admin: UserId,
    pub icon: Option<String>,
    pub created_at: Timestamp,
}

impl Group {
    pub fn new(
        id: GroupId,
        name: impl Into<String>,
        members: Vec<UserId>,
        admin: UserId,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::invalid_argument("name", "cannot be empty"));
        }

        // 管理员始终在成员列表里，重复成员去重
        let mut unique = Vec::with_capacity(members.len() + 1);
        for member in members.into_iter().chain(std::iter::once(admin)) {
            if !unique.contains(&member) {
                unique.push(member);
            }
        }

        Ok(Self {
            id,
            name,
            members: unique,
            admin,
            icon: None,
            created_at,
        })
    }

    pub fn is_member(&self, user: UserId) -> bool {
        self.members.contains(&user)
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        self.admin == user
    }

    /// 除指定用户外的成员数，用于送达/已读阈值计算。
    pub fn others_count(&self, user: UserId) -> usize {
        self.members
            .iter()
            .filter(|member| **member != user)
            .count()
    }

    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::invalid_argument("name", "cannot be empty"));
        }
        self.name = name;
        Ok(())
    }

    pub fn set_icon(&mut self, icon: impl Into<String>) {
        self.icon = Some(icon.into());
    }

    /// 添加新成员，已在群里的跳过，返回真正新增的成员。
    pub fn add_members(&mut self, candidates: Vec<UserId>) -> Vec<UserId> {
        let mut added = Vec::new();
        for candidate in candidates {
            if !self.members.contains(&candidate) {
                self.members.push(candidate);
                added.push(candidate);
            }
        }
        added
    }

    /// 移除一个成员。管理员不能被移除，只能解散群组。
    pub fn remove_member(&mut self, user: UserId) -> Result<(), DomainError> {
        if user == self.admin {
            return Err(DomainError::OperationNotAllowed);
        }
        let before = self.members.len();
        self.members.retain(|member| *member != user);
        if self.members.len() == before {
            return Err(DomainError::NotGroupMember);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user() -> UserId {
        UserId::from(Uuid::new_v4())
    }

    fn group(admin: UserId, others: Vec<UserId>) -> Group {
        Group::new(
            GroupId::from(Uuid::new_v4()),
            "team",
            others,
            admin,
            chrono::Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn admin_is_always_a_member() {
        let admin = user();
        let g = group(admin, vec![]);
        assert!(g.is_member(admin));
        assert_eq!(g.members.len(), 1);
    }

    #[test]
    fn duplicate_members_collapse() {
        let admin = user();
        let b = user();
        let g = group(admin, vec![b, b, admin]);
        assert_eq!(g.members.len(), 2);
    }

    #[test]
    fn others_count_excludes_given_user() {
        let admin = user();
        let b = user();
        let c = user();
        let g = group(admin, vec![b, c]);
        assert_eq!(g.others_count(admin), 2);
        assert_eq!(g.others_count(b), 2);
    }

    #[test]
    fn admin_cannot_be_removed() {
        let admin = user();
        let b = user();
        let mut g = group(admin, vec![b]);
        assert_eq!(
            g.remove_member(admin),
            Err(DomainError::OperationNotAllowed)
        );
        assert!(g.remove_member(b).is_ok());
        assert!(!g.is_member(b));
    }

    #[test]
    fn add_members_reports_only_new_ones() {
        let admin = user();
        let b = user();
        let c = user();
        let mut g = group(admin, vec![b]);
        let added = g.add_members(vec![b, c]);
        assert_eq!(added, vec![c]);
        assert_eq!(g.members.len(), 3);
    }
}
