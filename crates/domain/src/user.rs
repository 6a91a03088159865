use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{PasswordHash, Timestamp, UserEmail, UserId, Username};

const DEFAULT_ABOUT: &str = "Hey there! I am using Messenger";

/// 注册用户。
///
/// 认证与资料管理属于外围功能；核心子系统只引用 `UserId`。
/// 社交关系（关注、粉丝、待处理请求）是简单的请求/响应数据。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: Username,
    pub email: UserEmail,
    #[serde(skip_serializing)]
    pub password_hash: PasswordHash,
    pub about: String,
    pub avatar_url: Option<String>,
    pub following: Vec<UserId>,
    pub followers: Vec<UserId>,
    pub follow_requests: Vec<UserId>,
    pub created_at: Timestamp,
}

impl User {
    pub fn new(
        id: UserId,
        name: Username,
        email: UserEmail,
        password_hash: PasswordHash,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            name,
            email,
            password_hash,
            about: DEFAULT_ABOUT.to_owned(),
            avatar_url: None,
            following: Vec::new(),
            followers: Vec::new(),
            follow_requests: Vec::new(),
            created_at,
        }
    }

    /// 收到一条关注请求。自关注、重复请求、已关注都拒绝。
    pub fn add_follow_request(&mut self, from: UserId) -> Result<(), DomainError> {
        if from == self.id {
            return Err(DomainError::invalid_argument("target", "cannot follow self"));
        }
        if self.followers.contains(&from) || self.follow_requests.contains(&from) {
            return Err(DomainError::OperationNotAllowed);
        }
        self.follow_requests.push(from);
        Ok(())
    }

    /// 处理一条待定请求，无论接受与否请求都被消费。
    /// 返回是否接受了请求。
    pub fn resolve_follow_request(&mut self, requester: UserId, accept: bool) -> bool {
        self.follow_requests.retain(|id| *id != requester);
        if accept {
            if !self.followers.contains(&requester) {
                self.followers.push(requester);
            }
            if !self.following.contains(&requester) {
                self.following.push(requester);
            }
        }
        accept
    }

    /// 接受方确认后，请求方也建立双向关系。
    pub fn add_mutual_follow(&mut self, other: UserId) {
        if !self.following.contains(&other) {
            self.following.push(other);
        }
        if !self.followers.contains(&other) {
            self.followers.push(other);
        }
    }

    /// 解除与某个用户的全部关系。
    pub fn remove_relation(&mut self, other: UserId) {
        self.following.retain(|id| *id != other);
        self.followers.retain(|id| *id != other);
        self.follow_requests.retain(|id| *id != other);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn make_user() -> User {
        User::new(
            UserId::from(Uuid::new_v4()),
            Username::parse("alice").unwrap(),
            UserEmail::parse("alice@example.com").unwrap(),
            PasswordHash::new("$2b$10$hash").unwrap(),
            chrono::Utc::now(),
        )
    }

    #[test]
    fn follow_request_rejects_self_and_duplicates() {
        let mut user = make_user();
        let requester = UserId::from(Uuid::new_v4());

        assert!(user.add_follow_request(user.id).is_err());
        assert!(user.add_follow_request(requester).is_ok());
        assert!(user.add_follow_request(requester).is_err());
    }

    #[test]
    fn resolving_request_consumes_it() {
        let mut user = make_user();
        let requester = UserId::from(Uuid::new_v4());
        user.add_follow_request(requester).unwrap();

        assert!(user.resolve_follow_request(requester, true));
        assert!(user.follow_requests.is_empty());
        assert!(user.followers.contains(&requester));
        assert!(user.following.contains(&requester));

        user.remove_relation(requester);
        assert!(user.followers.is_empty());
        assert!(user.following.is_empty());
    }
}
