//! 用户账号与社交关系
//!
//! 注册/登录/资料更新是简单的请求/响应操作；关注请求在
//! 落库之后通过在线状态注册表给对方实时提示。

use std::sync::Arc;

use domain::{DomainError, User, UserEmail, UserId, Username};
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::ApplicationError,
    events::ServerEvent,
    password::PasswordHasher,
    presence::PresenceRegistry,
    repository::UserRepository,
};

#[derive(Debug, Clone)]
pub struct RegisterUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AuthenticateUserRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct UpdateProfileRequest {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub about: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RequestFollowRequest {
    pub sender_id: Uuid,
    pub target_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct RespondFollowRequest {
    pub user_id: Uuid,
    pub requester_id: Uuid,
    pub accept: bool,
}

#[derive(Debug, Clone)]
pub struct UnfriendRequest {
    pub user_id: Uuid,
    pub target_id: Uuid,
}

pub struct UserServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub presence: Arc<PresenceRegistry>,
    pub clock: Arc<dyn Clock>,
}

pub struct UserService {
    deps: UserServiceDependencies,
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self { deps }
    }

    async fn find_user(&self, user_id: UserId) -> Result<User, ApplicationError> {
        self.deps
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound.into())
    }

    pub async fn register(&self, request: RegisterUserRequest) -> Result<User, ApplicationError> {
        let name = Username::parse(request.name)?;
        let email = UserEmail::parse(request.email)?;

        if self
            .deps
            .user_repository
            .find_by_email(&email)
            .await?
            .is_some()
        {
            return Err(DomainError::UserAlreadyExists.into());
        }

        let hashed = self.deps.password_hasher.hash(&request.password).await?;
        let user = User::new(
            UserId::from(Uuid::new_v4()),
            name,
            email,
            hashed,
            self.deps.clock.now(),
        );

        let stored = self.deps.user_repository.create(user).await?;
        tracing::info!(user_id = %stored.id, "新用户注册");
        Ok(stored)
    }

    pub async fn authenticate(
        &self,
        request: AuthenticateUserRequest,
    ) -> Result<User, ApplicationError> {
        let email = UserEmail::parse(request.email)?;
        let user = self
            .deps
            .user_repository
            .find_by_email(&email)
            .await?
            .ok_or(ApplicationError::Authentication)?;

        let valid = self
            .deps
            .password_hasher
            .verify(&request.password, &user.password_hash)
            .await?;
        if !valid {
            return Err(ApplicationError::Authentication);
        }
        Ok(user)
    }

    pub async fn update_profile(
        &self,
        request: UpdateProfileRequest,
    ) -> Result<User, ApplicationError> {
        let mut user = self.find_user(UserId::from(request.user_id)).await?;

        if let Some(name) = request.name {
            user.name = Username::parse(name)?;
        }
        if let Some(about) = request.about {
            user.about = about;
        }
        if let Some(avatar_url) = request.avatar_url {
            user.avatar_url = Some(avatar_url);
        }

        let updated = self.deps.user_repository.update(user).await?;
        Ok(updated)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User, ApplicationError> {
        self.find_user(UserId::from(user_id)).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, ApplicationError> {
        let users = self.deps.user_repository.list_all().await?;
        Ok(users)
    }

    /// 发送关注请求，目标在线则实时提示。
    pub async fn request_follow(
        &self,
        request: RequestFollowRequest,
    ) -> Result<(), ApplicationError> {
        let sender = UserId::from(request.sender_id);
        let mut target = self.find_user(UserId::from(request.target_id)).await?;

        target.add_follow_request(sender)?;
        self.deps.user_repository.update(target.clone()).await?;

        self.deps
            .presence
            .send_to(target.id, ServerEvent::NewFollowRequest { from: sender })
            .await;
        Ok(())
    }

    /// 处理关注请求。接受则双方建立双向关系并提示请求方。
    pub async fn respond_follow(
        &self,
        request: RespondFollowRequest,
    ) -> Result<User, ApplicationError> {
        let requester_id = UserId::from(request.requester_id);
        let mut me = self.find_user(UserId::from(request.user_id)).await?;

        let accepted = me.resolve_follow_request(requester_id, request.accept);
        let me = self.deps.user_repository.update(me).await?;

        if accepted {
            let mut requester = self.find_user(requester_id).await?;
            requester.add_mutual_follow(me.id);
            self.deps.user_repository.update(requester).await?;

            self.deps
                .presence
                .send_to(
                    requester_id,
                    ServerEvent::FollowRequestAccepted { from: me.id },
                )
                .await;
        }
        Ok(me)
    }

    /// 解除好友关系，双向移除后提示对方刷新侧栏。
    pub async fn unfriend(&self, request: UnfriendRequest) -> Result<(), ApplicationError> {
        let user_id = UserId::from(request.user_id);
        let target_id = UserId::from(request.target_id);

        let mut me = self.find_user(user_id).await?;
        me.remove_relation(target_id);
        self.deps.user_repository.update(me).await?;

        let mut target = self.find_user(target_id).await?;
        target.remove_relation(user_id);
        self.deps.user_repository.update(target).await?;

        self.deps
            .presence
            .send_to(target_id, ServerEvent::FriendRemoved { friend_id: user_id })
            .await;
        Ok(())
    }
}
