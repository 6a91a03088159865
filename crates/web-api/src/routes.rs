//! REST 路由
//!
//! 外围的请求/响应型操作：账号、资料、社交关系、群组管理、
//! 历史消息和删除。实时事件走 `/api/v1/ws` 的 WebSocket 通道。

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use application::services::{
    AddMembersRequest, AuthenticateUserRequest, ClearChatRequest, CreateGroupRequest,
    DeleteGroupRequest, DeleteMessageRequest, DeleteMode, HistoryRequest, LeaveGroupRequest,
    RegisterUserRequest, RemoveMemberRequest, RequestFollowRequest, RespondFollowRequest,
    UnfriendRequest, UpdateGroupRequest, UpdateProfileRequest,
};
use domain::{Group, Message, User};

use crate::{error::ApiError, state::AppState, websocket::websocket_upgrade, LoginResponse};

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    name: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct UpdateProfilePayload {
    name: Option<String>,
    about: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FollowPayload {
    target: Uuid,
}

#[derive(Debug, Deserialize)]
struct RespondFollowPayload {
    requester: Uuid,
    accept: bool,
}

#[derive(Debug, Deserialize)]
struct CreateGroupPayload {
    name: String,
    member_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
struct UpdateGroupPayload {
    name: Option<String>,
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddMembersPayload {
    member_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
struct ChatQuery {
    chat_id: Uuid,
    is_group: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum DeleteModePayload {
    Me,
    Everyone,
}

#[derive(Debug, Deserialize)]
struct DeleteMessagePayload {
    msg_id: Uuid,
    mode: DeleteModePayload,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register_user))
        .route("/auth/login", post(login_user))
        .route("/users", get(list_users))
        .route("/users/{user_id}", get(get_user))
        .route("/users/profile", put(update_profile))
        .route("/users/follow", post(request_follow))
        .route("/users/follow/respond", post(respond_follow))
        .route("/users/unfriend", post(unfriend))
        .route("/groups", post(create_group).get(list_groups))
        .route("/groups/{group_id}", get(get_group).put(update_group).delete(delete_group))
        .route("/groups/{group_id}/members", post(add_members))
        .route("/groups/{group_id}/members/{user_id}", axum::routing::delete(remove_member))
        .route("/groups/{group_id}/leave", post(leave_group))
        .route("/messages", get(get_history))
        .route("/messages/delete", post(delete_message))
        .route("/messages/clear", post(clear_chat))
        .route("/ws", get(websocket_upgrade))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state
        .user_service
        .register(RegisterUserRequest {
            name: payload.name,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .user_service
        .authenticate(AuthenticateUserRequest {
            email: payload.email,
            password: payload.password,
        })
        .await?;

    let token = state.jwt_service.generate_token(user.id.into())?;
    Ok(Json(LoginResponse { user, token }))
}

async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.user_service.list_users().await?;
    Ok(Json(users))
}

async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    let user = state.user_service.get_user(user_id).await?;
    Ok(Json(user))
}

async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<Json<User>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let user = state
        .user_service
        .update_profile(UpdateProfileRequest {
            user_id,
            name: payload.name,
            about: payload.about,
            avatar_url: payload.avatar_url,
        })
        .await?;
    Ok(Json(user))
}

async fn request_follow(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<FollowPayload>,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state
        .user_service
        .request_follow(RequestFollowRequest {
            sender_id: user_id,
            target_id: payload.target,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn respond_follow(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RespondFollowPayload>,
) -> Result<Json<User>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let user = state
        .user_service
        .respond_follow(RespondFollowRequest {
            user_id,
            requester_id: payload.requester,
            accept: payload.accept,
        })
        .await?;
    Ok(Json(user))
}

async fn unfriend(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<FollowPayload>,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state
        .user_service
        .unfriend(UnfriendRequest {
            user_id,
            target_id: payload.target,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateGroupPayload>,
) -> Result<(StatusCode, Json<Group>), ApiError> {
    let admin_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let group = state
        .group_service
        .create_group(CreateGroupRequest {
            name: payload.name,
            member_ids: payload.member_ids,
            admin_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(group)))
}

async fn list_groups(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Group>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let groups = state.group_service.list_groups_for(user_id).await?;
    Ok(Json(groups))
}

async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Group>, ApiError> {
    let group = state.group_service.get_group(group_id).await?;
    Ok(Json(group))
}

async fn update_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<UpdateGroupPayload>,
) -> Result<Json<Group>, ApiError> {
    let operator_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let group = state
        .group_service
        .update_group(UpdateGroupRequest {
            group_id,
            operator_id,
            name: payload.name,
            icon: payload.icon,
        })
        .await?;
    Ok(Json(group))
}

async fn delete_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(group_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let operator_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state
        .group_service
        .delete_group(DeleteGroupRequest {
            group_id,
            operator_id,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_members(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<AddMembersPayload>,
) -> Result<Json<Group>, ApiError> {
    let operator_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let group = state
        .group_service
        .add_members(AddMembersRequest {
            group_id,
            operator_id,
            member_ids: payload.member_ids,
        })
        .await?;
    Ok(Json(group))
}

async fn remove_member(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Group>, ApiError> {
    let operator_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let group = state
        .group_service
        .remove_member(RemoveMemberRequest {
            group_id,
            operator_id,
            target_id: user_id,
        })
        .await?;
    Ok(Json(group))
}

async fn leave_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(group_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state
        .group_service
        .leave_group(LeaveGroupRequest { group_id, user_id })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ChatQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let requester_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let messages = state
        .message_service
        .history(HistoryRequest {
            requester_id,
            chat_id: query.chat_id,
            is_group: query.is_group,
        })
        .await?;
    Ok(Json(messages))
}

async fn delete_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<DeleteMessagePayload>,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let mode = match payload.mode {
        DeleteModePayload::Me => DeleteMode::Me,
        DeleteModePayload::Everyone => DeleteMode::Everyone,
    };
    state
        .message_service
        .delete_message(DeleteMessageRequest {
            msg_id: payload.msg_id,
            user_id,
            mode,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ChatQuery>,
) -> Result<StatusCode, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state
        .message_service
        .clear_chat(ClearChatRequest {
            user_id,
            chat_id: query.chat_id,
            is_group: query.is_group,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
