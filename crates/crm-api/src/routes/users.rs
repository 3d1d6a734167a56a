//! 사용자 관리 endpoint (관리자 전용).
//!
//! - `GET /users` - 사용자 목록
//! - `GET /users/{id}` - 사용자 조회
//! - `POST /users` - 사용자 생성
//! - `PUT /users/{id}` - 사용자 수정
//! - `DELETE /users/{id}` - 사용자 삭제

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use crm_core::{NewUser, User, UserChanges, UserId};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AdminUser;
use crate::error::{api_error, not_found, validation_error, ApiErrorResponse, ApiResult};
use crate::state::AppState;

/// 사용자 응답 (비밀번호 해시 제외).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub is_admin: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            is_admin: user.is_admin,
        }
    }
}

/// 사용자 생성 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, message = "username은 비어 있을 수 없습니다"))]
    pub username: String,
    #[validate(length(min = 1, message = "password는 비어 있을 수 없습니다"))]
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// 사용자 수정 요청. 지정한 필드만 변경됩니다.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, message = "username은 비어 있을 수 없습니다"))]
    pub username: Option<String>,
    #[validate(length(min = 1, message = "password는 비어 있을 수 없습니다"))]
    pub password: Option<String>,
    pub is_admin: Option<bool>,
}

/// 삭제 결과.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeletedResponse {
    pub detail: String,
}

fn hash_password(state: &AppState, password: &str) -> ApiResult<String> {
    state.auth.hasher().hash(password).map_err(|e| {
        tracing::error!(error = %e, "Password hashing failed");
        api_error(
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            "HASH_ERROR",
            "Internal server error",
        )
    })
}

/// 사용자 목록.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "사용자 목록", body = Vec<UserResponse>),
        (status = 401, description = "인증 필요", body = ApiErrorResponse),
        (status = 403, description = "관리자 권한 필요", body = ApiErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Json<Vec<UserResponse>>> {
    let users = state.users.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// 사용자 조회.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = i32, Path, description = "사용자 ID")),
    responses(
        (status = 200, description = "사용자", body = UserResponse),
        (status = 404, description = "사용자 없음", body = ApiErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<UserId>,
) -> ApiResult<Json<UserResponse>> {
    let user = state
        .users
        .get_user(id)
        .await?
        .ok_or_else(|| not_found("User not found"))?;

    Ok(Json(user.into()))
}

/// 사용자 생성.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "생성된 사용자", body = UserResponse),
        (status = 400, description = "입력 오류", body = ApiErrorResponse),
        (status = 409, description = "사용자 이름 중복", body = ApiErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    request.validate().map_err(|e| validation_error(&e))?;

    let hashed_password = hash_password(&state, &request.password)?;
    let user = state
        .users
        .create_user(NewUser {
            username: request.username,
            hashed_password,
            is_admin: request.is_admin,
        })
        .await?;

    info!(user_id = user.id, is_admin = user.is_admin, by = admin.id, "User created");
    Ok(Json(user.into()))
}

/// 사용자 수정.
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id" = i32, Path, description = "사용자 ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "수정된 사용자", body = UserResponse),
        (status = 404, description = "사용자 없음", body = ApiErrorResponse),
        (status = 409, description = "사용자 이름 중복", body = ApiErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<UserId>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    request.validate().map_err(|e| validation_error(&e))?;

    let hashed_password = match request.password.as_deref() {
        Some(password) => Some(hash_password(&state, password)?),
        None => None,
    };

    let changes = UserChanges {
        username: request.username,
        hashed_password,
        is_admin: request.is_admin,
    };

    // 변경 사항이 없으면 쓰기 없이 현재 레코드를 반환
    if changes.is_empty() {
        let user = state
            .users
            .get_user(id)
            .await?
            .ok_or_else(|| not_found("User not found"))?;
        return Ok(Json(user.into()));
    }

    let user = state
        .users
        .update_user(id, changes)
        .await?
        .ok_or_else(|| not_found("User not found"))?;

    info!(user_id = id, by = admin.id, "User updated");
    Ok(Json(user.into()))
}

/// 사용자 삭제.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = i32, Path, description = "사용자 ID")),
    responses(
        (status = 200, description = "삭제 완료", body = DeletedResponse),
        (status = 404, description = "사용자 없음", body = ApiErrorResponse),
        (status = 409, description = "고객이 참조 중인 사용자", body = ApiErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<UserId>,
) -> ApiResult<Json<DeletedResponse>> {
    if !state.users.delete_user(id).await? {
        return Err(not_found("User not found"));
    }

    info!(user_id = id, by = admin.id, "User deleted");
    Ok(Json(DeletedResponse {
        detail: "User deleted".to_string(),
    }))
}

/// 사용자 라우터 생성.
pub fn users_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
}
