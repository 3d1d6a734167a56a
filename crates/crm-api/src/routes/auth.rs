//! 로그인 및 토큰 갱신 endpoint.
//!
//! - `POST /login` - 일반 사용자 로그인 (form)
//! - `POST /admin/login` - 관리자 로그인 (form)
//! - `POST /token/refresh` - 유효한 토큰으로 새 토큰 발급

use std::sync::Arc;

use axum::{extract::State, routing::post, Form, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AuthError;
use crate::error::{validation_error, ApiErrorResponse, ApiResult};
use crate::state::AppState;

/// 로그인 폼.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginForm {
    #[validate(length(min = 1, message = "username은 비어 있을 수 없습니다"))]
    pub username: String,
    #[validate(length(min = 1, message = "password는 비어 있을 수 없습니다"))]
    pub password: String,
}

/// 토큰 갱신 요청.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// 토큰 응답.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    /// 항상 "bearer"
    pub token_type: String,
}

impl TokenResponse {
    fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

async fn login(state: &AppState, form: LoginForm, is_admin: bool) -> ApiResult<Json<TokenResponse>> {
    form.validate().map_err(|e| validation_error(&e))?;

    match state.auth.login(&form.username, &form.password, is_admin).await {
        Ok(token) => {
            info!(username = %form.username, is_admin, "Login successful");
            Ok(Json(TokenResponse::bearer(token)))
        }
        Err(AuthError::InvalidCredentials) => {
            warn!(username = %form.username, is_admin, "Login failed");
            Err(AuthError::InvalidCredentials.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// 일반 사용자 로그인.
#[utoipa::path(
    post,
    path = "/api/v1/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "로그인 성공", body = TokenResponse),
        (status = 401, description = "자격 증명 불일치", body = ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn user_login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> ApiResult<Json<TokenResponse>> {
    login(&state, form, false).await
}

/// 관리자 로그인.
#[utoipa::path(
    post,
    path = "/api/v1/admin/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "로그인 성공", body = TokenResponse),
        (status = 401, description = "자격 증명 불일치", body = ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> ApiResult<Json<TokenResponse>> {
    login(&state, form, true).await
}

/// 토큰 갱신.
///
/// 아직 만료되지 않은 토큰이면 같은 사용자에게 새 토큰을 발급합니다.
#[utoipa::path(
    post,
    path = "/api/v1/token/refresh",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "갱신 성공", body = TokenResponse),
        (status = 401, description = "유효하지 않은 토큰", body = ApiErrorResponse)
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshTokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let token = state.auth.refresh_token(&request.refresh_token).map_err(|e| {
        warn!("Invalid refresh token used");
        e
    })?;

    info!("Access token refreshed");
    Ok(Json(TokenResponse::bearer(token)))
}

/// 인증 라우터 생성.
pub fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(user_login))
        .route("/admin/login", post(admin_login))
        .route("/token/refresh", post(refresh_token))
}
