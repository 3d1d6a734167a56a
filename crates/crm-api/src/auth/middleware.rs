//! Axum용 인증 추출기.
//!
//! `Authorization: Bearer <token>` 헤더를 읽어 [`AccessGuard`](super::AccessGuard)로
//! 사용자를 해석합니다. 헤더가 없거나 형식이 잘못되면 유효하지 않은 토큰으로 취급합니다.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use crm_core::User;
use tracing::error;

use super::AuthError;
use crate::error::ApiErrorResponse;
use crate::state::AppState;

/// 인증된 사용자 추출기 (역할 무관).
///
/// # 사용 예시
///
/// ```rust,ignore
/// async fn handler(CurrentUser(user): CurrentUser) -> impl IntoResponse {
///     format!("Authenticated user: {}", user.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// 관리자 권한을 요구하는 추출기.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl AuthError {
    /// HTTP 상태 코드와 에러 코드.
    ///
    /// 토큰 해석 실패(형식 오류, 만료, 사용자 없음)는 모두 401입니다.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AuthError::InvalidToken | AuthError::IdentityNotFound => {
                (StatusCode::UNAUTHORIZED, "INVALID_TOKEN")
            }
            AuthError::InsufficientRole => (StatusCode::FORBIDDEN, "INSUFFICIENT_PERMISSION"),
            AuthError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DB_ERROR"),
            AuthError::TokenIssue(_) => (StatusCode::INTERNAL_SERVER_ERROR, "TOKEN_ERROR"),
        }
    }
}

impl From<AuthError> for (StatusCode, Json<ApiErrorResponse>) {
    fn from(err: AuthError) -> Self {
        let (status, code) = err.status_and_code();
        let message = match &err {
            // 사용자 없음과 토큰 오류는 같은 메시지
            AuthError::IdentityNotFound => AuthError::InvalidToken.to_string(),
            AuthError::Storage(_) | AuthError::TokenIssue(_) => {
                error!(error = %err, "Authentication infrastructure failure");
                "Internal server error".to_string()
            }
            _ => err.to_string(),
        };

        (status, Json(ApiErrorResponse::new(code, message)))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let unauthorized = self.status_and_code().0 == StatusCode::UNAUTHORIZED;
        let (status, body) = <(StatusCode, Json<ApiErrorResponse>)>::from(self);

        if unauthorized {
            (status, [("WWW-Authenticate", "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

/// `Authorization` 헤더에서 Bearer 토큰 추출.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

async fn resolve_from_parts(
    parts: &Parts,
    state: &Arc<AppState>,
    require_admin: bool,
) -> Result<User, AuthError> {
    let token = bearer_token(&parts.headers).ok_or(AuthError::InvalidToken)?;
    state.auth.require_identity(token, require_admin).await
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        resolve_from_parts(parts, state, false).await.map(CurrentUser)
    }
}

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        resolve_from_parts(parts, state, true).await.map(AdminUser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AuthError::InvalidCredentials.status_and_code().0, StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::InvalidToken.status_and_code().0, StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::IdentityNotFound.status_and_code().0, StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::InsufficientRole.status_and_code().0, StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::Storage(crate::repository::StoreError::Database(sqlx::Error::PoolTimedOut))
                .status_and_code()
                .0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_identity_not_found_indistinguishable_from_invalid_token() {
        let (_, Json(missing)) = <(StatusCode, Json<ApiErrorResponse>)>::from(AuthError::IdentityNotFound);
        let (_, Json(invalid)) = <(StatusCode, Json<ApiErrorResponse>)>::from(AuthError::InvalidToken);

        assert_eq!(missing.code, invalid.code);
        assert_eq!(missing.message, invalid.message);
    }
}
