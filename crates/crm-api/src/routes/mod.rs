//! API 라우트.
//!
//! 모든 REST API 엔드포인트를 정의하고 라우터를 구성합니다.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 상세 헬스 체크 (readiness)
//! - `/robots.txt` - 크롤러 차단
//! - `{prefix}/login`, `{prefix}/admin/login`, `{prefix}/token/refresh` - 인증
//! - `{prefix}/users` - 사용자 관리 (관리자)
//! - `{prefix}/customers` - 고객 관리

pub mod auth;
pub mod customers;
pub mod health;
pub mod users;

pub use auth::{auth_router, LoginForm, RefreshTokenRequest, TokenResponse};
pub use customers::{customers_router, CreateCustomerRequest, CustomerDeletedResponse, UpdateCustomerRequest};
pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};
pub use users::{users_router, CreateUserRequest, DeletedResponse, UpdateUserRequest, UserResponse};

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::state::AppState;

const ROBOTS_TXT: &str = "User-agent: *\nDisallow: /";

async fn robots_txt() -> &'static str {
    ROBOTS_TXT
}

/// 전체 API 라우터 생성.
///
/// 헬스 체크와 robots.txt는 루트에, 나머지는 `api_prefix` 아래에 둡니다.
pub fn create_api_router(api_prefix: &str) -> Router<Arc<AppState>> {
    let api = Router::new()
        .merge(auth_router())
        .nest("/users", users_router())
        .nest("/customers", customers_router());

    let router = Router::new()
        .route("/robots.txt", get(robots_txt))
        .nest("/health", health_router());

    match normalize_prefix(api_prefix) {
        Some(prefix) => router.nest(&prefix, api),
        None => router.merge(api),
    }
}

/// `"/api/v1/"` -> `Some("/api/v1")`, `"/"` 또는 `""` -> `None`.
pub(crate) fn normalize_prefix(api_prefix: &str) -> Option<String> {
    let trimmed = api_prefix.trim().trim_matches('/');
    (!trimmed.is_empty()).then(|| format!("/{}", trimmed))
}
