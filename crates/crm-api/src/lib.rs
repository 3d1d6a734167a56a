//! 사용자/고객 관리 REST API 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Axum 기반 REST API
//! - 토큰 인증과 역할 기반 접근 제어
//! - PostgreSQL 저장소와 테스트용 메모리 저장소
//! - S3 호환 오브젝트 스토리지 (고객 사진)
//! - 헬스 체크 엔드포인트
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: REST API 엔드포인트
//! - [`auth`]: 비밀번호 해싱, 토큰, 인증, 접근 제어
//! - [`repository`]: 사용자/고객 저장소
//! - [`storage`]: 오브젝트 스토리지
//! - [`bootstrap`]: 기본 관리자 계정 생성
//! - [`openapi`]: OpenAPI 문서 및 Swagger UI

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod openapi;
pub mod repository;
pub mod routes;
pub mod state;
pub mod storage;

pub use auth::{
    AccessGuard, AdminUser, AuthError, AuthService, Authenticator, CurrentUser, PasswordHasher,
    PasswordScheme, TokenService, TokenSettings,
};
pub use bootstrap::{create_default_admin, BootstrapError, BootstrapOutcome};
pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use repository::{CustomerStore, IdentityStore, StoreError, UserStore};
pub use routes::create_api_router;
pub use state::AppState;

#[cfg(any(test, feature = "test-utils"))]
pub use state::{create_test_state, TestContext};
