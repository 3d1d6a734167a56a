//! 인증 및 권한 부여.
//!
//! # 구성 요소
//!
//! - [`PasswordHasher`]: 비밀번호 해싱/검증 (argon2id, bcrypt)
//! - [`TokenService`]: Access Token 발급/검증
//! - [`Authenticator`]: 사용자 이름 + 역할 + 비밀번호 인증
//! - [`AccessGuard`]: 토큰을 사용자로 해석하고 역할 확인
//! - [`CurrentUser`], [`AdminUser`]: Axum 핸들러용 추출기
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! async fn protected_handler(CurrentUser(user): CurrentUser) -> impl IntoResponse {
//!     format!("Hello, {}!", user.username)
//! }
//! ```

mod authenticator;
mod guard;
mod jwt;
mod middleware;
mod password;

use std::sync::Arc;

use chrono::Duration;
use crm_core::{User, UserId};
use tracing::info;

pub use authenticator::Authenticator;
pub use guard::{AccessGuard, AuthError};
pub use jwt::{
    AccessClaims, Clock, FixedClock, InvalidToken, SystemClock, TokenError, TokenService,
    TokenSettings, SUPPORTED_ALGORITHMS,
};
pub use middleware::{bearer_token, AdminUser, CurrentUser};
pub use password::{PasswordError, PasswordHasher, PasswordScheme, DEFAULT_BCRYPT_COST};

use crate::repository::{IdentityStore, StoreResult};

/// HTTP 계층에 노출되는 인증 코어.
///
/// 토큰 서비스, 해셔, 신원 저장소를 한 번 구성해 공유합니다.
#[derive(Clone)]
pub struct AuthService {
    tokens: Arc<TokenService>,
    hasher: PasswordHasher,
    authenticator: Authenticator,
    guard: AccessGuard,
}

impl AuthService {
    pub fn new(tokens: TokenService, hasher: PasswordHasher, store: Arc<dyn IdentityStore>) -> Self {
        let tokens = Arc::new(tokens);
        info!(
            algorithm = ?tokens.algorithm(),
            default_ttl_minutes = tokens.default_ttl().num_minutes(),
            password_scheme = %hasher.scheme(),
            "Auth service configured"
        );

        Self {
            authenticator: Authenticator::new(store.clone(), hasher),
            guard: AccessGuard::new(tokens.clone(), store),
            tokens,
            hasher,
        }
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// 자격 증명 인증. 일치하지 않으면 `Ok(None)`.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        is_admin: bool,
    ) -> StoreResult<Option<User>> {
        self.authenticator.authenticate(username, password, is_admin).await
    }

    /// 자격 증명 인증 후 토큰 발급. 일치하지 않으면 `InvalidCredentials`.
    pub async fn login(&self, username: &str, password: &str, is_admin: bool) -> Result<String, AuthError> {
        let user = self
            .authenticate(username, password, is_admin)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        Ok(self.issue_token(user.id, None)?)
    }

    /// Access Token 발급. `ttl`이 없으면 설정된 기본값.
    pub fn issue_token(&self, subject: UserId, ttl: Option<Duration>) -> Result<String, TokenError> {
        self.tokens.issue(subject, ttl)
    }

    /// Access Token 검증.
    pub fn verify_token(&self, token: &str) -> Result<UserId, InvalidToken> {
        self.tokens.verify(token)
    }

    /// 아직 유효한 토큰으로 같은 사용자의 새 토큰을 발급합니다.
    pub fn refresh_token(&self, token: &str) -> Result<String, AuthError> {
        let subject = self.verify_token(token)?;
        Ok(self.issue_token(subject, None)?)
    }

    /// 토큰을 사용자로 해석하고 역할을 확인합니다.
    pub async fn require_identity(&self, token: &str, is_admin: bool) -> Result<User, AuthError> {
        self.guard.resolve(token, is_admin).await
    }
}
