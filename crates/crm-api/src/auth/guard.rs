//! 접근 제어.
//!
//! Bearer 토큰을 사용자로 해석하고 요구 역할을 확인합니다.
//! 보호된 모든 엔드포인트 앞에서 호출되는 단일 관문입니다.

use std::sync::Arc;

use crm_core::User;
use tracing::{debug, warn};

use super::{InvalidToken, TokenError, TokenService};
use crate::repository::{IdentityStore, StoreError};

/// 인증/인가 에러.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// 사용자 이름, 비밀번호, 역할 조합이 일치하지 않음
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// 형식 오류, 서명 불일치, 알고리즘 불일치, 만료
    #[error("Could not validate credentials")]
    InvalidToken,
    /// 토큰의 사용자가 더 이상 존재하지 않음
    #[error("User not found")]
    IdentityNotFound,
    /// 관리자 권한 필요
    #[error("Not enough permissions")]
    InsufficientRole,
    /// 저장소 장애
    #[error("저장소 오류: {0}")]
    Storage(#[from] StoreError),
    /// 토큰 발급 실패
    #[error("토큰 발급 실패: {0}")]
    TokenIssue(#[from] TokenError),
}

impl From<InvalidToken> for AuthError {
    fn from(_: InvalidToken) -> Self {
        AuthError::InvalidToken
    }
}

/// 토큰 기반 접근 관문.
///
/// 호출마다 저장소에서 사용자를 다시 읽으므로 삭제나 역할 변경이
/// 다음 요청부터 바로 적용됩니다.
#[derive(Clone)]
pub struct AccessGuard {
    tokens: Arc<TokenService>,
    store: Arc<dyn IdentityStore>,
}

impl AccessGuard {
    pub fn new(tokens: Arc<TokenService>, store: Arc<dyn IdentityStore>) -> Self {
        Self { tokens, store }
    }

    /// 토큰을 사용자로 해석합니다.
    ///
    /// 순서: 토큰 검증 -> 사용자 조회 -> 역할 확인.
    pub async fn resolve(&self, token: &str, require_admin: bool) -> Result<User, AuthError> {
        let user_id = self.tokens.verify(token)?;

        let user = self
            .store
            .find_identity_by_id(user_id)
            .await
            .map_err(|e| {
                warn!(user_id, error = %e, "Identity lookup failed");
                AuthError::Storage(e)
            })?
            .ok_or_else(|| {
                debug!(user_id, "Token subject no longer exists");
                AuthError::IdentityNotFound
            })?;

        if !user.satisfies_role(require_admin) {
            debug!(user_id, "Admin role required");
            return Err(AuthError::InsufficientRole);
        }

        Ok(user)
    }
}
