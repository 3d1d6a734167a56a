//! 기본 관리자 계정 생성.
//!
//! 관리자가 한 명도 없을 때만 계정을 만듭니다. 서버 시작 전에
//! `create-default-admin` 바이너리로 실행합니다.

use crm_core::{NewUser, User};
use tracing::info;

use crate::auth::{PasswordError, PasswordHasher};
use crate::repository::{StoreError, UserStore};

/// 부트스트랩 에러.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("관리자 계정 이름이 비어 있습니다")]
    EmptyUsername,
    #[error("관리자 비밀번호가 비어 있습니다")]
    EmptyPassword,
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error(transparent)]
    Hashing(#[from] PasswordError),
}

/// 부트스트랩 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// 관리자가 이미 존재하여 아무것도 하지 않음
    AlreadyExists,
    /// 새 관리자 계정 생성
    Created(User),
}

/// 관리자가 없으면 기본 관리자 계정을 생성합니다.
pub async fn create_default_admin(
    store: &dyn UserStore,
    hasher: &PasswordHasher,
    username: &str,
    password: &str,
) -> Result<BootstrapOutcome, BootstrapError> {
    if username.trim().is_empty() {
        return Err(BootstrapError::EmptyUsername);
    }
    if password.is_empty() {
        return Err(BootstrapError::EmptyPassword);
    }

    let admins = store.count_admins().await?;
    if admins > 0 {
        info!(admins, "Admin account already exists, skipping");
        return Ok(BootstrapOutcome::AlreadyExists);
    }

    let user = store
        .create_user(NewUser {
            username: username.to_string(),
            hashed_password: hasher.hash(password)?,
            is_admin: true,
        })
        .await?;

    info!(user_id = user.id, username = %user.username, "Default admin created");
    Ok(BootstrapOutcome::Created(user))
}
