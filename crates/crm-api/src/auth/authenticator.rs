//! 사용자 이름/비밀번호 인증.

use std::sync::{Arc, OnceLock};

use crm_core::User;
use tracing::debug;

use super::PasswordHasher;
use crate::repository::{IdentityStore, StoreResult};

/// 자격 증명 인증기.
///
/// 계정은 `(username, is_admin)` 쌍으로 조회하므로 일반 계정의 비밀번호로
/// 관리자 로그인을 할 수 없습니다. 사용자 없음, 역할 불일치, 비밀번호 불일치는
/// 모두 같은 결과(`None`)가 됩니다.
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn IdentityStore>,
    hasher: PasswordHasher,
    /// 계정이 없을 때 검증에 쓰는 해시. 첫 실패 시 설정된 방식으로 생성
    dummy_hash: Arc<OnceLock<Option<String>>>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn IdentityStore>, hasher: PasswordHasher) -> Self {
        Self {
            store,
            hasher,
            dummy_hash: Arc::new(OnceLock::new()),
        }
    }

    /// 계정이 없어도 비밀번호 검증 한 번의 비용을 치릅니다.
    ///
    /// 응답 시간으로 사용자 이름의 존재 여부를 구분할 수 없게 합니다.
    fn verify_against_dummy(&self, password: &str) {
        let dummy = self
            .dummy_hash
            .get_or_init(|| self.hasher.hash("dummy-password-for-missing-account").ok());
        if let Some(hash) = dummy {
            let _ = self.hasher.verify(password, hash);
        }
    }

    /// 자격 증명을 확인하고 일치하는 사용자를 반환합니다.
    ///
    /// 저장소 장애는 `Err`로 전파되며 "일치 없음"과 구분됩니다.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        require_admin: bool,
    ) -> StoreResult<Option<User>> {
        let Some(user) = self
            .store
            .find_identity_by_username_and_role(username, require_admin)
            .await?
        else {
            self.verify_against_dummy(password);
            debug!(require_admin, "Authentication failed: no matching account");
            return Ok(None);
        };

        if !self.hasher.verify(password, &user.hashed_password) {
            debug!(user_id = user.id, "Authentication failed: password mismatch");
            return Ok(None);
        }

        debug!(user_id = user.id, is_admin = user.is_admin, "Authenticated");
        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PasswordScheme;
    use crate::repository::{InMemoryUserStore, StoreError, UserStore};
    use crm_core::NewUser;

    const FAST: PasswordScheme = PasswordScheme::Bcrypt { cost: 4 };

    async fn setup() -> (Arc<InMemoryUserStore>, Authenticator) {
        let hasher = PasswordHasher::new(FAST);
        let store = Arc::new(InMemoryUserStore::new());
        store
            .create_user(NewUser {
                username: "alice".to_string(),
                hashed_password: hasher.hash("wonderland").unwrap(),
                is_admin: false,
            })
            .await
            .unwrap();
        store
            .create_user(NewUser {
                username: "root".to_string(),
                hashed_password: hasher.hash("toor").unwrap(),
                is_admin: true,
            })
            .await
            .unwrap();

        let authenticator = Authenticator::new(store.clone(), hasher);
        (store, authenticator)
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let (_, auth) = setup().await;

        let user = auth.authenticate("alice", "wonderland", false).await.unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert!(!user.is_admin);

        let admin = auth.authenticate("root", "toor", true).await.unwrap().unwrap();
        assert!(admin.is_admin);
    }

    #[tokio::test]
    async fn test_role_scoped_lookup() {
        let (_, auth) = setup().await;

        // 일반 계정만 있는 사용자 이름으로 관리자 인증
        assert!(auth.authenticate("alice", "wonderland", true).await.unwrap().is_none());
        // 관리자 계정으로 일반 인증
        assert!(auth.authenticate("root", "toor", false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_same_username_in_both_roles() {
        let (store, auth) = setup().await;
        let hasher = PasswordHasher::new(FAST);
        store
            .create_user(NewUser {
                username: "alice".to_string(),
                hashed_password: hasher.hash("admin-pass").unwrap(),
                is_admin: true,
            })
            .await
            .unwrap();

        let admin = auth.authenticate("alice", "admin-pass", true).await.unwrap().unwrap();
        assert!(admin.is_admin);
        assert!(auth.authenticate("alice", "wonderland", true).await.unwrap().is_none());
        assert!(auth.authenticate("alice", "admin-pass", false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user() {
        let (_, auth) = setup().await;

        assert!(auth.authenticate("alice", "wrong", false).await.unwrap().is_none());
        assert!(auth.authenticate("nobody", "wonderland", false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_user_still_verifies_password() {
        let (_, auth) = setup().await;
        assert!(auth.dummy_hash.get().is_none());

        assert!(auth.authenticate("nobody", "wonderland", false).await.unwrap().is_none());

        // 설정된 방식의 해시로 검증했는지 확인
        let dummy = auth.dummy_hash.get().cloned().flatten().unwrap();
        assert!(dummy.starts_with("$2"));
        assert!(!auth.hasher.verify("wonderland", &dummy));

        // 다른 역할 조회 실패도 같은 경로
        assert!(auth.authenticate("alice", "wonderland", true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_storage_fault_propagates() {
        let (store, auth) = setup().await;
        store.set_unavailable(true);

        let result = auth.authenticate("alice", "wonderland", false).await;
        assert!(matches!(result, Err(StoreError::Database(_))));
    }
}
