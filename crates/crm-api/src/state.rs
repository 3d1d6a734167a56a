//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 프로세스 시작 시 한 번 생성되며 `Arc`로 래핑되어
//! 여러 요청 간에 공유됩니다. 이후 변경되지 않습니다.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::auth::{AuthService, PasswordHasher, TokenService};
use crate::repository::{CustomerStore, IdentityStore, UserStore};
use crate::storage::ObjectStore;

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 인증 코어 (토큰, 비밀번호, 접근 제어)
    pub auth: AuthService,

    /// 사용자 저장소
    pub users: Arc<dyn UserStore>,

    /// 고객 저장소
    pub customers: Arc<dyn CustomerStore>,

    /// 고객 사진 저장소
    pub photos: Arc<dyn ObjectStore>,

    /// 서버 시작 시각
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// 새 상태 생성.
    ///
    /// 사용자 저장소는 인증 코어의 신원 조회에도 사용됩니다.
    pub fn new<U>(
        tokens: TokenService,
        hasher: PasswordHasher,
        users: Arc<U>,
        customers: Arc<dyn CustomerStore>,
        photos: Arc<dyn ObjectStore>,
    ) -> Self
    where
        U: UserStore + 'static,
    {
        let identities: Arc<dyn IdentityStore> = users.clone();

        Self {
            auth: AuthService::new(tokens, hasher, identities),
            users,
            customers,
            photos,
            started_at: Utc::now(),
        }
    }

    /// 서버 가동 시간 (초).
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

/// 테스트용 상태와 메모리 저장소 핸들.
#[cfg(any(test, feature = "test-utils"))]
pub struct TestContext {
    pub state: Arc<AppState>,
    pub users: Arc<crate::repository::InMemoryUserStore>,
    pub customers: Arc<crate::repository::InMemoryCustomerStore>,
    pub photos: Arc<crate::storage::InMemoryObjectStore>,
}

/// 테스트용 AppState 생성 (메모리 저장소, 빠른 bcrypt).
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state() -> TestContext {
    use crate::auth::{PasswordScheme, TokenSettings};
    use crate::repository::{InMemoryCustomerStore, InMemoryUserStore};
    use crate::storage::InMemoryObjectStore;

    let tokens = TokenService::new(TokenSettings::new(
        "test-secret-key-for-route-tests",
        jsonwebtoken::Algorithm::HS256,
        chrono::Duration::minutes(30),
    ))
    .expect("test token settings are valid");
    let hasher = PasswordHasher::new(PasswordScheme::Bcrypt { cost: 4 });

    let customers = Arc::new(InMemoryCustomerStore::new());
    let users = Arc::new(InMemoryUserStore::with_customers(customers.clone()));
    let photos = Arc::new(InMemoryObjectStore::new("http://localhost:9000/profile-folder"));

    let state = AppState::new(tokens, hasher, users.clone(), customers.clone(), photos.clone());

    TestContext {
        state: Arc::new(state),
        users,
        customers,
        photos,
    }
}
