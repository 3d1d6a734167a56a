//! Repository pattern for database operations.
//!
//! 데이터베이스 접근 로직을 라우트 핸들러와 인증 코어에서 분리합니다.
//! 인증 코어는 [`IdentityStore`]만 의존하며, 라우트는 [`UserStore`]와
//! [`CustomerStore`]를 사용합니다.
//!
//! 구현체:
//! - PostgreSQL: [`PgUserRepository`], [`PgCustomerRepository`]
//! - 메모리: [`InMemoryUserStore`], [`InMemoryCustomerStore`] (테스트/로컬 실행)

pub mod customers;
pub mod memory;
pub mod users;

use async_trait::async_trait;
use crm_core::{Customer, CustomerChanges, CustomerId, NewCustomer, NewUser, User, UserChanges, UserId};

pub use customers::PgCustomerRepository;
pub use memory::{InMemoryCustomerStore, InMemoryUserStore};
pub use users::PgUserRepository;

/// 저장소 에러.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 연결/쿼리 실패 등 인프라 장애
    #[error("데이터베이스 오류: {0}")]
    Database(#[from] sqlx::Error),
    /// 유니크 제약, 참조 무결성 위반
    #[error("데이터 충돌: {0}")]
    Conflict(String),
}

impl StoreError {
    /// sqlx 에러를 분류합니다. 제약 조건 위반은 `Conflict`가 됩니다.
    pub(crate) fn classify(err: sqlx::Error, conflict_message: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() || db_err.is_foreign_key_violation() {
                return StoreError::Conflict(conflict_message.to_string());
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// 인증 코어가 사용하는 신원 조회 기능.
///
/// 존재하지 않으면 `Ok(None)`, 저장소 장애는 `Err`로 구분합니다.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_identity_by_id(&self, id: UserId) -> StoreResult<Option<User>>;

    /// `(username, is_admin)` 쌍으로 조회. 관리자와 일반 계정은 서로 다른 네임스페이스입니다.
    async fn find_identity_by_username_and_role(
        &self,
        username: &str,
        is_admin: bool,
    ) -> StoreResult<Option<User>>;
}

/// 사용자 관리 저장소.
#[async_trait]
pub trait UserStore: IdentityStore {
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;

    async fn create_user(&self, input: NewUser) -> StoreResult<User>;

    /// 지정된 필드만 변경합니다. 사용자가 없으면 `Ok(None)`.
    async fn update_user(&self, id: UserId, changes: UserChanges) -> StoreResult<Option<User>>;

    /// 삭제 여부를 반환합니다.
    async fn delete_user(&self, id: UserId) -> StoreResult<bool>;

    async fn count_admins(&self) -> StoreResult<i64>;

    /// 저장소 연결 확인.
    async fn ping(&self) -> StoreResult<()>;
}

/// 고객 관리 저장소.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn list_customers(&self) -> StoreResult<Vec<Customer>>;

    async fn get_customer(&self, id: CustomerId) -> StoreResult<Option<Customer>>;

    /// 생성자와 수정자는 모두 `actor`가 됩니다.
    async fn create_customer(&self, input: NewCustomer, actor: UserId) -> StoreResult<Customer>;

    /// 비어 있지 않은 필드만 변경하고 수정자를 `actor`로 설정합니다.
    async fn update_customer(
        &self,
        id: CustomerId,
        changes: CustomerChanges,
        actor: UserId,
    ) -> StoreResult<Option<Customer>>;

    async fn delete_customer(&self, id: CustomerId) -> StoreResult<bool>;
}
