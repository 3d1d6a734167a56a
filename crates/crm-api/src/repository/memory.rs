//! 메모리 기반 저장소.
//!
//! 테스트와 데이터베이스 없는 로컬 실행에 사용합니다. PostgreSQL 구현과 같은
//! 제약(역할별 사용자 이름 유일성, 고객이 참조하는 사용자 삭제 금지)을 지킵니다.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use crm_core::{Customer, CustomerChanges, CustomerId, NewCustomer, NewUser, User, UserChanges, UserId};
use tokio::sync::RwLock;

use super::{CustomerStore, IdentityStore, StoreError, StoreResult, UserStore};

/// 장애 주입 시 반환되는 에러.
fn unavailable() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

#[derive(Debug)]
struct Table<K, V> {
    next_id: K,
    rows: BTreeMap<K, V>,
}

impl<V> Default for Table<i32, V> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl<V> Table<i32, V> {
    fn allocate_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

// ================================================================================================
// Users
// ================================================================================================

/// 메모리 사용자 저장소.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<Table<UserId, User>>,
    /// 삭제 시 참조 무결성 검사에 사용
    customers: Option<Arc<InMemoryCustomerStore>>,
    unavailable: AtomicBool,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 고객 저장소와 연결된 사용자 저장소 생성.
    ///
    /// 고객의 생성자/수정자로 남아 있는 사용자는 삭제할 수 없습니다.
    pub fn with_customers(customers: Arc<InMemoryCustomerStore>) -> Self {
        Self {
            customers: Some(customers),
            ..Self::default()
        }
    }

    /// 저장소 장애를 흉내냅니다. 활성화되면 모든 연산이 `StoreError::Database`를 반환합니다.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl IdentityStore for InMemoryUserStore {
    async fn find_identity_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        self.check_available()?;
        Ok(self.users.read().await.rows.get(&id).cloned())
    }

    async fn find_identity_by_username_and_role(
        &self,
        username: &str,
        is_admin: bool,
    ) -> StoreResult<Option<User>> {
        self.check_available()?;
        let users = self.users.read().await;
        Ok(users
            .rows
            .values()
            .find(|u| u.username == username && u.is_admin == is_admin)
            .cloned())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.check_available()?;
        Ok(self.users.read().await.rows.values().cloned().collect())
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        self.find_identity_by_id(id).await
    }

    async fn create_user(&self, input: NewUser) -> StoreResult<User> {
        self.check_available()?;
        let mut users = self.users.write().await;

        let taken = users
            .rows
            .values()
            .any(|u| u.username == input.username && u.is_admin == input.is_admin);
        if taken {
            return Err(StoreError::Conflict(format!(
                "username already exists: {}",
                input.username
            )));
        }

        let user = User {
            id: users.allocate_id(),
            username: input.username,
            hashed_password: input.hashed_password,
            is_admin: input.is_admin,
        };
        users.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: UserId, changes: UserChanges) -> StoreResult<Option<User>> {
        self.check_available()?;
        let mut users = self.users.write().await;

        let Some(current) = users.rows.get(&id).cloned() else {
            return Ok(None);
        };

        let updated = User {
            id,
            username: changes.username.unwrap_or(current.username),
            hashed_password: changes.hashed_password.unwrap_or(current.hashed_password),
            is_admin: changes.is_admin.unwrap_or(current.is_admin),
        };

        let taken = users.rows.values().any(|u| {
            u.id != id && u.username == updated.username && u.is_admin == updated.is_admin
        });
        if taken {
            return Err(StoreError::Conflict("username already exists".to_string()));
        }

        users.rows.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<bool> {
        self.check_available()?;
        let mut users = self.users.write().await;
        if !users.rows.contains_key(&id) {
            return Ok(false);
        }

        if let Some(customers) = &self.customers {
            if customers.references_user(id).await {
                return Err(StoreError::Conflict(
                    "user is still referenced by customers".to_string(),
                ));
            }
        }

        Ok(users.rows.remove(&id).is_some())
    }

    async fn count_admins(&self) -> StoreResult<i64> {
        self.check_available()?;
        let users = self.users.read().await;
        Ok(users.rows.values().filter(|u| u.is_admin).count() as i64)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check_available()
    }
}

// ================================================================================================
// Customers
// ================================================================================================

/// 메모리 고객 저장소.
#[derive(Debug, Default)]
pub struct InMemoryCustomerStore {
    customers: RwLock<Table<CustomerId, Customer>>,
}

impl InMemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 사용자가 어떤 고객의 생성자 또는 수정자인지 확인합니다.
    pub async fn references_user(&self, user_id: UserId) -> bool {
        self.customers
            .read()
            .await
            .rows
            .values()
            .any(|c| c.creator_id == user_id || c.modifier_id == user_id)
    }
}

#[async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn list_customers(&self) -> StoreResult<Vec<Customer>> {
        Ok(self.customers.read().await.rows.values().cloned().collect())
    }

    async fn get_customer(&self, id: CustomerId) -> StoreResult<Option<Customer>> {
        Ok(self.customers.read().await.rows.get(&id).cloned())
    }

    async fn create_customer(&self, input: NewCustomer, actor: UserId) -> StoreResult<Customer> {
        let mut customers = self.customers.write().await;
        let customer = Customer {
            id: customers.allocate_id(),
            name: input.name,
            surname: input.surname,
            photo_url: input.photo_url,
            creator_id: actor,
            modifier_id: actor,
        };
        customers.rows.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn update_customer(
        &self,
        id: CustomerId,
        changes: CustomerChanges,
        actor: UserId,
    ) -> StoreResult<Option<Customer>> {
        let mut customers = self.customers.write().await;
        let Some(customer) = customers.rows.get_mut(&id) else {
            return Ok(None);
        };

        changes.apply_to(customer, actor);
        Ok(Some(customer.clone()))
    }

    async fn delete_customer(&self, id: CustomerId) -> StoreResult<bool> {
        Ok(self.customers.write().await.rows.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, is_admin: bool) -> NewUser {
        NewUser {
            username: username.to_string(),
            hashed_password: "hash".to_string(),
            is_admin,
        }
    }

    #[tokio::test]
    async fn test_username_unique_per_role() {
        let store = InMemoryUserStore::new();
        let admin = store.create_user(new_user("alice", true)).await.unwrap();
        let standard = store.create_user(new_user("alice", false)).await.unwrap();
        assert_ne!(admin.id, standard.id);

        let duplicate = store.create_user(new_user("alice", false)).await;
        assert!(matches!(duplicate, Err(StoreError::Conflict(_))));

        let found = store
            .find_identity_by_username_and_role("alice", true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, admin.id);
    }

    #[tokio::test]
    async fn test_update_user_partial() {
        let store = InMemoryUserStore::new();
        let user = store.create_user(new_user("bob", false)).await.unwrap();

        let updated = store
            .update_user(
                user.id,
                UserChanges {
                    is_admin: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.username, "bob");
        assert_eq!(updated.hashed_password, "hash");
        assert!(updated.is_admin);
        assert_eq!(store.count_admins().await.unwrap(), 1);

        assert!(store.update_user(999, UserChanges::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_user_conflict() {
        let store = InMemoryUserStore::new();
        store.create_user(new_user("carol", false)).await.unwrap();
        let dave = store.create_user(new_user("dave", false)).await.unwrap();

        let result = store
            .update_user(
                dave.id,
                UserChanges {
                    username: Some("carol".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let store = InMemoryUserStore::new();
        store.set_unavailable(true);

        assert!(matches!(store.ping().await, Err(StoreError::Database(_))));
        assert!(store.find_identity_by_id(1).await.is_err());

        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_referenced_user_conflict() {
        let customers = Arc::new(InMemoryCustomerStore::new());
        let store = InMemoryUserStore::with_customers(customers.clone());
        let creator = store.create_user(new_user("erin", false)).await.unwrap();
        let modifier = store.create_user(new_user("frank", false)).await.unwrap();

        let customer = customers
            .create_customer(
                NewCustomer {
                    name: "Ada".to_string(),
                    surname: "Lovelace".to_string(),
                    photo_url: None,
                },
                creator.id,
            )
            .await
            .unwrap();
        customers
            .update_customer(customer.id, CustomerChanges::default(), modifier.id)
            .await
            .unwrap();

        for id in [creator.id, modifier.id] {
            let result = store.delete_user(id).await;
            assert!(matches!(result, Err(StoreError::Conflict(_))));
            assert!(store.get_user(id).await.unwrap().is_some());
        }

        assert!(customers.delete_customer(customer.id).await.unwrap());
        assert!(store.delete_user(creator.id).await.unwrap());
        assert!(store.delete_user(modifier.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_customer_lifecycle() {
        let store = InMemoryCustomerStore::new();
        let customer = store
            .create_customer(
                NewCustomer {
                    name: "Ada".to_string(),
                    surname: "Lovelace".to_string(),
                    photo_url: None,
                },
                1,
            )
            .await
            .unwrap();
        assert_eq!(customer.creator_id, 1);
        assert_eq!(customer.modifier_id, 1);

        let updated = store
            .update_customer(
                customer.id,
                CustomerChanges {
                    name: Some(String::new()),
                    surname: Some("King".to_string()),
                    photo_url: None,
                },
                2,
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Ada");
        assert_eq!(updated.surname, "King");
        assert_eq!(updated.modifier_id, 2);

        assert!(store.delete_customer(customer.id).await.unwrap());
        assert!(!store.delete_customer(customer.id).await.unwrap());
        assert!(store.get_customer(customer.id).await.unwrap().is_none());
    }
}
