//! User Repository
//!
//! 사용자(자격 증명) 관련 데이터베이스 연산을 담당합니다.

use async_trait::async_trait;
use crm_core::{NewUser, User, UserChanges, UserId};
use sqlx::PgPool;
use tracing::debug;

use super::{IdentityStore, StoreError, StoreResult, UserStore};

const USER_COLUMNS: &str = "id, username, hashed_password, is_admin";

/// PostgreSQL 사용자 저장소.
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ================================================================================================
// Identity lookups
// ================================================================================================

#[async_trait]
impl IdentityStore for PgUserRepository {
    async fn find_identity_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        let record = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_identity_by_username_and_role(
        &self,
        username: &str,
        is_admin: bool,
    ) -> StoreResult<Option<User>> {
        let record = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND is_admin = $2"
        ))
        .bind(username)
        .bind(is_admin)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}

// ================================================================================================
// User management
// ================================================================================================

#[async_trait]
impl UserStore for PgUserRepository {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let records = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        self.find_identity_by_id(id).await
    }

    async fn create_user(&self, input: NewUser) -> StoreResult<User> {
        let record = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, hashed_password, is_admin)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&input.username)
        .bind(&input.hashed_password)
        .bind(input.is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            StoreError::classify(e, &format!("username already exists: {}", input.username))
        })?;

        debug!(user_id = record.id, is_admin = record.is_admin, "User created");
        Ok(record)
    }

    async fn update_user(&self, id: UserId, changes: UserChanges) -> StoreResult<Option<User>> {
        let record = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                hashed_password = COALESCE($3, hashed_password),
                is_admin = COALESCE($4, is_admin)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.username)
        .bind(&changes.hashed_password)
        .bind(changes.is_admin)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::classify(e, "username already exists"))?;

        Ok(record)
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::classify(e, "user is still referenced by customers"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_admins(&self) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_admin")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
