//! Customer Repository
//!
//! 고객 관련 데이터베이스 연산을 담당합니다.

use async_trait::async_trait;
use crm_core::{Customer, CustomerChanges, CustomerId, NewCustomer, UserId};
use sqlx::PgPool;

use super::{CustomerStore, StoreError, StoreResult};

const CUSTOMER_COLUMNS: &str = "id, name, surname, photo_url, creator_id, modifier_id";

/// PostgreSQL 고객 저장소.
#[derive(Debug, Clone)]
pub struct PgCustomerRepository {
    pool: PgPool,
}

impl PgCustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerStore for PgCustomerRepository {
    async fn list_customers(&self) -> StoreResult<Vec<Customer>> {
        let records = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn get_customer(&self, id: CustomerId) -> StoreResult<Option<Customer>> {
        let record = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn create_customer(&self, input: NewCustomer, actor: UserId) -> StoreResult<Customer> {
        let record = sqlx::query_as::<_, Customer>(&format!(
            r#"
            INSERT INTO customers (name, surname, photo_url, creator_id, modifier_id)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING {CUSTOMER_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(&input.surname)
        .bind(&input.photo_url)
        .bind(actor)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::classify(e, "creator does not exist"))?;

        Ok(record)
    }

    async fn update_customer(
        &self,
        id: CustomerId,
        changes: CustomerChanges,
        actor: UserId,
    ) -> StoreResult<Option<Customer>> {
        // 빈 문자열은 변경 없음
        let changes = changes.normalized();

        let record = sqlx::query_as::<_, Customer>(&format!(
            r#"
            UPDATE customers
            SET name = COALESCE($2, name),
                surname = COALESCE($3, surname),
                photo_url = COALESCE($4, photo_url),
                modifier_id = $5
            WHERE id = $1
            RETURNING {CUSTOMER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.surname)
        .bind(&changes.photo_url)
        .bind(actor)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::classify(e, "modifier does not exist"))?;

        Ok(record)
    }

    async fn delete_customer(&self, id: CustomerId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
