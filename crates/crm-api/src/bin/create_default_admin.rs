//! 기본 관리자 계정 생성 도구.
//!
//! 관리자가 한 명도 없으면 `admin.default_username` / `admin.default_password`로
//! 계정을 만듭니다. 이미 관리자가 있으면 아무것도 하지 않습니다.

use std::time::Duration;

use anyhow::Context;
use crm_core::{init_logging, AppConfig, LogConfig};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crm_api::auth::{PasswordHasher, PasswordScheme};
use crm_api::bootstrap::{create_default_admin, BootstrapOutcome};
use crm_api::repository::PgUserRepository;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let config = AppConfig::load_default().context("설정 로드 실패")?;
    init_logging(LogConfig::from(&config.logging))?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(config.database.connection_timeout_secs))
        .connect(config.database.connection_url().expose_secret())
        .await
        .context("데이터베이스 연결 실패")?;

    if config.database.run_migrations {
        sqlx::migrate!("../../migrations")
            .run(&pool)
            .await
            .context("마이그레이션 실패")?;
    }

    let store = PgUserRepository::new(pool.clone());
    let hasher = PasswordHasher::new(config.auth.password_scheme.parse::<PasswordScheme>()?);

    let outcome = create_default_admin(
        &store,
        &hasher,
        &config.admin.default_username,
        config.admin.default_password.expose_secret(),
    )
    .await?;

    match outcome {
        BootstrapOutcome::AlreadyExists => info!("Admin user already exists"),
        BootstrapOutcome::Created(user) => {
            info!(user_id = user.id, username = %user.username, "Admin user created")
        }
    }

    pool.close().await;
    Ok(())
}
