//! 고객 관리 API 서버.
//!
//! 설정을 로드하고 PostgreSQL, 오브젝트 스토리지, 인증 코어를 구성한 뒤
//! Axum REST API 서버를 시작합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{http::StatusCode, Router};
use crm_core::{init_logging, AppConfig, LogConfig, ServerConfig};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crm_api::auth::{PasswordHasher, PasswordScheme, TokenService, TokenSettings};
use crm_api::openapi::{openapi_json_path, swagger_ui_router};
use crm_api::repository::{PgCustomerRepository, PgUserRepository};
use crm_api::routes::create_api_router;
use crm_api::state::AppState;
use crm_api::storage::S3PhotoStore;

/// CORS 레이어 생성.
///
/// `server.cors_origins`가 비어 있으면 개발 모드로 간주하여 모든 origin을 허용합니다.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let restricted = !origins.is_empty();
    let allow_origin = if restricted {
        info!("CORS configured with {} allowed origins", origins.len());
        AllowOrigin::list(origins)
    } else {
        if !config.cors_origins.is_empty() {
            warn!("server.cors_origins contains no valid origins, allowing any");
        } else {
            warn!("server.cors_origins not set, allowing any origin (development mode)");
        }
        AllowOrigin::any()
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
        ])
        // 와일드카드 origin과 함께 쓸 수 없음
        .allow_credentials(restricted)
        .max_age(Duration::from_secs(3600))
}

/// 전체 라우터 생성.
fn create_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    Router::new()
        .merge(create_api_router(&config.api_prefix).with_state(state))
        .merge(swagger_ui_router(&config.api_prefix))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(cors_layer(config))
}

/// OpenAPI 스펙 내보내기 처리.
///
/// `--export-openapi` 플래그가 있으면 OpenAPI JSON을 stdout으로 출력하고 `true`를 반환합니다.
fn handle_export_openapi() -> anyhow::Result<bool> {
    use crm_api::openapi::ApiDoc;
    use utoipa::OpenApi as _;

    if !std::env::args().any(|arg| arg == "--export-openapi") {
        return Ok(false);
    }

    let json = serde_json::to_string_pretty(&ApiDoc::openapi())?;
    println!("{}", json);
    Ok(true)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    if handle_export_openapi()? {
        return Ok(());
    }

    let config = AppConfig::load_default().context("설정 로드 실패")?;
    init_logging(LogConfig::from(&config.logging))?;

    info!(
        project = %config.server.project_name,
        version = env!("CARGO_PKG_VERSION"),
        "Starting API server..."
    );

    // 데이터베이스 연결
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.connection_timeout_secs))
        .connect(config.database.connection_url().expose_secret())
        .await
        .context("데이터베이스 연결 실패")?;
    info!(
        host = %config.database.host,
        database = %config.database.name,
        max_connections = config.database.max_connections,
        "Database pool connected"
    );

    if config.database.run_migrations {
        sqlx::migrate!("../../migrations")
            .run(&pool)
            .await
            .context("마이그레이션 실패")?;
        info!("Database migrations applied");
    }

    // 오브젝트 스토리지
    let photos = Arc::new(S3PhotoStore::new(&config.storage)?);
    if let Err(e) = photos.ensure_bucket().await {
        // 업로드 시 다시 시도
        warn!(bucket = %photos.bucket(), error = %e, "Photo bucket is not ready");
    }

    // 인증 코어
    let tokens = TokenService::new(TokenSettings::from_config(&config.auth)?)?;
    let hasher = PasswordHasher::new(config.auth.password_scheme.parse::<PasswordScheme>()?);

    let state = Arc::new(AppState::new(
        tokens,
        hasher,
        Arc::new(PgUserRepository::new(pool.clone())),
        Arc::new(PgCustomerRepository::new(pool.clone())),
        photos,
    ));

    let app = create_router(state, &config.server);

    let addr: SocketAddr = config
        .server
        .bind_address()
        .parse()
        .with_context(|| format!("잘못된 바인딩 주소: {}", config.server.bind_address()))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(%addr, "API server listening");
    info!("Swagger UI available at http://{}/swagger-ui", addr);
    info!(
        "OpenAPI spec at http://{}{}",
        addr,
        openapi_json_path(&config.server.api_prefix)
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// Ctrl+C 또는 SIGTERM 시그널을 기다립니다.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
