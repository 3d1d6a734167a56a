//! 설정 관리.
//!
//! 이 모듈은 애플리케이션 설정을 정의하고 관리합니다.
//! 설정은 프로세스 시작 시 한 번 로드되며 이후 변경되지 않습니다.
//!
//! # 로드 순서
//!
//! 1. 각 섹션의 기본값
//! 2. `config/default.toml` (있는 경우)
//! 3. `CRM__` 접두사 환경 변수 (예: `CRM__AUTH__SECRET_KEY`)

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::error::{CoreError, CoreResult};

/// 환경 변수 접두사.
pub const ENV_PREFIX: &str = "CRM";

/// 기본 설정 파일 경로.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// 지원하는 비밀번호 해싱 방식 이름.
pub const SUPPORTED_PASSWORD_SCHEMES: &[&str] = &["argon2id", "bcrypt"];

/// 액세스 토큰 유효 시간 상한 (분, 1년).
pub const MAX_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 365 * 24 * 60;

/// 애플리케이션 설정.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 서버 설정
    pub server: ServerConfig,
    /// 데이터베이스 설정
    pub database: DatabaseConfig,
    /// 인증 설정 (토큰 서명, 비밀번호 해싱)
    pub auth: AuthConfig,
    /// 오브젝트 스토리지 설정 (고객 사진)
    pub storage: StorageConfig,
    /// 기본 관리자 계정 설정
    pub admin: AdminConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// API 경로 접두사
    pub api_prefix: String,
    /// 서비스 이름 (OpenAPI 문서 제목)
    pub project_name: String,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
    /// 허용 CORS origin 목록 (비어 있으면 모두 허용)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            api_prefix: "/api/v1".to_string(),
            project_name: "Customer Management API".to_string(),
            request_timeout_secs: 30,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// `host:port` 형식의 바인딩 주소.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 데이터베이스 설정.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 호스트
    pub host: String,
    /// 포트
    pub port: u16,
    /// 사용자
    pub user: String,
    /// 비밀번호
    #[serde(deserialize_with = "deserialize_secret")]
    pub password: SecretString,
    /// 데이터베이스 이름
    pub name: String,
    /// 전체 연결 URL (설정 시 개별 항목보다 우선)
    #[serde(default, deserialize_with = "deserialize_optional_secret")]
    pub url: Option<SecretString>,
    /// 최대 연결 수
    pub max_connections: u32,
    /// 연결 타임아웃 (초)
    pub connection_timeout_secs: u64,
    /// 시작 시 마이그레이션 실행 여부
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: SecretString::from("postgres"),
            name: "crm".to_string(),
            url: None,
            max_connections: 10,
            connection_timeout_secs: 30,
            run_migrations: true,
        }
    }
}

impl DatabaseConfig {
    /// PostgreSQL 연결 URL.
    ///
    /// 비밀번호가 포함되므로 로그에 남기지 않습니다.
    pub fn connection_url(&self) -> SecretString {
        if let Some(url) = &self.url {
            return SecretString::from(url.expose_secret());
        }
        SecretString::from(format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user,
            self.password.expose_secret(),
            self.host,
            self.port,
            self.name
        ))
    }
}

/// 인증 설정.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// 토큰 서명 비밀 키
    #[serde(deserialize_with = "deserialize_secret")]
    pub secret_key: SecretString,
    /// 토큰 서명 알고리즘 (HS256, HS384, HS512)
    pub signing_algorithm: String,
    /// Access Token 기본 유효 시간 (분)
    pub access_token_expire_minutes: i64,
    /// 비밀번호 해싱 방식 (argon2id, bcrypt)
    pub password_scheme: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: SecretString::from("dev-secret-key-change-in-production"),
            signing_algorithm: "HS256".to_string(),
            access_token_expire_minutes: 30,
            password_scheme: "argon2id".to_string(),
        }
    }
}

/// S3 호환 오브젝트 스토리지 설정.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 엔드포인트 URL (예: MinIO `http://localhost:9000`)
    pub endpoint: String,
    /// 서명 리전
    pub region: String,
    /// 액세스 키 ID
    pub access_key_id: String,
    /// 시크릿 액세스 키
    #[serde(deserialize_with = "deserialize_secret")]
    pub secret_access_key: SecretString,
    /// 고객 사진 버킷
    pub photo_bucket: String,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9000".to_string(),
            region: "us-east-1".to_string(),
            access_key_id: "minioadmin".to_string(),
            secret_access_key: SecretString::from("minioadmin"),
            photo_bucket: "profile-folder".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// 기본 관리자 계정 설정.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// 사용자 이름
    pub default_username: String,
    /// 비밀번호
    #[serde(deserialize_with = "deserialize_secret")]
    pub default_password: SecretString,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            default_username: "admin".to_string(),
            default_password: SecretString::from("admin"),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn deserialize_optional_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|s| !s.is_empty())
        .map(SecretString::from))
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없으면 건너뜁니다.
    pub fn load<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            );

        Self::from_builder(builder)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> CoreResult<Self> {
        Self::load(DEFAULT_CONFIG_PATH)
    }

    /// TOML 문자열에서 설정을 로드합니다 (환경 변수 무시).
    pub fn from_toml_str(toml: &str) -> CoreResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml));

        Self::from_builder(builder)
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> CoreResult<Self> {
        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 설정 값의 유효성을 검사합니다.
    pub fn validate(&self) -> CoreResult<()> {
        if self.auth.secret_key.expose_secret().trim().is_empty() {
            return Err(CoreError::Config("auth.secret_key가 비어 있습니다".to_string()));
        }

        if self.auth.access_token_expire_minutes <= 0 {
            return Err(CoreError::Config(format!(
                "auth.access_token_expire_minutes는 양수여야 합니다: {}",
                self.auth.access_token_expire_minutes
            )));
        }
        if self.auth.access_token_expire_minutes > MAX_ACCESS_TOKEN_EXPIRE_MINUTES {
            return Err(CoreError::Config(format!(
                "auth.access_token_expire_minutes는 {} 이하여야 합니다: {}",
                MAX_ACCESS_TOKEN_EXPIRE_MINUTES, self.auth.access_token_expire_minutes
            )));
        }

        let scheme = self.auth.password_scheme.to_lowercase();
        if !SUPPORTED_PASSWORD_SCHEMES.contains(&scheme.as_str()) {
            return Err(CoreError::Config(format!(
                "지원하지 않는 비밀번호 해싱 방식: {}",
                self.auth.password_scheme
            )));
        }

        if self.storage.photo_bucket.trim().is_empty() {
            return Err(CoreError::Config("storage.photo_bucket이 비어 있습니다".to_string()));
        }

        if !self.server.api_prefix.starts_with('/') {
            return Err(CoreError::Config(format!(
                "server.api_prefix는 '/'로 시작해야 합니다: {}",
                self.server.api_prefix
            )));
        }

        Ok(())
    }
}
