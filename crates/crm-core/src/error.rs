//! 서비스 공통 에러 타입.
//!
//! 설정 로드와 로깅 초기화처럼 프로세스 시작 단계에서 발생하는 에러를 정의합니다.

use thiserror::Error;

/// 핵심 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 설정 값 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 설정 소스 로드/역직렬화 에러
    #[error("설정 로드 실패: {0}")]
    ConfigSource(#[from] config::ConfigError),

    /// 로깅 초기화 에러
    #[error("로깅 초기화 실패: {0}")]
    Logging(String),
}

/// 핵심 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// 잘못된 설정으로 인한 에러인지 확인합니다.
    pub fn is_config(&self) -> bool {
        matches!(self, CoreError::Config(_) | CoreError::ConfigSource(_))
    }
}
