//! # CRM Core
//!
//! 고객 관리 서비스의 핵심 도메인 모델 및 공통 인프라를 제공합니다.
//!
//! - 사용자/고객 도메인 레코드
//! - 설정 관리
//! - 로깅 인프라
//! - 공통 에러 타입

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
