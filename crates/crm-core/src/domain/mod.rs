//! 사용자 및 고객 관리를 위한 도메인 모델.

mod customer;
mod user;

pub use customer::*;
pub use user::*;
