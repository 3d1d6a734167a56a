//! 사용자 (자격 증명 보유 계정).

use serde::{Deserialize, Serialize};

/// 사용자 식별자 (users.id, SERIAL).
pub type UserId = i32;

/// 저장된 사용자 레코드.
///
/// 관리자 계정과 일반 계정은 `(username, is_admin)` 쌍으로 구분되므로
/// 같은 사용자 이름이 역할별로 하나씩 존재할 수 있습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// 자체 기술형 해시 문자열 (PHC / bcrypt). 응답에는 포함되지 않음
    #[serde(skip_serializing, default)]
    pub hashed_password: String,
    pub is_admin: bool,
}

impl User {
    /// 요청한 역할 조건을 만족하는지 확인.
    ///
    /// 관리자 권한을 요구하지 않으면 모든 계정이 통과합니다.
    pub fn satisfies_role(&self, require_admin: bool) -> bool {
        !require_admin || self.is_admin
    }
}

/// 새 사용자 레코드 입력 (해싱 완료 상태).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub hashed_password: String,
    pub is_admin: bool,
}

/// 사용자 부분 수정 입력.
///
/// `None` 필드는 변경하지 않습니다.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub hashed_password: Option<String>,
    pub is_admin: Option<bool>,
}

impl UserChanges {
    /// 변경할 항목이 없는지 확인.
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.hashed_password.is_none() && self.is_admin.is_none()
    }
}
