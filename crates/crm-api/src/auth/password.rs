//! 비밀번호 해싱 유틸리티.
//!
//! Argon2id(기본) 또는 bcrypt 기반 비밀번호 해싱 및 검증.
//! 해시 문자열에 알고리즘, 파라미터, 솔트가 모두 포함되므로
//! 검증 시에는 설정된 방식과 관계없이 해시 접두사로 알고리즘을 선택합니다.

use std::fmt;
use std::str::FromStr;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::{debug, warn};

/// bcrypt 기본 cost.
pub const DEFAULT_BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

/// 비밀번호 처리 에러.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("비밀번호 해싱 실패")]
    HashingFailed,
    #[error("지원하지 않는 해싱 방식: {0}")]
    UnsupportedScheme(String),
}

/// 비밀번호 해싱 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordScheme {
    /// Argon2id (PHC 문자열, `$argon2id$...`)
    Argon2id,
    /// bcrypt (`$2b$<cost>$...`)
    Bcrypt { cost: u32 },
}

impl Default for PasswordScheme {
    fn default() -> Self {
        Self::Argon2id
    }
}

impl FromStr for PasswordScheme {
    type Err = PasswordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "argon2id" | "argon2" => Ok(Self::Argon2id),
            "bcrypt" => Ok(Self::Bcrypt {
                cost: DEFAULT_BCRYPT_COST,
            }),
            other => Err(PasswordError::UnsupportedScheme(other.to_string())),
        }
    }
}

impl fmt::Display for PasswordScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Argon2id => write!(f, "argon2id"),
            Self::Bcrypt { cost } => write!(f, "bcrypt(cost={})", cost),
        }
    }
}

/// 비밀번호 해셔.
///
/// 불변 설정(해싱 방식)만 보유하므로 여러 요청에서 동시에 사용해도 안전합니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher {
    scheme: PasswordScheme,
}

impl PasswordHasher {
    /// 주어진 방식으로 해셔 생성.
    pub fn new(scheme: PasswordScheme) -> Self {
        Self { scheme }
    }

    /// 현재 해싱 방식.
    pub fn scheme(&self) -> PasswordScheme {
        self.scheme
    }

    /// 비밀번호 해싱.
    ///
    /// 솔트는 매번 새로 생성되므로 같은 비밀번호라도 결과가 다릅니다.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let hash = PasswordHasher::default().hash("my_secure_password")?;
    /// // "$argon2id$v=19$m=19456,t=2,p=1$..."
    /// ```
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        match self.scheme {
            PasswordScheme::Argon2id => {
                let salt = SaltString::generate(&mut OsRng);
                Argon2::default()
                    .hash_password(password.as_bytes(), &salt)
                    .map(|hash| hash.to_string())
                    .map_err(|_| PasswordError::HashingFailed)
            }
            PasswordScheme::Bcrypt { cost } => {
                bcrypt::hash(password, cost).map_err(|_| PasswordError::HashingFailed)
            }
        }
    }

    /// 비밀번호 검증.
    ///
    /// 불일치, 잘못된 해시 형식, 알 수 없는 알고리즘 모두 `false`를 반환합니다.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        if hash.starts_with("$argon2") {
            let parsed = match PasswordHash::new(hash) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(error = %e, "Stored argon2 hash is malformed");
                    return false;
                }
            };
            let ok = Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok();
            debug!(scheme = "argon2", ok, "Password verified");
            return ok;
        }

        if is_bcrypt_hash(hash) {
            return match bcrypt::verify(password, hash) {
                Ok(ok) => {
                    debug!(scheme = "bcrypt", ok, "Password verified");
                    ok
                }
                Err(e) => {
                    warn!(error = %e, "Stored bcrypt hash is malformed");
                    false
                }
            };
        }

        warn!("Stored password hash uses an unknown scheme");
        false
    }
}

fn is_bcrypt_hash(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2x$", "$2y$"]
        .iter()
        .any(|prefix| hash.starts_with(prefix))
}
