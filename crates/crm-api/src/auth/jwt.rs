//! JWT 토큰 처리.
//!
//! Access Token 생성/검증 로직. 토큰은 저장되지 않으며 서명과 만료 시각만으로
//! 유효성이 결정됩니다.
//!
//! 상태 전이: `Issued -> Valid (now < exp) -> Expired (now >= exp)`

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use crm_core::{AuthConfig, UserId, MAX_ACCESS_TOKEN_EXPIRE_MINUTES};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 허용되는 서명 알고리즘 (공유 비밀 키 기반 HMAC 계열).
pub const SUPPORTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

// ==================== Clock ====================

/// 현재 시각 제공자 (UTC epoch 초).
pub trait Clock: Send + Sync + fmt::Debug {
    fn now_timestamp(&self) -> i64;
}

/// 시스템 시계.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_timestamp(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// 고정 시계. 테스트에서 시간 경과를 흉내낼 때 사용합니다.
#[derive(Debug)]
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(timestamp: i64) -> Self {
        Self {
            now: AtomicI64::new(timestamp),
        }
    }

    /// 시계를 주어진 시간만큼 앞으로 이동.
    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }

    pub fn set(&self, timestamp: i64) {
        self.now.store(timestamp, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_timestamp(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

// ==================== Claims ====================

/// JWT Access Token 페이로드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// 사용자 ID
    pub id: UserId,
    /// Expiration - 토큰 만료 시간 (Unix timestamp)
    pub exp: i64,
    /// Issued At - 토큰 발급 시간 (Unix timestamp)
    pub iat: i64,
    /// JWT ID - 같은 사용자에게 발급된 토큰끼리도 서로 다르게 만듦
    pub jti: String,
}

/// 검증 단계에서 사용하는 느슨한 페이로드. 필수 필드 누락을 직접 판별합니다.
#[derive(Debug, Deserialize)]
struct RawClaims {
    id: Option<UserId>,
    exp: Option<i64>,
}

// ==================== Errors ====================

/// 토큰 서비스 구성/발급 에러.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("지원하지 않는 서명 알고리즘: {0}")]
    UnsupportedAlgorithm(String),
    #[error("토큰 비밀 키가 비어 있습니다")]
    EmptySecret,
    #[error("유효 시간이 허용 범위를 벗어났습니다: {0}분")]
    InvalidTtl(i64),
    #[error("토큰 인코딩 실패: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
}

/// 토큰 검증 실패.
///
/// 호출자는 실패 원인을 구분할 수 없습니다. 원인은 내부 로그에만 남습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("유효하지 않은 토큰")]
pub struct InvalidToken;

/// 토큰 거부 원인 (로깅 전용).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenRejection {
    Malformed,
    BadSignature,
    WrongAlgorithm,
    MissingClaim(&'static str),
    Expired { exp: i64, now: i64 },
}

impl fmt::Display for TokenRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed"),
            Self::BadSignature => write!(f, "bad_signature"),
            Self::WrongAlgorithm => write!(f, "wrong_algorithm"),
            Self::MissingClaim(claim) => write!(f, "missing_claim:{}", claim),
            Self::Expired { exp, now } => write!(f, "expired(exp={}, now={})", exp, now),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenRejection {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature => Self::BadSignature,
            ErrorKind::InvalidAlgorithm => Self::WrongAlgorithm,
            ErrorKind::MissingRequiredClaim(claim) if claim == "exp" => Self::MissingClaim("exp"),
            _ => Self::Malformed,
        }
    }
}

// ==================== Settings ====================

/// 토큰 서비스 설정. 프로세스 시작 시 한 번 만들어지고 변경되지 않습니다.
#[derive(Debug)]
pub struct TokenSettings {
    pub secret: SecretString,
    pub algorithm: Algorithm,
    pub default_ttl: Duration,
}

impl TokenSettings {
    pub fn new(secret: impl Into<String>, algorithm: Algorithm, default_ttl: Duration) -> Self {
        Self {
            secret: SecretString::from(secret.into()),
            algorithm,
            default_ttl,
        }
    }

    /// 인증 설정에서 생성.
    pub fn from_config(config: &AuthConfig) -> Result<Self, TokenError> {
        let algorithm = Algorithm::from_str(&config.signing_algorithm.to_uppercase())
            .map_err(|_| TokenError::UnsupportedAlgorithm(config.signing_algorithm.clone()))?;

        let minutes = config.access_token_expire_minutes;
        if minutes <= 0 || minutes > MAX_ACCESS_TOKEN_EXPIRE_MINUTES {
            return Err(TokenError::InvalidTtl(minutes));
        }
        let default_ttl = Duration::try_minutes(minutes).ok_or(TokenError::InvalidTtl(minutes))?;

        Ok(Self {
            secret: SecretString::from(config.secret_key.expose_secret()),
            algorithm,
            default_ttl,
        })
    }
}

// ==================== Service ====================

/// 토큰 발급/검증 서비스.
#[derive(Clone)]
pub struct TokenService {
    algorithm: Algorithm,
    default_ttl: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &self.algorithm)
            .field("default_ttl", &self.default_ttl)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// 시스템 시계를 사용하는 서비스 생성.
    pub fn new(settings: TokenSettings) -> Result<Self, TokenError> {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    /// 주어진 시계를 사용하는 서비스 생성.
    pub fn with_clock(settings: TokenSettings, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        if !SUPPORTED_ALGORITHMS.contains(&settings.algorithm) {
            return Err(TokenError::UnsupportedAlgorithm(format!("{:?}", settings.algorithm)));
        }

        let secret = settings.secret.expose_secret().as_bytes();
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }

        // 만료는 clock 기준으로 직접 검사 (now < exp)
        let mut validation = Validation::new(settings.algorithm);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            algorithm: settings.algorithm,
            default_ttl: settings.default_ttl,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            clock,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Access Token 발급.
    ///
    /// `ttl`이 없으면 설정된 기본 유효 시간을 사용합니다.
    /// 음수 `ttl`은 이미 만료된 토큰을 만듭니다.
    pub fn issue(&self, subject: UserId, ttl: Option<Duration>) -> Result<String, TokenError> {
        let now = self.clock.now_timestamp();
        let ttl = ttl.unwrap_or(self.default_ttl);
        let claims = AccessClaims {
            id: subject,
            exp: now + ttl.num_seconds(),
            iat: now,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)?;
        debug!(user_id = subject, exp = claims.exp, "Access token issued");
        Ok(token)
    }

    /// Access Token 검증.
    ///
    /// 성공 시 토큰에 담긴 사용자 ID를 반환합니다.
    pub fn verify(&self, token: &str) -> Result<UserId, InvalidToken> {
        self.inspect(token).map_err(|rejection| {
            debug!(reason = %rejection, "Access token rejected");
            InvalidToken
        })
    }

    /// 원인을 포함한 검증.
    pub(crate) fn inspect(&self, token: &str) -> Result<UserId, TokenRejection> {
        let data = decode::<RawClaims>(token, &self.decoding_key, &self.validation)?;
        let claims = data.claims;

        let exp = claims.exp.ok_or(TokenRejection::MissingClaim("exp"))?;
        let id = claims.id.ok_or(TokenRejection::MissingClaim("id"))?;

        let now = self.clock.now_timestamp();
        if now >= exp {
            return Err(TokenRejection::Expired { exp, now });
        }

        Ok(id)
    }
}
