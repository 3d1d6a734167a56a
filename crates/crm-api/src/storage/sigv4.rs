//! AWS Signature Version 4 요청 서명.
//!
//! S3 호환 스토리지(MinIO 등) 요청에 필요한 `Authorization` 헤더를 만듭니다.
//! 서명 대상 헤더는 `host`, `x-amz-content-sha256`, `x-amz-date`입니다.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SIGNED_HEADERS: &str = "host;x-amz-content-sha256;x-amz-date";

/// 서명 자격 증명과 범위.
#[derive(Debug, Clone, Copy)]
pub struct SigningParams<'a> {
    pub access_key_id: &'a str,
    pub secret_access_key: &'a str,
    pub region: &'a str,
    pub service: &'a str,
}

/// 서명할 요청.
#[derive(Debug, Clone, Copy)]
pub struct RequestToSign<'a> {
    pub method: &'a str,
    /// 인코딩 전 경로 (예: `/bucket/key.png`)
    pub path: &'a str,
    /// 정규화된 쿼리 문자열 (예: `policy=`)
    pub query: &'a str,
    /// `host[:port]`
    pub host: &'a str,
    pub payload: &'a [u8],
}

/// 요청에 붙일 서명 헤더 값.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub authorization: String,
    pub amz_date: String,
    pub content_sha256: String,
}

/// SHA-256 hex 다이제스트.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// 서명 키 유도: `AWS4<secret>` -> date -> region -> service -> `aws4_request`.
pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date);
    let k_region = hmac_sha256(&k_date, region);
    let k_service = hmac_sha256(&k_region, service);
    hmac_sha256(&k_service, "aws4_request")
}

/// RFC 3986 비예약 문자를 제외하고 퍼센트 인코딩. 경로의 `/`는 유지합니다.
pub fn uri_encode_path(path: &str) -> String {
    let mut encoded = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// 정규 요청 문자열.
pub fn canonical_request(request: &RequestToSign<'_>, amz_date: &str, payload_hash: &str) -> String {
    format!(
        "{}\n{}\n{}\nhost:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n\n{}\n{}",
        request.method,
        uri_encode_path(request.path),
        request.query,
        request.host,
        payload_hash,
        amz_date,
        SIGNED_HEADERS,
        payload_hash
    )
}

/// 요청 서명.
pub fn sign(params: &SigningParams<'_>, request: &RequestToSign<'_>, at: DateTime<Utc>) -> SignedHeaders {
    let amz_date = at.format("%Y%m%dT%H%M%SZ").to_string();
    let date = at.format("%Y%m%d").to_string();
    let payload_hash = sha256_hex(request.payload);

    let scope = format!("{}/{}/{}/aws4_request", date, params.region, params.service);
    let canonical = canonical_request(request, &amz_date, &payload_hash);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        sha256_hex(canonical.as_bytes())
    );

    let key = signing_key(params.secret_access_key, &date, params.region, params.service);
    let signature = hex::encode(hmac_sha256(&key, &string_to_sign));

    SignedHeaders {
        authorization: format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, params.access_key_id, scope, SIGNED_HEADERS, signature
        ),
        amz_date,
        content_sha256: payload_hash,
    }
}
