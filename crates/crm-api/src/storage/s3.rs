//! S3 호환 스토리지 클라이언트 (MinIO).
//!
//! Path-style 주소(`{endpoint}/{bucket}/{key}`)와 SigV4 서명을 사용합니다.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use crm_core::StorageConfig;
use reqwest::{header, Client, Method, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::sigv4::{self, RequestToSign, SigningParams};
use super::{ObjectStore, StorageError};

const SERVICE: &str = "s3";

/// 사진 버킷에 객체를 올리는 S3 클라이언트.
#[derive(Debug)]
pub struct S3PhotoStore {
    client: Client,
    endpoint: Url,
    region: String,
    access_key_id: String,
    secret_access_key: SecretString,
    bucket: String,
    /// 버킷 생성 경합 방지
    bucket_lock: Mutex<()>,
}

impl S3PhotoStore {
    /// 설정에서 클라이언트 생성.
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let endpoint = Url::parse(config.endpoint.trim_end_matches('/'))
            .map_err(|e| StorageError::Config(format!("잘못된 endpoint '{}': {}", config.endpoint, e)))?;

        if endpoint.host_str().is_none() {
            return Err(StorageError::Config(format!(
                "endpoint에 호스트가 없습니다: {}",
                config.endpoint
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| StorageError::Config(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            region: config.region.clone(),
            access_key_id: config.access_key_id.clone(),
            secret_access_key: SecretString::from(config.secret_access_key.expose_secret()),
            bucket: config.photo_bucket.clone(),
            bucket_lock: Mutex::new(()),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// `{endpoint}/{bucket}/{key}` 형태의 공개 URL.
    pub fn object_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.as_str().trim_end_matches('/'),
            self.bucket,
            key
        )
    }

    fn host(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    /// 서명된 요청 전송.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &str,
        body: Vec<u8>,
        headers: &[(header::HeaderName, &str)],
    ) -> Result<reqwest::Response, StorageError> {
        let host = self.host();
        let signed = sigv4::sign(
            &SigningParams {
                access_key_id: &self.access_key_id,
                secret_access_key: self.secret_access_key.expose_secret(),
                region: &self.region,
                service: SERVICE,
            },
            &RequestToSign {
                method: method.as_str(),
                path,
                query,
                host: &host,
                payload: &body,
            },
            Utc::now(),
        );

        let mut url = self.endpoint.clone();
        url.set_path(&sigv4::uri_encode_path(path));
        url.set_query((!query.is_empty()).then_some(query));

        let mut request = self
            .client
            .request(method, url)
            .header(header::AUTHORIZATION, signed.authorization)
            .header("x-amz-date", signed.amz_date)
            .header("x-amz-content-sha256", signed.content_sha256);
        for (name, value) in headers {
            request = request.header(name.clone(), *value);
        }

        Ok(request.body(body).send().await?)
    }

    fn expect_success(
        response: &reqwest::Response,
        operation: &'static str,
    ) -> Result<(), StorageError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            error!(operation, status = status.as_u16(), "Object storage request failed");
            Err(StorageError::Status {
                operation,
                status: status.as_u16(),
            })
        }
    }

    /// 버킷이 없으면 생성하고 공개 읽기 정책을 적용합니다.
    pub async fn ensure_bucket(&self) -> Result<(), StorageError> {
        let _guard = self.bucket_lock.lock().await;
        let bucket_path = format!("/{}", self.bucket);

        let head = self
            .send(Method::HEAD, &bucket_path, "", Vec::new(), &[])
            .await?;
        if head.status().is_success() {
            debug!(bucket = %self.bucket, "Bucket already exists");
            return Ok(());
        }
        if head.status() != StatusCode::NOT_FOUND {
            Self::expect_success(&head, "head_bucket")?;
        }

        let create = self
            .send(Method::PUT, &bucket_path, "", Vec::new(), &[])
            .await?;
        Self::expect_success(&create, "create_bucket")?;

        let policy = public_read_policy(&self.bucket).into_bytes();
        let response = self
            .send(
                Method::PUT,
                &bucket_path,
                "policy=",
                policy,
                &[(header::CONTENT_TYPE, "application/json")],
            )
            .await?;
        Self::expect_success(&response, "put_bucket_policy")?;

        info!(bucket = %self.bucket, "Bucket created");
        Ok(())
    }
}

/// 버킷 객체에 대한 익명 읽기 허용 정책.
fn public_read_policy(bucket: &str) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": "*",
            "Action": "s3:GetObject",
            "Resource": format!("arn:aws:s3:::{}/*", bucket),
        }],
    })
    .to_string()
}

#[async_trait]
impl ObjectStore for S3PhotoStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.ensure_bucket().await?;

        let size = bytes.len();
        let response = self
            .send(
                Method::PUT,
                &format!("/{}/{}", self.bucket, key),
                "",
                bytes,
                &[
                    (header::CONTENT_TYPE, content_type),
                    (header::CONTENT_DISPOSITION, "inline"),
                ],
            )
            .await?;
        Self::expect_success(&response, "put_object")?;

        info!(bucket = %self.bucket, key, size, "Object uploaded");
        Ok(self.object_url(key))
    }
}
