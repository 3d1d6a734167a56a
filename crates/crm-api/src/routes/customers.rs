//! 고객 관리 endpoint (인증된 사용자).
//!
//! - `GET /customers` - 고객 목록
//! - `GET /customers/{id}` - 고객 조회
//! - `POST /customers` - 고객 생성
//! - `PUT /customers/{id}` - 고객 수정
//! - `DELETE /customers/{id}` - 고객 삭제 (생성자만)
//! - `PUT /customers/{id}/upload_photo` - 사진 업로드 (multipart `file`)

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{get, put},
    Json, Router,
};
use crm_core::{Customer, CustomerChanges, CustomerId, NewCustomer};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::{bad_request, not_found, validation_error, ApiErrorResponse, ApiResult};
use crate::state::AppState;
use crate::storage::{file_extension, image_content_type, photo_object_key};

/// 업로드 허용 최대 크기 (10MB).
const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

/// 고객 생성 요청.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, message = "name은 비어 있을 수 없습니다"))]
    pub name: String,
    #[validate(length(min = 1, message = "surname은 비어 있을 수 없습니다"))]
    pub surname: String,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// 고객 수정 요청. 비어 있는 값은 무시됩니다.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCustomerRequest {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub photo_url: Option<String>,
}

impl From<UpdateCustomerRequest> for CustomerChanges {
    fn from(request: UpdateCustomerRequest) -> Self {
        Self {
            name: request.name,
            surname: request.surname,
            photo_url: request.photo_url,
        }
    }
}

/// 삭제 결과.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CustomerDeletedResponse {
    pub detail: String,
}

/// 고객 목록.
#[utoipa::path(
    get,
    path = "/api/v1/customers",
    responses(
        (status = 200, description = "고객 목록", body = Vec<Customer>),
        (status = 401, description = "인증 필요", body = ApiErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "customers"
)]
pub async fn list_customers(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(state.customers.list_customers().await?))
}

/// 고객 조회.
#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}",
    params(("id" = i32, Path, description = "고객 ID")),
    responses(
        (status = 200, description = "고객", body = Customer),
        (status = 404, description = "고객 없음", body = ApiErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "customers"
)]
pub async fn get_customer(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<CustomerId>,
) -> ApiResult<Json<Customer>> {
    state
        .customers
        .get_customer(id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Customer not found"))
}

/// 고객 생성.
#[utoipa::path(
    post,
    path = "/api/v1/customers",
    request_body = CreateCustomerRequest,
    responses(
        (status = 200, description = "생성된 고객", body = Customer),
        (status = 400, description = "입력 오류", body = ApiErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "customers"
)]
pub async fn create_customer(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateCustomerRequest>,
) -> ApiResult<Json<Customer>> {
    request.validate().map_err(|e| validation_error(&e))?;

    let customer = state
        .customers
        .create_customer(
            NewCustomer {
                name: request.name,
                surname: request.surname,
                photo_url: request.photo_url.filter(|url| !url.is_empty()),
            },
            user.id,
        )
        .await?;

    info!(customer_id = customer.id, by = user.id, "Customer created");
    Ok(Json(customer))
}

/// 고객 수정.
#[utoipa::path(
    put,
    path = "/api/v1/customers/{id}",
    params(("id" = i32, Path, description = "고객 ID")),
    request_body = UpdateCustomerRequest,
    responses(
        (status = 200, description = "수정된 고객", body = Customer),
        (status = 404, description = "고객 없음", body = ApiErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "customers"
)]
pub async fn update_customer(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<CustomerId>,
    Json(request): Json<UpdateCustomerRequest>,
) -> ApiResult<Json<Customer>> {
    let customer = state
        .customers
        .update_customer(id, request.into(), user.id)
        .await?
        .ok_or_else(|| not_found("Customer not found"))?;

    info!(customer_id = id, by = user.id, "Customer updated");
    Ok(Json(customer))
}

/// 고객 삭제.
///
/// 생성한 사용자만 삭제할 수 있으며, 그 외에는 존재하지 않는 것처럼 404를 반환합니다.
#[utoipa::path(
    delete,
    path = "/api/v1/customers/{id}",
    params(("id" = i32, Path, description = "고객 ID")),
    responses(
        (status = 200, description = "삭제 완료", body = CustomerDeletedResponse),
        (status = 404, description = "고객 없음", body = ApiErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "customers"
)]
pub async fn delete_customer(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<CustomerId>,
) -> ApiResult<Json<CustomerDeletedResponse>> {
    let owned = state
        .customers
        .get_customer(id)
        .await?
        .is_some_and(|customer| customer.creator_id == user.id);

    if !owned || !state.customers.delete_customer(id).await? {
        warn!(customer_id = id, by = user.id, "Customer not found or not owned");
        return Err(not_found("Customer not found"));
    }

    info!(customer_id = id, by = user.id, "Customer deleted");
    Ok(Json(CustomerDeletedResponse {
        detail: "Customer deleted".to_string(),
    }))
}

/// 고객 사진 업로드.
///
/// multipart 필드 `file`을 `{uuid}.{확장자}` 키로 저장하고 URL을 `photo_url`에 기록합니다.
#[utoipa::path(
    put,
    path = "/api/v1/customers/{id}/upload_photo",
    params(("id" = i32, Path, description = "고객 ID")),
    request_body(content_type = "multipart/form-data", description = "file 필드"),
    responses(
        (status = 200, description = "사진이 반영된 고객", body = Customer),
        (status = 400, description = "파일 없음 또는 형식 오류", body = ApiErrorResponse),
        (status = 404, description = "고객 없음", body = ApiErrorResponse),
        (status = 500, description = "스토리지 오류", body = ApiErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "customers"
)]
pub async fn upload_photo(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<CustomerId>,
    mut multipart: Multipart,
) -> ApiResult<Json<Customer>> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(e.body_text()))?;
        upload = Some((filename, bytes));
        break;
    }

    let Some((filename, bytes)) = upload else {
        warn!(customer_id = id, "No file provided for photo upload");
        return Err(bad_request("No file provided"));
    };
    let Some((extension, content_type)) = file_extension(&filename)
        .and_then(|ext| image_content_type(ext).map(|content_type| (ext, content_type)))
    else {
        warn!(customer_id = id, filename = %filename, "Invalid file format for photo upload");
        return Err(bad_request("Invalid file format"));
    };

    if state.customers.get_customer(id).await?.is_none() {
        return Err(not_found("Customer not found"));
    }

    let key = photo_object_key(extension);
    let photo_url = state
        .photos
        .put_object(&key, bytes.to_vec(), content_type)
        .await?;

    let customer = state
        .customers
        .update_customer(
            id,
            CustomerChanges {
                photo_url: Some(photo_url),
                ..Default::default()
            },
            user.id,
        )
        .await?
        .ok_or_else(|| not_found("Customer not found"))?;

    info!(customer_id = id, key = %key, size = bytes.len(), "Customer photo uploaded");
    Ok(Json(customer))
}

/// 고객 라우터 생성.
pub fn customers_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route(
            "/{id}",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        .route(
            "/{id}/upload_photo",
            put(upload_photo).layer(DefaultBodyLimit::max(MAX_PHOTO_BYTES)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{CustomerStore, UserStore};
    use crate::state::{create_test_state, TestContext};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use crm_core::{NewUser, User};
    use tower::ServiceExt;

    const BOUNDARY: &str = "crm-test-boundary";

    async fn seed_user(ctx: &TestContext, username: &str) -> (User, String) {
        let user = ctx
            .users
            .create_user(NewUser {
                username: username.to_string(),
                hashed_password: ctx.state.auth.hasher().hash("secret").unwrap(),
                is_admin: false,
            })
            .await
            .unwrap();
        let token = ctx.state.auth.issue_token(user.id, None).unwrap();
        (user, token)
    }

    async fn seed_customer(ctx: &TestContext, creator: &User) -> Customer {
        ctx.customers
            .create_customer(
                NewCustomer {
                    name: "Ada".to_string(),
                    surname: "Lovelace".to_string(),
                    photo_url: None,
                },
                creator.id,
            )
            .await
            .unwrap()
    }

    fn app(ctx: &TestContext) -> Router {
        Router::new()
            .nest("/customers", customers_router())
            .with_state(ctx.state.clone())
    }

    fn json_request(method: &str, uri: &str, token: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    fn multipart_request(uri: &str, token: &str, field: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("PUT")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_requires_authentication() {
        let ctx = create_test_state();

        let response = app(&ctx)
            .oneshot(Request::builder().uri("/customers").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_customer_records_creator() {
        let ctx = create_test_state();
        let (user, token) = seed_user(&ctx, "alice").await;

        let response = app(&ctx)
            .oneshot(json_request(
                "POST",
                "/customers",
                &token,
                serde_json::json!({"name": "Grace", "surname": "Hopper"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let customer: Customer = body_json(response).await;
        assert_eq!(customer.name, "Grace");
        assert_eq!(customer.creator_id, user.id);
        assert_eq!(customer.modifier_id, user.id);
        assert_eq!(customer.photo_url, None);
    }

    #[tokio::test]
    async fn test_create_customer_validation() {
        let ctx = create_test_state();
        let (_, token) = seed_user(&ctx, "alice").await;

        let response = app(&ctx)
            .oneshot(json_request(
                "POST",
                "/customers",
                &token,
                serde_json::json!({"name": "", "surname": "Hopper"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error: ApiErrorResponse = body_json(response).await;
        assert_eq!(error.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_update_customer_sets_modifier() {
        let ctx = create_test_state();
        let (alice, _) = seed_user(&ctx, "alice").await;
        let (bob, bob_token) = seed_user(&ctx, "bob").await;
        let customer = seed_customer(&ctx, &alice).await;

        let response = app(&ctx)
            .oneshot(json_request(
                "PUT",
                &format!("/customers/{}", customer.id),
                &bob_token,
                serde_json::json!({"name": "", "surname": "Byron"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let updated: Customer = body_json(response).await;
        assert_eq!(updated.name, "Ada");
        assert_eq!(updated.surname, "Byron");
        assert_eq!(updated.creator_id, alice.id);
        assert_eq!(updated.modifier_id, bob.id);
    }

    #[tokio::test]
    async fn test_get_missing_customer() {
        let ctx = create_test_state();
        let (_, token) = seed_user(&ctx, "alice").await;

        let response = app(&ctx)
            .oneshot(empty_request("GET", "/customers/404", &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let error: ApiErrorResponse = body_json(response).await;
        assert_eq!(error.message, "Customer not found");
    }

    #[tokio::test]
    async fn test_only_creator_can_delete() {
        let ctx = create_test_state();
        let (alice, alice_token) = seed_user(&ctx, "alice").await;
        let (_, bob_token) = seed_user(&ctx, "bob").await;
        let customer = seed_customer(&ctx, &alice).await;
        let uri = format!("/customers/{}", customer.id);

        let response = app(&ctx)
            .oneshot(empty_request("DELETE", &uri, &bob_token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(ctx.customers.get_customer(customer.id).await.unwrap().is_some());

        let response = app(&ctx)
            .oneshot(empty_request("DELETE", &uri, &alice_token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let deleted: CustomerDeletedResponse = body_json(response).await;
        assert_eq!(deleted.detail, "Customer deleted");
        assert!(ctx.customers.get_customer(customer.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upload_photo() {
        let ctx = create_test_state();
        let (alice, token) = seed_user(&ctx, "alice").await;
        let customer = seed_customer(&ctx, &alice).await;

        let response = app(&ctx)
            .oneshot(multipart_request(
                &format!("/customers/{}/upload_photo", customer.id),
                &token,
                "file",
                "portrait.PNG",
                b"\x89PNG-bytes",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let updated: Customer = body_json(response).await;
        let url = updated.photo_url.expect("photo url is set");
        assert!(url.starts_with("http://localhost:9000/profile-folder/"));
        assert!(url.ends_with(".png"));

        let key = url.rsplit('/').next().unwrap();
        let stored = ctx.photos.get(key).await.unwrap();
        assert_eq!(stored.bytes, b"\x89PNG-bytes");
        assert_eq!(stored.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_upload_photo_without_file() {
        let ctx = create_test_state();
        let (alice, token) = seed_user(&ctx, "alice").await;
        let customer = seed_customer(&ctx, &alice).await;

        let response = app(&ctx)
            .oneshot(multipart_request(
                &format!("/customers/{}/upload_photo", customer.id),
                &token,
                "other",
                "portrait.png",
                b"bytes",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error: ApiErrorResponse = body_json(response).await;
        assert_eq!(error.message, "No file provided");
    }

    #[tokio::test]
    async fn test_upload_photo_without_extension() {
        let ctx = create_test_state();
        let (alice, token) = seed_user(&ctx, "alice").await;
        let customer = seed_customer(&ctx, &alice).await;

        let response = app(&ctx)
            .oneshot(multipart_request(
                &format!("/customers/{}/upload_photo", customer.id),
                &token,
                "file",
                "portrait",
                b"bytes",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error: ApiErrorResponse = body_json(response).await;
        assert_eq!(error.message, "Invalid file format");
        assert_eq!(ctx.photos.len().await, 0);
    }

    #[tokio::test]
    async fn test_upload_photo_rejects_non_image_types() {
        let ctx = create_test_state();
        let (alice, token) = seed_user(&ctx, "alice").await;
        let customer = seed_customer(&ctx, &alice).await;

        for filename in ["portrait.svg", "page.html", "script.js"] {
            let response = app(&ctx)
                .oneshot(multipart_request(
                    &format!("/customers/{}/upload_photo", customer.id),
                    &token,
                    "file",
                    filename,
                    b"<svg onload=\"alert(1)\"/>",
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", filename);

            let error: ApiErrorResponse = body_json(response).await;
            assert_eq!(error.message, "Invalid file format");
        }

        assert_eq!(ctx.photos.len().await, 0);
        let unchanged = ctx.customers.get_customer(customer.id).await.unwrap().unwrap();
        assert_eq!(unchanged.photo_url, None);
    }

    #[tokio::test]
    async fn test_upload_photo_unknown_customer() {
        let ctx = create_test_state();
        let (_, token) = seed_user(&ctx, "alice").await;

        let response = app(&ctx)
            .oneshot(multipart_request(
                "/customers/77/upload_photo",
                &token,
                "file",
                "portrait.png",
                b"bytes",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(ctx.photos.len().await, 0);
    }

    #[tokio::test]
    async fn test_upload_photo_storage_failure() {
        let ctx = create_test_state();
        let (alice, token) = seed_user(&ctx, "alice").await;
        let customer = seed_customer(&ctx, &alice).await;
        ctx.photos.set_unavailable(true);

        let response = app(&ctx)
            .oneshot(multipart_request(
                &format!("/customers/{}/upload_photo", customer.id),
                &token,
                "file",
                "portrait.png",
                b"bytes",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let unchanged = ctx.customers.get_customer(customer.id).await.unwrap().unwrap();
        assert_eq!(unchanged.photo_url, None);
    }
}
