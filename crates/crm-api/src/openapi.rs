//! OpenAPI 문서화 설정.
//!
//! utoipa를 사용하여 REST API의 OpenAPI 3.0 스펙을 생성합니다.
//! Swagger UI는 `/swagger-ui` 경로에서 사용 가능합니다.
//!
//! 새로운 엔드포인트를 추가할 때:
//!
//! 1. 응답/요청 타입에 `#[derive(ToSchema)]` 추가
//! 2. 핸들러에 `#[utoipa::path(...)]` 어노테이션 추가
//! 3. 이 파일의 `components(schemas(...))` 및 `paths(...)` 섹션에 추가

use axum::Router;
use crm_core::Customer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiErrorResponse;
use crate::routes::{
    ComponentHealth, ComponentStatus, CreateCustomerRequest, CreateUserRequest,
    CustomerDeletedResponse, DeletedResponse, HealthResponse, LoginForm, RefreshTokenRequest,
    TokenResponse, UpdateCustomerRequest, UpdateUserRequest, UserResponse,
};

/// `Authorization: Bearer <token>` 인증 방식 등록.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

// ==================== OpenAPI 문서 정의 ====================

/// Customer Management API 문서.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Customer Management API",
        description = r#"
# 고객 관리 REST API

사용자 계정과 고객 레코드를 관리하는 REST API입니다.

## 인증

`/login` 또는 `/admin/login`에서 발급받은 토큰을
`Authorization: Bearer <token>` 헤더에 포함하세요.
사용자 관리 엔드포인트는 관리자 토큰이 필요합니다.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8000", description = "로컬 개발 서버"),
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "헬스 체크 - 서버 상태 확인"),
        (name = "auth", description = "인증 - 로그인 및 토큰 갱신"),
        (name = "users", description = "사용자 관리 - 관리자 전용"),
        (name = "customers", description = "고객 관리 - 고객 CRUD 및 사진 업로드")
    ),
    // ==================== 스키마 등록 ====================
    components(
        schemas(
            // ===== Health =====
            HealthResponse,
            ComponentHealth,
            ComponentStatus,

            // ===== Common =====
            ApiErrorResponse,

            // ===== Auth =====
            LoginForm,
            RefreshTokenRequest,
            TokenResponse,

            // ===== Users =====
            UserResponse,
            CreateUserRequest,
            UpdateUserRequest,
            DeletedResponse,

            // ===== Customers =====
            Customer,
            CreateCustomerRequest,
            UpdateCustomerRequest,
            CustomerDeletedResponse,
        )
    ),
    // ==================== 경로 등록 ====================
    paths(
        // ===== Health =====
        crate::routes::health::health_check,
        crate::routes::health::health_ready,

        // ===== Auth =====
        crate::routes::auth::user_login,
        crate::routes::auth::admin_login,
        crate::routes::auth::refresh_token,

        // ===== Users =====
        crate::routes::users::list_users,
        crate::routes::users::get_user,
        crate::routes::users::create_user,
        crate::routes::users::update_user,
        crate::routes::users::delete_user,

        // ===== Customers =====
        crate::routes::customers::list_customers,
        crate::routes::customers::get_customer,
        crate::routes::customers::create_customer,
        crate::routes::customers::update_customer,
        crate::routes::customers::delete_customer,
        crate::routes::customers::upload_photo,
    )
)]
pub struct ApiDoc;

// ==================== Swagger UI 라우터 ====================

/// OpenAPI JSON 경로 (`{api_prefix}/openapi.json`).
pub fn openapi_json_path(api_prefix: &str) -> String {
    format!("{}/openapi.json", api_prefix.trim().trim_end_matches('/'))
}

/// Swagger UI 라우터 생성.
///
/// - `/swagger-ui` - Swagger UI 대화형 문서
/// - `{api_prefix}/openapi.json` - OpenAPI JSON 스펙
pub fn swagger_ui_router<S>(api_prefix: &str) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    SwaggerUi::new("/swagger-ui")
        .url(openapi_json_path(api_prefix), ApiDoc::openapi())
        .into()
}

// ==================== 테스트 ====================
