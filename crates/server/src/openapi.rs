use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct MessageResponse { pub message: String }

#[derive(ToSchema)]
pub struct RegisterRequest { pub email: String, pub password: String, pub fullname: String }

#[derive(ToSchema)]
pub struct LoginRequest { pub email: String, pub password: String }

#[derive(ToSchema)]
pub struct UserDoc {
    pub id: Uuid,
    pub email: String,
    pub fullname: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(ToSchema)]
pub struct RegisterResponse { pub user: UserDoc, pub message: String }

#[derive(ToSchema)]
pub struct TokenPayloadDoc { pub id: Uuid, pub email: String, pub fullname: String }

#[derive(ToSchema)]
pub struct LoginResponse { pub payload: TokenPayloadDoc, pub token: String }

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::me,
    ),
    components(
        schemas(
            HealthResponse,
            MessageResponse,
            RegisterRequest,
            LoginRequest,
            UserDoc,
            RegisterResponse,
            TokenPayloadDoc,
            LoginResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health"),
        (name = "auth")
    )
)]
pub struct ApiDoc;
