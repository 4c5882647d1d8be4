use std::sync::Arc;

use axum::{
    extract::{FromRequest, Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use tracing::warn;

use service::auth::{
    domain::{AuthUser, Identity, LoginInput, RegisterInput, TokenPayload},
    repository::UserRepository,
    AuthConfig, AuthError, AuthService,
};

use crate::errors::ApiError;
use crate::observability;

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Clone)]
pub struct ServerState {
    pub auth: Arc<AuthService<dyn UserRepository>>,
}

impl ServerState {
    pub fn new(repo: Arc<dyn UserRepository>, cfg: AuthConfig) -> Result<Self, AuthError> {
        let auth = AuthService::new(repo, cfg)?;
        Ok(Self { auth: Arc::new(auth) })
    }
}

/// `Json` whose rejections render as [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Serialize)]
pub struct RegisterOutput { pub user: AuthUser, pub message: &'static str }

#[derive(Serialize)]
pub struct LoginOutput { pub payload: TokenPayload, pub token: String }

#[utoipa::path(
    post,
    path = "/register",
    tag = "auth",
    request_body = crate::openapi::RegisterRequest,
    responses(
        (status = 201, description = "User created", body = crate::openapi::RegisterResponse),
        (status = 400, description = "Missing fields or user already exists", body = crate::openapi::MessageResponse),
        (status = 500, description = "Server error", body = crate::openapi::MessageResponse)
    )
)]
pub async fn register(State(state): State<ServerState>, ApiJson(input): ApiJson<RegisterInput>) -> Result<(StatusCode, Json<RegisterOutput>), ApiError> {
    let user = state.auth.register(input).await?;
    observability::REGISTRATIONS_TOTAL.inc();
    Ok((StatusCode::CREATED, Json(RegisterOutput { user, message: "user created" })))
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = crate::openapi::LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = crate::openapi::LoginResponse),
        (status = 400, description = "Invalid password", body = crate::openapi::MessageResponse),
        (status = 404, description = "User not found", body = crate::openapi::MessageResponse),
        (status = 500, description = "Server error", body = crate::openapi::MessageResponse)
    )
)]
pub async fn login(State(state): State<ServerState>, jar: CookieJar, ApiJson(input): ApiJson<LoginInput>) -> Result<(CookieJar, Json<LoginOutput>), ApiError> {
    let session = state
        .auth
        .login(input)
        .await
        .inspect_err(|_| observability::LOGINS_TOTAL.with_label_values(&["failure"]).inc())?;
    observability::LOGINS_TOTAL.with_label_values(&["success"]).inc();

    let mut cookie = Cookie::new(AUTH_COOKIE, session.token.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    let jar = jar.add(cookie);
    Ok((jar, Json(LoginOutput { payload: session.payload, token: session.token })))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current user", body = crate::openapi::UserDoc),
        (status = 400, description = "User not found or token missing", body = crate::openapi::MessageResponse),
        (status = 401, description = "Invalid or expired token", body = crate::openapi::MessageResponse),
        (status = 500, description = "Server error", body = crate::openapi::MessageResponse)
    )
)]
pub async fn me(State(state): State<ServerState>, Extension(identity): Extension<Identity>) -> Result<Json<AuthUser>, ApiError> {
    // a deleted user behind a still-valid token is reported as 400
    let user = state.auth.current_user(identity).await.map_err(|e| {
        let not_found = matches!(e, AuthError::NotFound);
        let mut err = ApiError::from(e);
        if not_found {
            err.status = StatusCode::BAD_REQUEST;
        }
        err
    })?;
    observability::SESSION_LOOKUPS_TOTAL.inc();
    Ok(Json(user))
}

/// Verify the session token and attach the caller's [`Identity`].
///
/// Token comes from `Authorization: Bearer <token>`, falling back to the
/// `auth_token` cookie. Missing token is 400; malformed header, bad signature
/// or expiry is 401.
pub async fn require_bearer(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = req.uri().path().to_owned();
    let token = extract_token(req.headers()).inspect_err(|e| {
        warn!(%path, status = %e.status, "missing or malformed credentials");
    })?;
    let claims = state.auth.verify_token(&token).inspect_err(|_| {
        warn!(%path, "token validation failed");
    })?;
    req.extensions_mut().insert(Identity::from(&claims));
    Ok(next.run(req).await)
}

fn extract_token(headers: &HeaderMap) -> Result<String, ApiError> {
    if let Some(value) = headers.get(AUTHORIZATION) {
        return value
            .to_str()
            .ok()
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| ApiError::unauthorized("invalid token"));
    }
    CookieJar::from_headers(headers)
        .get(AUTH_COOKIE)
        .map(|c| c.value().to_owned())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing token"))
}
