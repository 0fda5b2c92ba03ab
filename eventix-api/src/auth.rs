use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use eventix_core::identity::Registration;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    docs::RegistrationSchema,
    error::{AppError, ErrorBody},
    middleware::issue_token,
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/verify-email", post(verify_email))
}

/// POST /api/register
#[utoipa::path(
    post,
    path = "/api/register",
    tag = "auth",
    request_body = RegistrationSchema,
    responses(
        (status = 201, description = "Account created; verification code sent", body = MessageResponse),
        (status = 400, description = "Missing or invalid fields", body = ErrorBody),
        (status = 409, description = "E-mail already registered", body = ErrorBody)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let Json(registration) = payload?;
    state.identity.register(registration).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Registration successful. Check your e-mail for the verification code.".to_string(),
        }),
    ))
}

/// POST /api/login
#[utoipa::path(
    post,
    path = "/api/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session token", body = AuthResponse),
        (status = 401, description = "Wrong e-mail or password", body = ErrorBody),
        (status = 403, description = "E-mail not verified", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(req) = payload?;
    let user = state.identity.authenticate(&req.email, &req.password).await?;
    let token = issue_token(&state.auth, &user)?;

    Ok(Json(AuthResponse { token }))
}

/// POST /api/verify-email
#[utoipa::path(
    post,
    path = "/api/verify-email",
    tag = "auth",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Account verified", body = MessageResponse),
        (status = 401, description = "Wrong or expired code", body = ErrorBody),
        (status = 404, description = "Unknown e-mail", body = ErrorBody)
    )
)]
pub async fn verify_email(
    State(state): State<AppState>,
    payload: Result<Json<VerifyEmailRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(req) = payload?;
    state.identity.verify_email(&req.email, &req.code).await?;

    Ok(Json(MessageResponse { message: "E-mail verified.".to_string() }))
}
