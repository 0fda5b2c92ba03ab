use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use eventix_core::CoreError;
use serde::Serialize;
use utoipa::ToSchema;

/// Body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    /// Stable machine-readable category, e.g. `insufficient_inventory`
    pub kind: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] CoreError),
    #[error("{0}")]
    AuthenticationError(String),
    #[error("{0}")]
    AuthorizationError(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    InternalServerError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Domain(err) => match err {
                CoreError::InvalidInput(_) | CoreError::InsufficientInventory { .. } => StatusCode::BAD_REQUEST,
                CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                CoreError::Conflict(_) => StatusCode::CONFLICT,
                CoreError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
                CoreError::StorageFailure(_)
                | CoreError::CompensationFailure { .. }
                | CoreError::ExternalService(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            AppError::AuthorizationError(_) => StatusCode::FORBIDDEN,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Domain(err) => err.kind(),
            AppError::AuthenticationError(_) => "unauthorized",
            AppError::AuthorizationError(_) => "forbidden",
            AppError::ValidationError(_) => "invalid_input",
            AppError::InternalServerError(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        let message = match &self {
            AppError::Domain(CoreError::CompensationFailure { event_id, quantity, reason }) => {
                tracing::error!(
                    alarm = "inventory_compensation",
                    event_id = %event_id,
                    quantity,
                    "Reservation left inconsistent state: {}",
                    reason
                );
                "Reservation failed and requires manual reconciliation".to_string()
            }
            AppError::Domain(CoreError::ExternalService(msg)) => {
                tracing::error!("External service failure: {}", msg);
                "Could not deliver the verification code".to_string()
            }
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("Internal Server Error: {}", self);
                "Internal Server Error".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(ErrorBody { error: message, kind: kind.to_string() });

        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}
