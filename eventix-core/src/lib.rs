pub mod models;
pub mod repository;
pub mod identity;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;

pub use models::{Event, EventDetails, Order, OrderStatus, Role, Ticket, User};

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Insufficient inventory for event {event_id}: requested {requested}")]
    InsufficientInventory {
        event_id: Uuid,
        requested: i32,
    },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Authentication failed: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Storage failure: {0}")]
    StorageFailure(String),
    #[error("Compensation failed for event {event_id} (quantity {quantity}): {reason}")]
    CompensationFailure {
        event_id: Uuid,
        quantity: i32,
        reason: String,
    },
    #[error("External service error: {0}")]
    ExternalService(String),
}

impl CoreError {
    /// Stable category name surfaced to API callers.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::InvalidInput(_) => "invalid_input",
            CoreError::NotFound(_) => "not_found",
            CoreError::InsufficientInventory { .. } => "insufficient_inventory",
            CoreError::Conflict(_) => "conflict",
            CoreError::Unauthorized(_) => "unauthorized",
            CoreError::Forbidden(_) => "forbidden",
            CoreError::StorageFailure(_) => "storage_failure",
            CoreError::CompensationFailure { .. } => "compensation_failure",
            CoreError::ExternalService(_) => "external_service",
        }
    }
}

impl From<repository::StoreError> for CoreError {
    fn from(err: repository::StoreError) -> Self {
        CoreError::StorageFailure(err.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Parse an opaque identifier supplied by a caller.
pub fn parse_id(raw: &str, what: &str) -> CoreResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| CoreError::InvalidInput(format!("malformed {} id: '{}'", what, raw)))
}
