use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use eventix_core::parse_id;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, ErrorBody},
    middleware::AuthUser,
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderTicketsRequest {
    pub event_id: String,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderTicketsResponse {
    pub message: String,
    pub order_id: uuid::Uuid,
    pub total_price: f64,
    pub quantity: i32,
    pub event_name: String,
    pub ticket_price: f64,
}

/// POST /api/tickets/order
#[utoipa::path(
    post,
    path = "/api/tickets/order",
    tag = "orders",
    request_body = OrderTicketsRequest,
    responses(
        (status = 200, description = "Tickets reserved", body = OrderTicketsResponse),
        (status = 400, description = "Invalid quantity or not enough tickets left", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 404, description = "No such event", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn order_tickets(
    State(state): State<AppState>,
    caller: AuthUser,
    payload: Result<Json<OrderTicketsRequest>, JsonRejection>,
) -> Result<Json<OrderTicketsResponse>, AppError> {
    let Json(req) = payload?;
    let event_id = parse_id(&req.event_id, "event")?;

    let reservation = state.reservations.reserve(event_id, caller.id, req.quantity).await?;

    Ok(Json(OrderTicketsResponse {
        message: "Tickets reserved".to_string(),
        order_id: reservation.order_id,
        total_price: reservation.total_price,
        quantity: reservation.quantity,
        event_name: reservation.event_name,
        ticket_price: reservation.ticket_price,
    }))
}
