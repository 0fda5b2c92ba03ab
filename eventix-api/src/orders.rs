use axum::{extract::State, Json};
use eventix_order::OrderDetail;

use crate::{
    docs::OrderDetailSchema,
    error::{AppError, ErrorBody},
    middleware::AuthUser,
    state::AppState,
};

/// GET /api/orders/my
/// Purchase history of the caller, newest first
#[utoipa::path(
    get,
    path = "/api/orders/my",
    tag = "orders",
    responses(
        (status = 200, description = "Orders, newest first", body = [OrderDetailSchema]),
        (status = 401, description = "Missing or invalid token", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn my_orders(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<Vec<OrderDetail>>, AppError> {
    Ok(Json(state.history.orders_for_user(caller.id).await?))
}
