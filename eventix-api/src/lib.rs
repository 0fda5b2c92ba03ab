use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self as axum_middleware, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod docs;
pub mod error;
pub mod events;
pub mod middleware;
pub mod orders;
pub mod state;
pub mod stream;
pub mod tickets;
pub mod upload;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.http.allowed_origins);

    let protected = Router::new()
        .route("/api/tickets/order", post(tickets::order_tickets))
        .route("/api/orders/my", get(orders::my_orders))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), middleware::require_auth));

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/api/events/stream", get(stream::catalog_stream))
        .merge(auth::routes())
        .merge(events::routes())
        .merge(protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs::ApiDoc::openapi()));

    if let Some(dir) = &state.http.static_dir {
        router = router.nest_service("/static", ServeDir::new(dir));
    }

    if state.rate_limit.is_some() {
        router = router.layer(axum_middleware::from_fn_with_state(state.clone(), rate_limit_middleware));
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::USER_AGENT])
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(limit) = &state.rate_limit else {
        return next.run(req).await;
    };
    // Absent when the router is driven without a socket (tests)
    let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>().cloned() else {
        return next.run(req).await;
    };

    let key = format!("ratelimit:{}", addr.ip());
    match limit.limiter.check_rate_limit(&key, limit.requests, limit.window_seconds).await {
        Ok(true) => next.run(req).await,
        Ok(false) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Rate limit exceeded", "kind": "rate_limited" })),
        )
            .into_response(),
        Err(e) => {
            // Fail open
            tracing::warn!("Rate limiter unavailable: {}", e);
            next.run(req).await
        }
    }
}
