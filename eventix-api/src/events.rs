use axum::{
    extract::{rejection::QueryRejection, DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use eventix_catalog::{DetailsInput, EventDraft};
use eventix_core::{parse_id, Event};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::{
    docs::{EventInputSchema, EventSchema},
    error::{AppError, ErrorBody},
    middleware::AuthUser,
    state::AppState,
    upload::{store_image, EventForm, StoredImage},
};

/// Room for one poster image plus the form fields.
const EVENT_BODY_LIMIT: usize = 10 * 1024 * 1024;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListEventsQuery {
    /// Case-insensitive match on name or description
    pub search: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EventMutationResponse {
    pub message: String,
    #[schema(value_type = EventSchema)]
    pub event: Event,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteEventResponse {
    pub message: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/events", get(list_events).post(create_event))
        .route("/api/events/{id}", get(get_event).put(update_event).delete(delete_event))
        .layer(DefaultBodyLimit::max(EVENT_BODY_LIMIT))
}

// ============================================================================
// Public Handlers
// ============================================================================

/// GET /api/events?search=
#[utoipa::path(
    get,
    path = "/api/events",
    tag = "events",
    params(ListEventsQuery),
    responses(
        (status = 200, description = "Events, optionally filtered", body = [EventSchema])
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    query: Result<Query<ListEventsQuery>, QueryRejection>,
) -> Result<Json<Vec<Event>>, AppError> {
    let Query(query) = query?;
    let events = state.catalog.list_events(query.search.as_deref()).await?;
    Ok(Json(events))
}

/// GET /api/events/{id}
#[utoipa::path(
    get,
    path = "/api/events/{id}",
    tag = "events",
    params(("id" = String, Path, description = "Event id")),
    responses(
        (status = 200, description = "The event", body = EventSchema),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 404, description = "No such event", body = ErrorBody)
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Event>, AppError> {
    let id = parse_id(&id, "event")?;
    Ok(Json(state.catalog.get_event(id).await?))
}

// ============================================================================
// Admin Handlers
// ============================================================================

/// POST /api/events
/// JSON body, or a multipart form with the same fields and an optional `image` file
#[utoipa::path(
    post,
    path = "/api/events",
    tag = "events",
    request_body(content = EventInputSchema, description = "JSON or multipart/form-data"),
    responses(
        (status = 201, description = "Event created", body = EventMutationResponse),
        (status = 400, description = "Invalid event", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn create_event(
    State(state): State<AppState>,
    caller: AuthUser,
    form: EventForm<EventDraft>,
) -> Result<(StatusCode, Json<EventMutationResponse>), AppError> {
    caller.require_admin()?;
    let EventForm { payload: mut draft, image } = form;

    let stored = match &image {
        Some(image) => Some(store_image(state.http.static_dir.as_deref(), image).await?),
        None => None,
    };
    if let Some(stored) = &stored {
        draft.image_url = Some(stored.url.clone());
    }

    let event = discard_on_error(state.catalog.create_event(draft).await, stored).await?;
    info!(event_id = %event.id, admin = %caller.id, "Admin created event");

    Ok((
        StatusCode::CREATED,
        Json(EventMutationResponse { message: "Event created".to_string(), event }),
    ))
}

/// PUT /api/events/{id}
#[utoipa::path(
    put,
    path = "/api/events/{id}",
    tag = "events",
    params(("id" = String, Path, description = "Event id")),
    request_body(content = EventInputSchema, description = "JSON or multipart/form-data; inventory fields are ignored"),
    responses(
        (status = 200, description = "Event updated", body = EventMutationResponse),
        (status = 400, description = "Invalid event", body = ErrorBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
        (status = 404, description = "No such event", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn update_event(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
    form: EventForm<DetailsInput>,
) -> Result<Json<EventMutationResponse>, AppError> {
    caller.require_admin()?;
    let id = parse_id(&id, "event")?;
    let EventForm { payload: mut input, image } = form;

    let stored = match &image {
        Some(image) => Some(store_image(state.http.static_dir.as_deref(), image).await?),
        None => None,
    };
    if let Some(stored) = &stored {
        input.image_url = Some(stored.url.clone());
    }

    let event = discard_on_error(state.catalog.update_event(id, input).await, stored).await?;
    Ok(Json(EventMutationResponse { message: "Event updated".to_string(), event }))
}

/// DELETE /api/events/{id}
#[utoipa::path(
    delete,
    path = "/api/events/{id}",
    tag = "events",
    params(("id" = String, Path, description = "Event id")),
    responses(
        (status = 200, description = "Event deleted", body = DeleteEventResponse),
        (status = 403, description = "Caller is not an admin", body = ErrorBody),
        (status = 404, description = "No such event", body = ErrorBody),
        (status = 409, description = "Tickets reference the event or a reservation holds seats", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn delete_event(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteEventResponse>, AppError> {
    caller.require_admin()?;
    let id = parse_id(&id, "event")?;

    state.catalog.delete_event(id).await?;
    Ok(Json(DeleteEventResponse { message: "Event deleted".to_string() }))
}

/// Drops a freshly stored upload when the catalog rejected the request.
async fn discard_on_error<T>(
    result: eventix_core::CoreResult<T>,
    stored: Option<StoredImage>,
) -> Result<T, AppError> {
    match result {
        Ok(value) => Ok(value),
        Err(err) => {
            if let Some(stored) = stored {
                stored.discard().await;
            }
            Err(err.into())
        }
    }
}
