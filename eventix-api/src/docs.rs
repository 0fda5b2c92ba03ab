use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi, ToSchema,
};
use uuid::Uuid;

use crate::{auth, error::ErrorBody, events, orders, tickets};

/// Wire shape of an event.
#[derive(Serialize, ToSchema)]
pub struct EventSchema {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub location: String,
    pub date: DateTime<Utc>,
    pub total_tickets: i32,
    pub available_tickets: i32,
    pub ticket_price: f64,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Event fields accepted on create and update. Multipart forms may add an `image` file part.
#[derive(Serialize, ToSchema)]
pub struct EventInputSchema {
    pub name: String,
    pub description: Option<String>,
    pub location: String,
    /// RFC 3339, in the future
    pub date: String,
    /// Create only
    pub total_tickets: Option<i32>,
    /// Create only; must equal `total_tickets`
    pub available_tickets: Option<i32>,
    pub ticket_price: f64,
    pub image_url: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct RegistrationSchema {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct OrderDetailSchema {
    pub order_id: Uuid,
    pub event_name: String,
    pub quantity: i32,
    pub ticket_price: f64,
    pub total_price: f64,
    /// `pending`, `paid` or `canceled`
    pub status: String,
    /// `YYYY-MM-DD HH:MM`
    pub event_date: String,
    /// `YYYY-MM-DD HH:MM`
    pub purchase_time: String,
}

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
    info(
        title = "Eventix API",
        description = "Event catalog, accounts and ticket reservations",
    ),
    paths(
        auth::register,
        auth::login,
        auth::verify_email,
        events::list_events,
        events::get_event,
        events::create_event,
        events::update_event,
        events::delete_event,
        tickets::order_tickets,
        orders::my_orders,
    ),
    components(schemas(
        EventSchema,
        EventInputSchema,
        RegistrationSchema,
        OrderDetailSchema,
        ErrorBody,
        auth::LoginRequest,
        auth::VerifyEmailRequest,
        auth::AuthResponse,
        auth::MessageResponse,
        events::EventMutationResponse,
        events::DeleteEventResponse,
        tickets::OrderTicketsRequest,
        tickets::OrderTicketsResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Registration, verification and login"),
        (name = "events", description = "Event catalog"),
        (name = "orders", description = "Ticket reservations and purchase history"),
    )
)]
pub struct ApiDoc;
