use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Events
// ============================================================================

/// A ticketed event in the catalog.
///
/// `total_tickets` is fixed at creation. `available_tickets` only moves through the
/// reservation engine's conditional decrement (and its compensating increment), so
/// `0 <= available_tickets <= total_tickets` always holds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
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

impl Event {
    pub fn new(details: EventDetails, total_tickets: i32, available_tickets: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: details.name,
            description: details.description,
            location: details.location,
            date: details.date,
            total_tickets,
            available_tickets,
            ticket_price: details.ticket_price,
            image_url: details.image_url,
            created_at: Utc::now(),
        }
    }

    /// Replace the descriptive fields. Inventory counters are left untouched.
    pub fn apply_details(&mut self, details: &EventDetails) {
        self.name = details.name.clone();
        self.description = details.description.clone();
        self.location = details.location.clone();
        self.date = details.date;
        self.ticket_price = details.ticket_price;
        if details.image_url.is_some() {
            self.image_url = details.image_url.clone();
        }
    }
}

/// The metadata an administrator may edit after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventDetails {
    pub name: String,
    pub description: String,
    pub location: String,
    pub date: DateTime<Utc>,
    pub ticket_price: f64,
    pub image_url: Option<String>,
}

// ============================================================================
// Tickets & Orders
// ============================================================================

/// One purchase of `quantity` seats. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub quantity: i32,
    pub purchase_time: DateTime<Utc>,
}

impl Ticket {
    pub fn new(user_id: Uuid, event_id: Uuid, quantity: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            event_id,
            quantity,
            purchase_time: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "canceled" => Ok(OrderStatus::Canceled),
            other => Err(format!("unknown order status '{}'", other)),
        }
    }
}

/// The billing record paired with exactly one ticket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ticket_id: Uuid,
    pub status: OrderStatus,
    pub total_price: f64,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// New orders start as pending; payment settlement happens elsewhere.
    pub fn pending(user_id: Uuid, ticket_id: Uuid, total_price: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            ticket_id,
            status: OrderStatus::Pending,
            total_price,
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub verify_code: Option<String>,
    pub verify_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(price: f64) -> EventDetails {
        EventDetails {
            name: "Launch Night".to_string(),
            description: "Doors at 7".to_string(),
            location: "Hall A".to_string(),
            date: Utc::now(),
            ticket_price: price,
            image_url: None,
        }
    }

    #[test]
    fn test_apply_details_keeps_inventory() {
        let mut event = Event::new(details(50.0), 10, 7);
        event.image_url = Some("/static/uploads/a.png".to_string());

        event.apply_details(&details(75.0));

        assert_eq!(event.ticket_price, 75.0);
        assert_eq!(event.total_tickets, 10);
        assert_eq!(event.available_tickets, 7);
        // No new image supplied, the old one stays
        assert_eq!(event.image_url.as_deref(), Some("/static/uploads/a.png"));
    }

    #[test]
    fn test_status_and_role_strings() {
        assert_eq!("pending".parse::<OrderStatus>().unwrap(), OrderStatus::Pending);
        assert_eq!(OrderStatus::Canceled.to_string(), "canceled");
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_user_secrets_are_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Ann".to_string(),
            email: "ann@example.com".to_string(),
            password_hash: "$argon2id$...".to_string(),
            role: Role::User,
            is_verified: false,
            verify_code: Some("123456".to_string()),
            verify_expires_at: None,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("verify_code").is_none());
        assert_eq!(json["role"], "user");
    }
}
