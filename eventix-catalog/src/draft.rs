use chrono::{DateTime, Utc};
use eventix_core::{CoreError, CoreResult, Event, EventDetails};
use serde::Deserialize;

/// Admin input for a new event, validated into an [`Event`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    /// RFC 3339
    #[serde(default)]
    pub date: String,
    pub total_tickets: Option<i32>,
    /// Optional; must equal `total_tickets` when given
    pub available_tickets: Option<i32>,
    pub ticket_price: Option<f64>,
    pub image_url: Option<String>,
}

impl EventDraft {
    pub fn into_event(self, now: DateTime<Utc>) -> CoreResult<Event> {
        let total_tickets = self.total_tickets
            .filter(|t| *t > 0)
            .ok_or_else(|| invalid("total_tickets must be a positive integer"))?;
        // Nothing is sold yet, so every seat starts available
        if self.available_tickets.is_some_and(|a| a != total_tickets) {
            return Err(invalid("available_tickets must equal total_tickets for a new event"));
        }

        let details = DetailsInput {
            name: self.name,
            description: self.description,
            location: self.location,
            date: self.date,
            ticket_price: self.ticket_price,
            image_url: self.image_url,
        }
        .into_details()?;

        if details.date <= now {
            return Err(invalid("event date must be in the future"));
        }

        Ok(Event::new(details, total_tickets, total_tickets))
    }
}

/// Admin input for editing an event's metadata.
///
/// Inventory fields are deliberately absent: any `total_tickets` or
/// `available_tickets` keys in the request body are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetailsInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub date: String,
    pub ticket_price: Option<f64>,
    pub image_url: Option<String>,
}

impl DetailsInput {
    pub fn into_details(self) -> CoreResult<EventDetails> {
        let name = self.name.trim().to_string();
        let location = self.location.trim().to_string();
        if name.is_empty() || location.is_empty() || self.date.trim().is_empty() {
            return Err(invalid("name, location and date are required"));
        }

        let date = DateTime::parse_from_rfc3339(self.date.trim())
            .map_err(|_| invalid("date must be an RFC 3339 timestamp"))?
            .with_timezone(&Utc);

        let ticket_price = self.ticket_price
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| invalid("ticket_price must be a positive number"))?;

        Ok(EventDetails {
            name,
            description: self.description.trim().to_string(),
            location,
            date,
            ticket_price,
            image_url: self.image_url.filter(|u| !u.trim().is_empty()),
        })
    }
}

fn invalid(msg: &str) -> CoreError {
    CoreError::InvalidInput(msg.to_string())
}
