use std::sync::Arc;

use chrono::Utc;
use eventix_core::repository::{CatalogPublisher, EventRepository, TicketRepository};
use eventix_core::{CoreError, CoreResult, Event};
use eventix_shared::CatalogChange;
use tracing::{info, warn};
use uuid::Uuid;

use crate::draft::{DetailsInput, EventDraft};

/// Event catalog management. Writes metadata only; availability belongs to the
/// reservation engine.
pub struct CatalogService {
    events: Arc<dyn EventRepository>,
    tickets: Arc<dyn TicketRepository>,
    publisher: Arc<dyn CatalogPublisher>,
}

impl CatalogService {
    pub fn new(
        events: Arc<dyn EventRepository>,
        tickets: Arc<dyn TicketRepository>,
        publisher: Arc<dyn CatalogPublisher>,
    ) -> Self {
        Self { events, tickets, publisher }
    }

    pub async fn list_events(&self, search: Option<&str>) -> CoreResult<Vec<Event>> {
        Ok(self.events.list_events(search).await?)
    }

    pub async fn get_event(&self, id: Uuid) -> CoreResult<Event> {
        self.events.find_event(id).await?
            .ok_or_else(|| CoreError::NotFound(format!("event {} not found", id)))
    }

    pub async fn create_event(&self, draft: EventDraft) -> CoreResult<Event> {
        let event = draft.into_event(Utc::now())?;
        self.events.insert_event(&event).await?;
        info!(event_id = %event.id, total_tickets = event.total_tickets, "Event created");

        let snapshot = serde_json::to_value(&event).unwrap_or(serde_json::Value::Null);
        self.announce(CatalogChange::created(event.id, snapshot)).await;
        Ok(event)
    }

    pub async fn update_event(&self, id: Uuid, input: DetailsInput) -> CoreResult<Event> {
        let details = input.into_details()?;
        if !self.events.update_event_details(id, &details).await? {
            return Err(CoreError::NotFound(format!("event {} not found", id)));
        }
        info!(event_id = %id, "Event updated");

        self.announce(CatalogChange::updated(id)).await;
        self.get_event(id).await
    }

    pub async fn delete_event(&self, id: Uuid) -> CoreResult<()> {
        // 1. Must exist
        self.get_event(id).await?;

        // 2. Referential guard
        let sold = self.tickets.count_tickets_for_event(id).await?;
        if sold > 0 {
            return Err(CoreError::Conflict(format!(
                "event {} cannot be deleted: {} ticket(s) reference it",
                id, sold
            )));
        }

        // 3. Conditional delete; refused while a reservation holds seats or has sold any
        if !self.events.delete_event(id).await? {
            return match self.events.find_event(id).await? {
                Some(_) => Err(CoreError::Conflict(format!(
                    "event {} cannot be deleted: a reservation is in progress or completed",
                    id
                ))),
                None => Err(CoreError::NotFound(format!("event {} not found", id))),
            };
        }
        info!(event_id = %id, "Event deleted");

        self.announce(CatalogChange::deleted(id)).await;
        Ok(())
    }

    async fn announce(&self, change: CatalogChange) {
        if let Err(e) = self.publisher.publish(&change).await {
            warn!(event_id = %change.event_id(), "Failed to publish {}: {}", change.name(), e);
        }
    }
}
