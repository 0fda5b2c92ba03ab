use std::sync::Arc;

use eventix_core::repository::{EventRepository, OrderRepository, TicketRepository};
use eventix_core::{CoreError, CoreResult, Order, Ticket};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Outcome of a successful reservation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Reservation {
    pub ticket_id: Uuid,
    pub order_id: Uuid,
    pub event_id: Uuid,
    pub event_name: String,
    pub quantity: i32,
    /// Unit price as read when the reservation started
    pub ticket_price: f64,
    pub total_price: f64,
}

/// Converts available inventory into a Ticket + Order pair.
///
/// This is the only writer of `Event::available_tickets`. Concurrency safety comes
/// entirely from the storage layer's conditional decrement: there are no
/// application-level locks and no automatic retries. A caller that loses the race
/// gets `InsufficientInventory` and may resubmit.
pub struct ReservationEngine {
    events: Arc<dyn EventRepository>,
    tickets: Arc<dyn TicketRepository>,
    orders: Arc<dyn OrderRepository>,
}

impl ReservationEngine {
    pub fn new(
        events: Arc<dyn EventRepository>,
        tickets: Arc<dyn TicketRepository>,
        orders: Arc<dyn OrderRepository>,
    ) -> Self {
        Self { events, tickets, orders }
    }

    pub async fn reserve(&self, event_id: Uuid, user_id: Uuid, quantity: i32) -> CoreResult<Reservation> {
        if quantity <= 0 {
            return Err(CoreError::InvalidInput("quantity must be a positive integer".to_string()));
        }

        // 1. Snapshot the event
        let event = self.events.find_event(event_id).await
            .map_err(|e| storage_failure("event lookup", e))?
            .ok_or_else(|| CoreError::NotFound(format!("event {} not found", event_id)))?;

        // 2. Cheap early rejection against the snapshot
        if quantity > event.available_tickets {
            return Err(CoreError::InsufficientInventory { event_id, requested: quantity });
        }

        // 3. Authoritative check-and-decrement at the storage layer
        let decremented = self.events.decrement_available(event_id, quantity).await
            .map_err(|e| storage_failure("inventory decrement", e))?;
        if !decremented {
            debug!(event_id = %event_id, quantity, "Lost inventory race");
            return Err(CoreError::InsufficientInventory { event_id, requested: quantity });
        }

        // Price comes from the step 1 snapshot, not re-read after the decrement
        let total_price = f64::from(quantity) * event.ticket_price;

        // 4. Ticket
        let ticket = Ticket::new(user_id, event_id, quantity);
        if let Err(e) = self.tickets.insert_ticket(&ticket).await {
            let cause = format!("ticket insert failed: {}", e);
            error!(event_id = %event_id, quantity, "{}", cause);
            self.restore_inventory(event_id, quantity, &cause).await?;
            return Err(CoreError::StorageFailure(cause));
        }

        // 5. Order
        let order = Order::pending(user_id, ticket.id, total_price);
        if let Err(e) = self.orders.insert_order(&order).await {
            let cause = format!("order insert failed: {}", e);
            error!(event_id = %event_id, ticket_id = %ticket.id, "{}", cause);

            // A ticket without an order is an orphan; drop it before returning the seats
            if let Err(rollback) = self.tickets.delete_ticket(ticket.id).await {
                let reason = format!("{}; ticket {} rollback failed: {}", cause, ticket.id, rollback);
                error!(alarm = "inventory_compensation", event_id = %event_id, quantity, "{}", reason);
                return Err(CoreError::CompensationFailure { event_id, quantity, reason });
            }
            self.restore_inventory(event_id, quantity, &cause).await?;
            return Err(CoreError::StorageFailure(cause));
        }

        info!(
            event_id = %event_id,
            user_id = %user_id,
            order_id = %order.id,
            quantity,
            total_price,
            "Reservation committed"
        );

        Ok(Reservation {
            ticket_id: ticket.id,
            order_id: order.id,
            event_id,
            event_name: event.name,
            quantity,
            ticket_price: event.ticket_price,
            total_price,
        })
    }

    /// Give back seats taken by a reservation that could not be completed.
    /// Failure here is not retried; it is escalated for manual reconciliation.
    async fn restore_inventory(&self, event_id: Uuid, quantity: i32, cause: &str) -> CoreResult<()> {
        let reason = match self.events.restore_available(event_id, quantity).await {
            Ok(true) => {
                warn!(event_id = %event_id, quantity, "Inventory restored after failed reservation");
                return Ok(());
            }
            Ok(false) => format!("{}; restore of {} seat(s) refused by storage", cause, quantity),
            Err(e) => format!("{}; restore of {} seat(s) failed: {}", cause, quantity, e),
        };

        error!(alarm = "inventory_compensation", event_id = %event_id, quantity, "{}", reason);
        Err(CoreError::CompensationFailure { event_id, quantity, reason })
    }
}

fn storage_failure(step: &str, err: eventix_core::repository::StoreError) -> CoreError {
    error!("Reservation {} failed: {}", step, err);
    CoreError::StorageFailure(format!("{} failed: {}", step, err))
}
