use std::sync::Arc;

use eventix_core::repository::{EventRepository, OrderRepository, TicketRepository};
use eventix_core::{CoreResult, OrderStatus};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One row of a user's purchase history.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrderDetail {
    pub order_id: Uuid,
    pub event_name: String,
    pub quantity: i32,
    pub ticket_price: f64,
    pub total_price: f64,
    pub status: OrderStatus,
    pub event_date: String,
    pub purchase_time: String,
}

/// Read-only view joining orders to their ticket and event.
pub struct OrderHistory {
    orders: Arc<dyn OrderRepository>,
    tickets: Arc<dyn TicketRepository>,
    events: Arc<dyn EventRepository>,
}

impl OrderHistory {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        tickets: Arc<dyn TicketRepository>,
        events: Arc<dyn EventRepository>,
    ) -> Self {
        Self { orders, tickets, events }
    }

    /// Newest first. Orders whose ticket or event has gone away are skipped.
    pub async fn orders_for_user(&self, user_id: Uuid) -> CoreResult<Vec<OrderDetail>> {
        let orders = self.orders.list_orders_for_user(user_id).await?;
        let mut details = Vec::with_capacity(orders.len());

        for order in orders {
            let Some(ticket) = self.tickets.find_ticket(order.ticket_id).await? else {
                warn!(order_id = %order.id, "Order references a missing ticket");
                continue;
            };
            let Some(event) = self.events.find_event(ticket.event_id).await? else {
                warn!(order_id = %order.id, event_id = %ticket.event_id, "Order references a missing event");
                continue;
            };

            details.push(OrderDetail {
                order_id: order.id,
                event_name: event.name,
                quantity: ticket.quantity,
                ticket_price: event.ticket_price,
                total_price: order.total_price,
                status: order.status,
                event_date: event.date.format(DISPLAY_FORMAT).to_string(),
                purchase_time: ticket.purchase_time.format(DISPLAY_FORMAT).to_string(),
            });
        }

        Ok(details)
    }
}
