use async_trait::async_trait;
use uuid::Uuid;
use eventix_shared::CatalogChange;
use crate::models::{Event, EventDetails, Order, Ticket, User};

pub type StoreError = Box<dyn std::error::Error + Send + Sync>;
pub type RepoResult<T> = Result<T, StoreError>;

/// Repository trait for event data access
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn find_event(&self, id: Uuid) -> RepoResult<Option<Event>>;

    /// Events whose name or description contains `search` (case-insensitive), or all of them.
    async fn list_events(&self, search: Option<&str>) -> RepoResult<Vec<Event>>;

    async fn insert_event(&self, event: &Event) -> RepoResult<Uuid>;

    /// Returns false when no event has this id.
    async fn update_event_details(&self, id: Uuid, details: &EventDetails) -> RepoResult<bool>;

    /// Deletes the event only while no ticket references it. Returns false when nothing was deleted.
    async fn delete_event(&self, id: Uuid) -> RepoResult<bool>;

    /// Atomically subtract `quantity` from `available_tickets` iff the current value is at
    /// least `quantity`. Returns false when the condition did not hold (or the event is gone).
    async fn decrement_available(&self, id: Uuid, quantity: i32) -> RepoResult<bool>;

    /// Compensating increment. Refuses (returns false) if it would push availability
    /// above `total_tickets`.
    async fn restore_available(&self, id: Uuid, quantity: i32) -> RepoResult<bool>;
}

/// Repository trait for ticket data access
#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn insert_ticket(&self, ticket: &Ticket) -> RepoResult<Uuid>;

    async fn find_ticket(&self, id: Uuid) -> RepoResult<Option<Ticket>>;

    /// Rollback only: tickets are otherwise never deleted.
    async fn delete_ticket(&self, id: Uuid) -> RepoResult<()>;

    async fn count_tickets_for_event(&self, event_id: Uuid) -> RepoResult<i64>;
}

/// Repository trait for order data access
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert_order(&self, order: &Order) -> RepoResult<Uuid>;

    /// Newest first.
    async fn list_orders_for_user(&self, user_id: Uuid) -> RepoResult<Vec<Order>>;
}

/// Repository trait for user accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;

    async fn insert_user(&self, user: &User) -> RepoResult<Uuid>;

    async fn delete_user(&self, id: Uuid) -> RepoResult<bool>;

    /// Flag the account verified and clear the code fields.
    async fn mark_verified(&self, id: Uuid) -> RepoResult<bool>;
}

/// Receives catalog notifications after a mutation has been committed.
#[async_trait]
pub trait CatalogPublisher: Send + Sync {
    async fn publish(&self, change: &CatalogChange) -> RepoResult<()>;
}
