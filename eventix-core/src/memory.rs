//! In-process implementations of the storage and collaborator traits.
//!
//! Compiled for tests and behind the `test-util` feature; never part of the
//! production binary.
//! Each collection sits behind its own mutex; operations that span collections
//! always lock `events` before `tickets`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use eventix_shared::CatalogChange;
use uuid::Uuid;

use crate::identity::{Mailer, VerificationCodeCache};
use crate::models::{Event, EventDetails, Order, Ticket, User};
use crate::repository::{
    CatalogPublisher, EventRepository, OrderRepository, RepoResult, TicketRepository, UserRepository,
};

fn lock<T>(mutex: &Mutex<T>) -> RepoResult<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| "in-memory store lock poisoned".into())
}

#[derive(Default)]
pub struct InMemoryStore {
    events: Mutex<HashMap<Uuid, Event>>,
    tickets: Mutex<HashMap<Uuid, Ticket>>,
    orders: Mutex<HashMap<Uuid, Order>>,
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticket_count(&self) -> usize {
        self.tickets.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn order_count(&self) -> usize {
        self.orders.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().map(|u| u.len()).unwrap_or(0)
    }

    pub fn orders(&self) -> Vec<Order> {
        self.orders
            .lock()
            .map(|o| o.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventRepository for InMemoryStore {
    async fn find_event(&self, id: Uuid) -> RepoResult<Option<Event>> {
        Ok(lock(&self.events)?.get(&id).cloned())
    }

    async fn list_events(&self, search: Option<&str>) -> RepoResult<Vec<Event>> {
        let needle = search.map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase);

        let mut events: Vec<Event> = lock(&self.events)?
            .values()
            .filter(|e| match &needle {
                Some(n) => e.name.to_lowercase().contains(n) || e.description.to_lowercase().contains(n),
                None => true,
            })
            .cloned()
            .collect();
        events.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(events)
    }

    async fn insert_event(&self, event: &Event) -> RepoResult<Uuid> {
        lock(&self.events)?.insert(event.id, event.clone());
        Ok(event.id)
    }

    async fn update_event_details(&self, id: Uuid, details: &EventDetails) -> RepoResult<bool> {
        match lock(&self.events)?.get_mut(&id) {
            Some(event) => {
                event.apply_details(details);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_event(&self, id: Uuid) -> RepoResult<bool> {
        let mut events = lock(&self.events)?;
        let tickets = lock(&self.tickets)?;
        let held = events.get(&id).is_some_and(|e| e.available_tickets != e.total_tickets);
        if held || tickets.values().any(|t| t.event_id == id) {
            return Ok(false);
        }
        Ok(events.remove(&id).is_some())
    }

    async fn decrement_available(&self, id: Uuid, quantity: i32) -> RepoResult<bool> {
        let mut events = lock(&self.events)?;
        match events.get_mut(&id) {
            Some(event) if quantity > 0 && event.available_tickets >= quantity => {
                event.available_tickets -= quantity;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn restore_available(&self, id: Uuid, quantity: i32) -> RepoResult<bool> {
        let mut events = lock(&self.events)?;
        match events.get_mut(&id) {
            Some(event) if quantity > 0 && event.available_tickets + quantity <= event.total_tickets => {
                event.available_tickets += quantity;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl TicketRepository for InMemoryStore {
    async fn insert_ticket(&self, ticket: &Ticket) -> RepoResult<Uuid> {
        // Same guarantee as the foreign key on tickets.event_id
        let events = lock(&self.events)?;
        if !events.contains_key(&ticket.event_id) {
            return Err(format!("event {} does not exist", ticket.event_id).into());
        }
        lock(&self.tickets)?.insert(ticket.id, ticket.clone());
        Ok(ticket.id)
    }

    async fn find_ticket(&self, id: Uuid) -> RepoResult<Option<Ticket>> {
        Ok(lock(&self.tickets)?.get(&id).cloned())
    }

    async fn delete_ticket(&self, id: Uuid) -> RepoResult<()> {
        lock(&self.tickets)?.remove(&id);
        Ok(())
    }

    async fn count_tickets_for_event(&self, event_id: Uuid) -> RepoResult<i64> {
        Ok(lock(&self.tickets)?.values().filter(|t| t.event_id == event_id).count() as i64)
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn insert_order(&self, order: &Order) -> RepoResult<Uuid> {
        let mut orders = lock(&self.orders)?;
        if orders.values().any(|o| o.ticket_id == order.ticket_id) {
            return Err(format!("ticket {} already has an order", order.ticket_id).into());
        }
        orders.insert(order.id, order.clone());
        Ok(order.id)
    }

    async fn list_orders_for_user(&self, user_id: Uuid) -> RepoResult<Vec<Order>> {
        let mut orders: Vec<Order> = lock(&self.orders)?
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(lock(&self.users)?.values().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: &User) -> RepoResult<Uuid> {
        let mut users = lock(&self.users)?;
        if users.values().any(|u| u.email == user.email) {
            return Err(format!("duplicate email {}", user.email).into());
        }
        users.insert(user.id, user.clone());
        Ok(user.id)
    }

    async fn delete_user(&self, id: Uuid) -> RepoResult<bool> {
        Ok(lock(&self.users)?.remove(&id).is_some())
    }

    async fn mark_verified(&self, id: Uuid) -> RepoResult<bool> {
        match lock(&self.users)?.get_mut(&id) {
            Some(user) => {
                user.is_verified = true;
                user.verify_code = None;
                user.verify_expires_at = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Verification codes with wall-clock expiry, mirroring Redis `SET EX`.
#[derive(Default)]
pub struct InMemoryCodeCache {
    codes: Mutex<HashMap<String, (String, Instant)>>,
}

impl InMemoryCodeCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VerificationCodeCache for InMemoryCodeCache {
    async fn store_code(&self, email: &str, code: &str, ttl_seconds: u64) -> RepoResult<()> {
        let expires_at = Instant::now() + Duration::from_secs(ttl_seconds);
        lock(&self.codes)?.insert(email.to_string(), (code.to_string(), expires_at));
        Ok(())
    }

    async fn fetch_code(&self, email: &str) -> RepoResult<Option<String>> {
        let mut codes = lock(&self.codes)?;
        match codes.get(email) {
            Some((code, expires_at)) if Instant::now() < *expires_at => Ok(Some(code.clone())),
            Some(_) => {
                codes.remove(email);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn remove_code(&self, email: &str) -> RepoResult<()> {
        lock(&self.codes)?.remove(email);
        Ok(())
    }
}

/// Keeps every message instead of delivering it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails.
    pub fn failing() -> Self {
        Self { sent: Mutex::new(Vec::new()), fail: true }
    }

    /// `(recipient, code)` pairs in send order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_verification_code(&self, to: &str, code: &str) -> RepoResult<()> {
        if self.fail {
            return Err("smtp relay unavailable".into());
        }
        lock(&self.sent)?.push((to.to_string(), code.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    changes: Mutex<Vec<CatalogChange>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changes(&self) -> Vec<CatalogChange> {
        self.changes.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CatalogPublisher for RecordingPublisher {
    async fn publish(&self, change: &CatalogChange) -> RepoResult<()> {
        lock(&self.changes)?.push(change.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(total: i32, available: i32) -> Event {
        Event::new(
            EventDetails {
                name: "Jazz Night".to_string(),
                description: "Quartet live".to_string(),
                location: "Basement".to_string(),
                date: Utc::now(),
                ticket_price: 20.0,
                image_url: None,
            },
            total,
            available,
        )
    }

    #[tokio::test]
    async fn test_conditional_decrement_and_restore_bounds() {
        let store = InMemoryStore::new();
        let e = event(5, 5);
        store.insert_event(&e).await.unwrap();

        assert!(store.decrement_available(e.id, 3).await.unwrap());
        assert!(!store.decrement_available(e.id, 3).await.unwrap());
        assert!(!store.decrement_available(e.id, 0).await.unwrap());
        assert!(store.decrement_available(e.id, 2).await.unwrap());
        assert_eq!(store.find_event(e.id).await.unwrap().unwrap().available_tickets, 0);

        assert!(store.restore_available(e.id, 5).await.unwrap());
        // Would exceed total_tickets
        assert!(!store.restore_available(e.id, 1).await.unwrap());
        assert!(!store.decrement_available(Uuid::new_v4(), 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_refused_while_tickets_exist() {
        let store = InMemoryStore::new();
        let e = event(5, 5);
        store.insert_event(&e).await.unwrap();
        let ticket = Ticket::new(Uuid::new_v4(), e.id, 1);
        store.insert_ticket(&ticket).await.unwrap();

        assert!(!store.delete_event(e.id).await.unwrap());

        store.delete_ticket(ticket.id).await.unwrap();
        assert!(store.delete_event(e.id).await.unwrap());
        assert!(store.insert_ticket(&Ticket::new(Uuid::new_v4(), e.id, 1)).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_refused_while_seats_are_held() {
        let store = InMemoryStore::new();
        let e = event(5, 5);
        store.insert_event(&e).await.unwrap();

        // Decremented but no ticket written yet
        assert!(store.decrement_available(e.id, 2).await.unwrap());
        assert!(!store.delete_event(e.id).await.unwrap());
        assert!(store.find_event(e.id).await.unwrap().is_some());

        assert!(store.restore_available(e.id, 2).await.unwrap());
        assert!(store.delete_event(e.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let store = InMemoryStore::new();
        store.insert_event(&event(1, 1)).await.unwrap();

        assert_eq!(store.list_events(Some("JAZZ")).await.unwrap().len(), 1);
        assert_eq!(store.list_events(Some("quartet")).await.unwrap().len(), 1);
        assert_eq!(store.list_events(Some("opera")).await.unwrap().len(), 0);
        assert_eq!(store.list_events(Some("  ")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_code_cache_expiry() {
        let cache = InMemoryCodeCache::new();
        cache.store_code("a@b.c", "123456", 0).await.unwrap();
        assert_eq!(cache.fetch_code("a@b.c").await.unwrap(), None);

        cache.store_code("a@b.c", "654321", 60).await.unwrap();
        assert_eq!(cache.fetch_code("a@b.c").await.unwrap().as_deref(), Some("654321"));
    }
}
