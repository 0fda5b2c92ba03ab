use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eventix_core::repository::{EventRepository, RepoResult};
use eventix_core::{Event, EventDetails};
use sqlx::PgPool;
use uuid::Uuid;

const EVENT_COLUMNS: &str = "id, name, description, location, date, total_tickets, available_tickets, \
                             ticket_price, image_url, created_at";

pub struct StoreEventRepository {
    pool: PgPool,
}

impl StoreEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    name: String,
    description: String,
    location: String,
    date: DateTime<Utc>,
    total_tickets: i32,
    available_tickets: i32,
    ticket_price: f64,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            name: row.name,
            description: row.description,
            location: row.location,
            date: row.date,
            total_tickets: row.total_tickets,
            available_tickets: row.available_tickets,
            ticket_price: row.ticket_price,
            image_url: row.image_url,
            created_at: row.created_at,
        }
    }
}

/// `%term%` with LIKE metacharacters escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl EventRepository for StoreEventRepository {
    async fn find_event(&self, id: Uuid) -> RepoResult<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(&format!("SELECT {} FROM events WHERE id = $1", EVENT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Event::from))
    }

    async fn list_events(&self, search: Option<&str>) -> RepoResult<Vec<Event>> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let rows = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            SELECT {} FROM events
            WHERE $1::text IS NULL OR name ILIKE $1 OR description ILIKE $1
            ORDER BY date ASC
            "#,
            EVENT_COLUMNS
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn insert_event(&self, event: &Event) -> RepoResult<Uuid> {
        sqlx::query(
            r#"
            INSERT INTO events (id, name, description, location, date, total_tickets, available_tickets, ticket_price, image_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(event.id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.date)
        .bind(event.total_tickets)
        .bind(event.available_tickets)
        .bind(event.ticket_price)
        .bind(&event.image_url)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        Ok(event.id)
    }

    async fn update_event_details(&self, id: Uuid, details: &EventDetails) -> RepoResult<bool> {
        // Inventory columns are never part of this statement
        let result = sqlx::query(
            r#"
            UPDATE events
            SET name = $2, description = $3, location = $4, date = $5, ticket_price = $6,
                image_url = COALESCE($7, image_url)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&details.name)
        .bind(&details.description)
        .bind(&details.location)
        .bind(details.date)
        .bind(details.ticket_price)
        .bind(&details.image_url)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_event(&self, id: Uuid) -> RepoResult<bool> {
        // Seats held by an in-flight reservation keep the event alive
        let result = sqlx::query(
            r#"
            DELETE FROM events
            WHERE id = $1
              AND available_tickets = total_tickets
              AND NOT EXISTS (SELECT 1 FROM tickets WHERE event_id = $1)
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn decrement_available(&self, id: Uuid, quantity: i32) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET available_tickets = available_tickets - $2
            WHERE id = $1 AND $2 > 0 AND available_tickets >= $2
            "#,
        )
        .bind(id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn restore_available(&self, id: Uuid, quantity: i32) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET available_tickets = available_tickets + $2
            WHERE id = $1 AND $2 > 0 AND available_tickets + $2 <= total_tickets
            "#,
        )
        .bind(id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
