use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eventix_core::repository::{RepoResult, TicketRepository};
use eventix_core::Ticket;
use sqlx::PgPool;
use uuid::Uuid;

pub struct StoreTicketRepository {
    pool: PgPool,
}

impl StoreTicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    user_id: Uuid,
    event_id: Uuid,
    quantity: i32,
    purchase_time: DateTime<Utc>,
}

#[async_trait]
impl TicketRepository for StoreTicketRepository {
    async fn insert_ticket(&self, ticket: &Ticket) -> RepoResult<Uuid> {
        sqlx::query(
            "INSERT INTO tickets (id, user_id, event_id, quantity, purchase_time) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(ticket.id)
        .bind(ticket.user_id)
        .bind(ticket.event_id)
        .bind(ticket.quantity)
        .bind(ticket.purchase_time)
        .execute(&self.pool)
        .await?;

        Ok(ticket.id)
    }

    async fn find_ticket(&self, id: Uuid) -> RepoResult<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>(
            "SELECT id, user_id, event_id, quantity, purchase_time FROM tickets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Ticket {
            id: r.id,
            user_id: r.user_id,
            event_id: r.event_id,
            quantity: r.quantity,
            purchase_time: r.purchase_time,
        }))
    }

    async fn delete_ticket(&self, id: Uuid) -> RepoResult<()> {
        sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_tickets_for_event(&self, event_id: Uuid) -> RepoResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tickets WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
