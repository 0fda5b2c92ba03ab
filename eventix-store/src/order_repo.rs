use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eventix_core::repository::{OrderRepository, RepoResult};
use eventix_core::{Order, OrderStatus};
use sqlx::PgPool;
use uuid::Uuid;

pub struct StoreOrderRepository {
    pool: PgPool,
}

impl StoreOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    ticket_id: Uuid,
    status: String,
    total_price: f64,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = String;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            ticket_id: row.ticket_id,
            status: row.status.parse::<OrderStatus>()?,
            total_price: row.total_price,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl OrderRepository for StoreOrderRepository {
    async fn insert_order(&self, order: &Order) -> RepoResult<Uuid> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, ticket_id, status, total_price, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.ticket_id)
        .bind(order.status.as_str())
        .bind(order.total_price)
        .bind(order.created_at)
        .execute(&self.pool)
        .await?;

        Ok(order.id)
    }

    async fn list_orders_for_user(&self, user_id: Uuid) -> RepoResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, ticket_id, status, total_price, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(Order::try_from(row)?);
        }
        Ok(orders)
    }
}
