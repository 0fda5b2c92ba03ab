use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eventix_core::repository::{RepoResult, UserRepository};
use eventix_core::{Role, User};
use sqlx::PgPool;
use uuid::Uuid;

pub struct StoreUserRepository {
    pool: PgPool,
}

impl StoreUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    is_verified: bool,
    verify_code: Option<String>,
    verify_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = String;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse::<Role>()?,
            is_verified: row.is_verified,
            verify_code: row.verify_code,
            verify_expires_at: row.verify_expires_at,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl UserRepository for StoreUserRepository {
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, role, is_verified, verify_code, verify_expires_at, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(User::try_from(row)?)),
            None => Ok(None),
        }
    }

    async fn insert_user(&self, user: &User) -> RepoResult<Uuid> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, is_verified, verify_code, verify_expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_verified)
        .bind(&user.verify_code)
        .bind(user.verify_expires_at)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(user.id)
    }

    async fn delete_user(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_verified(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET is_verified = TRUE, verify_code = NULL, verify_expires_at = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
