use async_trait::async_trait;
use eventix_core::identity::VerificationCodeCache;
use eventix_core::repository::RepoResult;
use redis::{AsyncCommands, RedisResult};
use tracing::debug;

fn verify_key(email: &str) -> String {
    format!("verify:{}", email)
}

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Fixed-window counter. True while the caller is within `limit` for the current window.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let (count,): (i64,) = rate_limit_pipeline(key, window_seconds).query_async(&mut conn).await?;
        Ok(count <= limit)
    }
}

/// Opens the window with its TTL only when the key is absent, then counts the hit.
/// `INCR` keeps the existing TTL, so steady traffic cannot extend a window.
fn rate_limit_pipeline(key: &str, window_seconds: i64) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .cmd("SET").arg(key).arg(0).arg("EX").arg(window_seconds).arg("NX").ignore()
        .incr(key, 1);
    pipe
}

#[async_trait]
impl VerificationCodeCache for RedisClient {
    async fn store_code(&self, email: &str, code: &str, ttl_seconds: u64) -> RepoResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(verify_key(email), code, ttl_seconds).await?;
        debug!("Verification code cached for {} seconds", ttl_seconds);
        Ok(())
    }

    async fn fetch_code(&self, email: &str) -> RepoResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let code: Option<String> = conn.get(verify_key(email)).await?;
        Ok(code)
    }

    async fn remove_code(&self, email: &str) -> RepoResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(verify_key(email)).await?;
        Ok(())
    }
}
