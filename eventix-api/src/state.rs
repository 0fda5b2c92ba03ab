use std::sync::Arc;

use eventix_catalog::{BroadcastPublisher, CatalogService};
use eventix_core::identity::IdentityService;
use eventix_order::{OrderHistory, ReservationEngine};
use eventix_store::RedisClient;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct RateLimitConfig {
    pub limiter: Arc<RedisClient>,
    pub requests: i64,
    pub window_seconds: i64,
}

#[derive(Clone, Default)]
pub struct HttpConfig {
    /// Empty means no cross-origin access.
    pub allowed_origins: Vec<String>,
    pub static_dir: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<IdentityService>,
    pub catalog: Arc<CatalogService>,
    pub reservations: Arc<ReservationEngine>,
    pub history: Arc<OrderHistory>,
    pub catalog_stream: BroadcastPublisher,
    pub auth: AuthConfig,
    pub rate_limit: Option<RateLimitConfig>,
    pub http: HttpConfig,
}
