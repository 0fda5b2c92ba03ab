use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use eventix_api::{
    app,
    state::{AppState, AuthConfig, HttpConfig, RateLimitConfig},
};
use eventix_catalog::{BroadcastPublisher, CatalogService, FanOutPublisher};
use eventix_core::identity::{IdentityService, IdentitySettings, Mailer, VerificationCodeCache};
use eventix_order::{OrderHistory, ReservationEngine};
use eventix_store::{
    Config, DbClient, LogMailer, RedisClient, SmtpMailer, StoreEventRepository, StoreOrderRepository,
    StoreTicketRepository, StoreUserRepository,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eventix_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Eventix API on port {}", config.server.port);

    // Postgres
    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let events = Arc::new(StoreEventRepository::new(db.pool.clone()));
    let tickets = Arc::new(StoreTicketRepository::new(db.pool.clone()));
    let orders = Arc::new(StoreOrderRepository::new(db.pool.clone()));
    let users = Arc::new(StoreUserRepository::new(db.pool.clone()));

    // Redis: verification codes and rate limiting
    let redis = match &config.redis {
        Some(redis) => Some(Arc::new(
            RedisClient::new(&redis.url).await.context("Failed to create Redis client")?,
        )),
        None => {
            tracing::warn!("Redis not configured: codes checked against the user record, no rate limiting");
            None
        }
    };

    // Mail
    let mailer: Arc<dyn Mailer> = match &config.mail {
        Some(mail) => Arc::new(SmtpMailer::new(mail).context("Failed to build SMTP transport")?),
        None => {
            tracing::warn!("Mail not configured: verification codes will only be logged");
            Arc::new(LogMailer)
        }
    };

    // Catalog notifications
    let catalog_stream = BroadcastPublisher::new(100);
    let publisher = FanOutPublisher::new().with(Arc::new(catalog_stream.clone()));
    #[cfg(feature = "kafka")]
    let publisher = match &config.kafka {
        Some(kafka) => publisher.with(Arc::new(
            eventix_store::EventProducer::new(&kafka.brokers, &kafka.topic)
                .context("Failed to create Kafka producer")?,
        )),
        None => publisher,
    };

    let codes = redis.clone().map(|r| r as Arc<dyn VerificationCodeCache>);
    let identity = IdentityService::new(
        users,
        codes,
        mailer,
        IdentitySettings {
            code_ttl_seconds: config.verification.code_ttl_seconds,
            admin_emails: config.auth.admin_emails.clone(),
        },
    );

    let app_state = AppState {
        identity: Arc::new(identity),
        catalog: Arc::new(CatalogService::new(events.clone(), tickets.clone(), Arc::new(publisher))),
        reservations: Arc::new(ReservationEngine::new(events.clone(), tickets.clone(), orders.clone())),
        history: Arc::new(OrderHistory::new(orders, tickets, events)),
        catalog_stream,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        rate_limit: redis.map(|limiter| RateLimitConfig {
            limiter,
            requests: config.rate_limit.requests,
            window_seconds: config.rate_limit.window_seconds,
        }),
        http: HttpConfig {
            allowed_origins: config.cors.allowed_origins.clone(),
            static_dir: Some(config.server.static_dir.clone()),
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    db.pool.close().await;
    tracing::info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
