pub mod app_config;
pub mod database;
pub mod event_repo;
pub mod ticket_repo;
pub mod order_repo;
pub mod user_repo;
pub mod redis_repo;
pub mod mailer;
#[cfg(feature = "kafka")]
pub mod events;

pub use app_config::Config;
pub use database::DbClient;
pub use event_repo::StoreEventRepository;
pub use ticket_repo::StoreTicketRepository;
pub use order_repo::StoreOrderRepository;
pub use user_repo::StoreUserRepository;
pub use redis_repo::RedisClient;
pub use mailer::{LogMailer, SmtpMailer};
#[cfg(feature = "kafka")]
pub use events::EventProducer;
