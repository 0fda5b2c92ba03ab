pub mod draft;
pub mod service;
pub mod notify;

pub use draft::{DetailsInput, EventDraft};
pub use service::CatalogService;
pub use notify::{BroadcastPublisher, FanOutPublisher};
