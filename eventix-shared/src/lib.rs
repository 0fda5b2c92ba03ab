pub mod models;
pub mod pii;

pub use models::events::CatalogChange;
pub use pii::Masked;
