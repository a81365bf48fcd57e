pub mod config;
pub mod cookie_store;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use cookie_store::Session;
pub use error::GalleryError;
pub use types::*;
