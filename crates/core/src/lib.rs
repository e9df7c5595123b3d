pub mod config;
pub mod error;
pub mod event_bus;
pub mod types;

pub use config::AppConfig;
pub use error::{BrandError, BrandResult};
pub use event_bus::{Notification, NotificationKind, NotificationSink};
pub use types::{Asset, BrandIdentity, ValidationContext};
