//! Continuous brand monitoring: sessions, guardians, and scheduled checks.

pub mod guardian;
pub mod manager;
pub mod schedule;

pub use guardian::{
    AuthorityLevel, Guardian, GuardianConfig, GuardianStatus, GuardianTable, GuardianType,
};
pub use manager::{
    AssetSource, CheckOutcome, MonitoringConfig, MonitoringManager, MonitoringSession,
    StaticAssetSource,
};
pub use schedule::Frequency;
