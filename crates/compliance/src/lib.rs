//! Brand-compliance validation: rule registry, criteria evaluation, scoring,
//! report aggregation, real-time checks, and auto-fix.

pub mod autofix;
pub mod criteria;
pub mod defaults;
pub mod dispatcher;
pub mod engine;
pub mod extract;
pub mod history;
pub mod recommendations;
pub mod registry;
pub mod report;
pub mod scoring;
pub mod types;
pub mod validators;

pub use autofix::{AssetCorrector, AutoFixSummary, Correction, ExpectedValueCorrector};
pub use dispatcher::Dispatcher;
pub use engine::ComplianceEngine;
pub use history::{HistoryAnalytics, HistoryRecord, Trend, ValidationHistory};
pub use registry::RuleRegistry;
pub use types::*;
pub use validators::{
    AiRequest, AiValidator, AiVerdict, CustomRequest, CustomValidator, CustomVerdict,
    ValidatorRegistry,
};
