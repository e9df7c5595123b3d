use thiserror::Error;

pub type BrandResult<T> = Result<T, BrandError>;

#[derive(Error, Debug)]
pub enum BrandError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid rule '{rule_id}': {reason}")]
    InvalidRule { rule_id: String, reason: String },

    #[error("Rule '{0}' already exists")]
    DuplicateRule(String),

    #[error("Rule '{0}' not found")]
    RuleNotFound(String),

    #[error("{kind} validator '{name}' not found")]
    ValidatorNotFound { kind: &'static str, name: String },

    #[error("Unsupported criteria type: {0}")]
    UnsupportedCriteria(String),

    #[error("AI validation error: {0}")]
    AiValidation(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Timed out after {0} ms")]
    Timeout(u64),

    #[error("Guardian {0} not found")]
    GuardianNotFound(String),

    #[error("Monitoring session {0} not found")]
    SessionNotFound(String),

    #[error("Correction error: {0}")]
    Correction(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl BrandError {
    /// Shorthand for a setup-time rule definition failure.
    pub fn invalid_rule(rule_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            rule_id: rule_id.into(),
            reason: reason.into(),
        }
    }
}
