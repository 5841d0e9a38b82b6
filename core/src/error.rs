use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenError {
    /// Bad input parameter. Raised before any sampling starts.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Reference data error in '{source_name}': {reason}")]
    ReferenceData { source_name: String, reason: String },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error(
        "Generated {kind} identities are not unique (n={n}, byte_length={byte_length}); \
         increase byte_length"
    )]
    NonUniqueIdentity {
        kind: &'static str,
        n: usize,
        byte_length: usize,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GenError {
    pub fn reference(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ReferenceData {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

pub type GenResult<T> = Result<T, GenError>;
