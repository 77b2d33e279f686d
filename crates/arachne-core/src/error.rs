use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Duplicate limb name: {0}")]
    DuplicateLimb(String),

    #[error("Limb {limb} names unknown grounding partner {partner}")]
    UnknownPartner { limb: String, partner: String },

    #[error("Limb {0} lists itself as a grounding partner")]
    SelfPartner(String),

    #[error("Grounding partner index {index} out of range for {count} limbs")]
    PartnerOutOfRange { index: usize, count: usize },

    #[error("Limb count mismatch: expected {expected}, got {got}")]
    LimbCountMismatch { expected: usize, got: usize },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidValue`].
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}
