use thiserror::Error;

use arachne_core::ConfigError;
use arachne_ik::IkError;

/// Errors raised while building or editing a [`LocomotionRig`](crate::LocomotionRig).
#[derive(Debug, Error)]
pub enum RigError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Limb {limb}: {source}")]
    Ik {
        limb: String,
        #[source]
        source: IkError,
    },

    #[error("Unknown limb: {0}")]
    UnknownLimb(String),
}

impl RigError {
    pub(crate) fn ik(limb: impl Into<String>, source: IkError) -> Self {
        Self::Ik {
            limb: limb.into(),
            source,
        }
    }
}
