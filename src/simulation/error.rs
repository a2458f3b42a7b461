//! Failure taxonomy reported to callers of the engine and the catalog.

use thiserror::Error;

use super::integrator::IntegrationError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("unknown scenario `{name}`")]
    InvalidScenario { name: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("singularity at t = {t}: bodies {i} and {j} are {distance:e} apart")]
    SingularityEncountered {
        t: f64,
        i: usize,
        j: usize,
        distance: f64,
    },

    #[error("integration failed at t = {t}: {source}")]
    IntegrationFailure {
        t: f64,
        #[source]
        source: IntegrationError,
    },
}

impl SimError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        SimError::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}
