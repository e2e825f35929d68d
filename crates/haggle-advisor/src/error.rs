use std::time::Duration;
use thiserror::Error;

/// Failures of the model path. Always absorbed into a fallback result.
#[derive(Error, Debug)]
pub(crate) enum AdvisorError {
    #[error("model request failed: {0}")]
    Network(String),

    #[error("model did not answer within {0:?}")]
    Timeout(Duration),

    #[error("unusable model response: {0}")]
    Parse(String),

    #[error("no model credential configured")]
    Disabled,
}
