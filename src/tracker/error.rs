use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("elements error: {0}")]
    Elements(#[from] sgp4::ElementsError),
    #[error("propagation error: {0}")]
    Propagation(String),
    #[error("invalid instant: {0}")]
    InvalidInstant(String),
    #[error("sample at {attempted} is not after newest sample at {previous}")]
    NonMonotonicSample {
        previous: DateTime<Utc>,
        attempted: DateTime<Utc>,
    },
    #[error("body not found in catalog: {0}")]
    BodyNotFound(String),
}

impl From<sgp4::Error> for TrackerError {
    fn from(err: sgp4::Error) -> Self {
        TrackerError::Propagation(err.to_string())
    }
}
