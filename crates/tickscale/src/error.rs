//! Error types for tickscale

use thiserror::Error;

/// Errors raised while building a clock registry or naming a clock.
///
/// Selection and calibration never fail; only registry construction and
/// name parsing can.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClockError {
    #[error("Clock name must not be empty")]
    EmptyName,

    #[error("Clock registered twice: {0}")]
    DuplicateName(String),

    #[error("Clock name is reserved for the fallback clock: {0}")]
    ReservedName(String),

    #[error("Unknown clock: {0}")]
    UnknownClock(String),
}

/// Result type for tickscale operations
pub type ClockResult<T> = Result<T, ClockError>;
