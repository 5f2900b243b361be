//! Error kinds shared by every stage of a tracking cycle.

use thiserror::Error;

/// Failures a cycle can run into. None of them abort the process: the
/// cycle logs the error and simply does less work.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PassError {
    /// No orbital elements could be obtained from any source
    #[error("orbital data unavailable: {0}")]
    DataUnavailable(String),

    /// Geometry computation failed on otherwise valid elements
    #[error("propagation failed: {0}")]
    Propagation(String),

    /// Notification gateway unreachable or rejected the call
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// Persisted state could not be parsed
    #[error("state corrupted: {0}")]
    StateCorruption(String),
}

pub type PassResult<T> = Result<T, PassError>;
