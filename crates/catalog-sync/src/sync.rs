use crate::destination::DestinationError;
use crate::source::SourceError;

/// Faults that abort a migration phase.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("destination error: {0}")]
    Destination(#[from] DestinationError),

    #[error("source returned no {0}")]
    Missing(&'static str),
}

/// A single item that was skipped after a recoverable failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// SKU or category id the failure belongs to.
    pub key: String,
    pub reason: String,
}

impl ItemFailure {
    pub fn new(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.key, self.reason)
    }
}
