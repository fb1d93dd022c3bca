use thiserror::Error;

/// Failure reported by a processor for a single item.
///
/// One item's failure never propagates to the dispatcher loop; it is
/// recorded on the item and fed into the retry policy.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ProcessError {
    message: String,
}

impl ProcessError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for ProcessError {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ProcessError {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
