use thiserror::Error;

/// Errors raised while accepting or tracking a user operation.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A submission was missing one or more required fields.
    #[error("Missing required parameters: {}", .missing.join(", "))]
    InvalidInput { missing: Vec<&'static str> },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("remote responded with HTTP {status}")]
    Http { status: u16 },
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("invalid endpoint url: {0}")]
    Url(String),
    /// The poll worker is gone and nothing drains the queue anymore.
    #[error("work queue is closed")]
    QueueClosed,
}

impl TrackerError {
    /// Whether the failure is worth retrying on a later poll.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            TrackerError::InvalidInput { .. } | TrackerError::Url(_) | TrackerError::QueueClosed
        )
    }
}
