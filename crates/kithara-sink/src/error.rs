use thiserror::Error;

/// Errors returned by [`Sink`](crate::Sink) operations.
///
/// Transport failures during a run are not returned here; the worker reports
/// them as [`SinkEvent`](crate::SinkEvent) notifications.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SinkError {
    /// Setup failed. The reason names the failing step (`set_port`,
    /// `capacity`, `thread_create`, ...).
    #[error("internal error: {0}")]
    Internal(String),
    #[error("sink is already started")]
    AlreadyStarted,
    #[error("sink is not started")]
    NotStarted,
    #[error("buffer is full")]
    Overrun,
}

impl SinkError {
    pub(crate) fn internal<S: Into<String>>(reason: S) -> Self {
        Self::Internal(reason.into())
    }
}

pub type SinkResult<T> = Result<T, SinkError>;
