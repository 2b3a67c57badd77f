use thiserror::Error;

/// Centralized error type for kithara-icecast
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("invalid {name}: {reason}")]
    InvalidParam { name: &'static str, reason: String },
    #[error("missing required parameter: {0}")]
    MissingParam(&'static str),
    #[error("cannot change parameters while connected")]
    AlreadyConnected,
    #[error("not connected")]
    NotConnected,
    #[error("could not connect to {addr}: {reason}")]
    Connect { addr: String, reason: String },
    #[error("authentication rejected by server")]
    Unauthorized,
    #[error("mount point is in use")]
    MountInUse,
    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(u16),
    #[error("malformed server response: {0}")]
    Protocol(String),
    #[error("socket error: {0}")]
    Io(String),
}

impl TransportError {
    /// Creates a parameter validation error
    pub fn invalid<S: Into<String>>(name: &'static str, reason: S) -> Self {
        Self::InvalidParam {
            name,
            reason: reason.into(),
        }
    }

    /// Checks whether the server answered but refused the stream
    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized | Self::MountInUse | Self::UnexpectedStatus(_)
        )
    }
}

impl From<std::io::Error> for TransportError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

pub type TransportResult<T> = Result<T, TransportError>;
