//! Error types for the remote photo show

use std::path::PathBuf;

/// Result type alias using the show's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for show and broker operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rescanning the photo directory failed
    #[error("cannot read photo directory {}: {source}", path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A set request beyond the known photo count
    #[error("invalid ID {id}: {}", describe_bound(*last))]
    OutOfRange { id: u64, last: Option<u64> },

    /// Unknown or missing command field
    #[error("Invalid CMD: {0}")]
    MalformedCommand(String),

    /// Command id is not an unsigned decimal integer
    #[error("invalid ID: {0}")]
    InvalidId(String),

    /// The connection cannot flush events incrementally
    #[error("Streaming unsupported: {0}")]
    StreamingUnsupported(String),

    /// A client queue is full under the bounded queue policy
    #[error("client queue overflowed ({capacity} events)")]
    QueueOverflow { capacity: usize },

    /// A streaming client went away
    #[error("transport closed")]
    TransportClosed,

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn describe_bound(last: Option<u64>) -> String {
    match last {
        Some(last) => format!("last photo is {last}"),
        None => "no photos loaded".to_string(),
    }
}

impl Error {
    /// Create a new malformed command error
    pub fn malformed_command(msg: impl Into<String>) -> Self {
        Self::MalformedCommand(msg.into())
    }

    /// Create a new invalid id error
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Create a new streaming capability error
    pub fn streaming_unsupported(msg: impl Into<String>) -> Self {
        Self::StreamingUnsupported(msg.into())
    }

    /// Rebuild an equivalent error so a stored failure can be reported
    /// more than once. I/O and serde sources keep kind and message.
    pub(crate) fn duplicate(&self) -> Self {
        match self {
            Self::DirectoryUnreadable { path, source } => Self::DirectoryUnreadable {
                path: path.clone(),
                source: std::io::Error::new(source.kind(), source.to_string()),
            },
            Self::OutOfRange { id, last } => Self::OutOfRange {
                id: *id,
                last: *last,
            },
            Self::MalformedCommand(msg) => Self::MalformedCommand(msg.clone()),
            Self::InvalidId(msg) => Self::InvalidId(msg.clone()),
            Self::StreamingUnsupported(msg) => Self::StreamingUnsupported(msg.clone()),
            Self::QueueOverflow { capacity } => Self::QueueOverflow {
                capacity: *capacity,
            },
            Self::TransportClosed => Self::TransportClosed,
            Self::Serialization(e) => {
                Self::Serialization(<serde_json::Error as serde::de::Error>::custom(e))
            }
        }
    }

    /// Whether the error is the caller's fault (maps to a 4xx response)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::OutOfRange { .. } | Self::InvalidId(_))
    }
}
