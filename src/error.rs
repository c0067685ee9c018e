use thiserror::Error;

/// Result type for filer operations
pub type FilerResult<T> = Result<T, FilerError>;

/// Errors that can occur while talking to the filer
#[derive(Error, Debug)]
pub enum FilerError {
    #[error("Blob not found: {name}")]
    NotFound { name: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Transport failure: {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
    },

    #[error("Server rejected request ({status}): {message}")]
    ServerRejected { status: u16, message: String },

    #[error("Write aborted: {reason}")]
    WriteAborted { reason: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl FilerError {
    /// Create a not found error
    pub fn not_found<S: Into<String>>(name: S) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create an invalid argument error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a transport failure from the underlying client error
    pub fn transport(source: reqwest::Error) -> Self {
        Self::Transport { source }
    }

    /// Create a server rejection for a non-success status
    pub fn server_rejected<S: Into<String>>(status: u16, message: S) -> Self {
        Self::ServerRejected {
            status,
            message: message.into(),
        }
    }

    /// Create a write aborted error for a failed upload stream
    pub fn write_aborted<S: Into<String>>(reason: S) -> Self {
        Self::WriteAborted {
            reason: reason.into(),
        }
    }

    /// Whether a caller-level retry policy may reasonably retry this error
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<reqwest::Error> for FilerError {
    fn from(source: reqwest::Error) -> Self {
        Self::Transport { source }
    }
}
