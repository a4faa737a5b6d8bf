/// Error types for the GraphLink client
use crate::concept::ConceptKind;
use thiserror::Error;
use tonic::Status;

#[derive(Error, Debug, Clone)]
pub enum ClientError {
    /// The transaction channel closed or failed before the call completed
    #[error("Transport error: {0}")]
    Transport(String),

    /// The call did not complete within the configured deadline
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// The server answered the request with an explicit failure
    #[error("Remote error [{code}]: {message}")]
    Remote { code: String, message: String },

    /// The server's concept kind disagrees with the requested narrowing
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: ConceptKind,
    },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The server sent something this client cannot interpret
    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ClientError>,
    },
}

impl ClientError {
    /// Returns a stable error code for this error variant.
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Transport(_) => "TRANSPORT",
            ClientError::Timeout(_) => "TIMEOUT",
            ClientError::Remote { .. } => "REMOTE",
            ClientError::TypeMismatch { .. } => "TYPE_MISMATCH",
            ClientError::UnsupportedOperation(_) => "UNSUPPORTED_OPERATION",
            ClientError::Protocol(_) => "PROTOCOL",
            ClientError::Connection(_) => "CONNECTION",
            ClientError::InvalidConfig(_) => "INVALID_CONFIG",
            ClientError::Context { source, .. } => source.code(),
        }
    }

    /// Returns true if the channel itself failed, as opposed to the server
    /// or the client rejecting this particular call.
    ///
    /// Transport failures are fatal to the in-flight call; this layer never
    /// retries them.
    pub fn is_transport(&self) -> bool {
        match self {
            ClientError::Transport(_) | ClientError::Timeout(_) | ClientError::Connection(_) => {
                true
            }
            ClientError::Context { source, .. } => source.is_transport(),
            _ => false,
        }
    }

    /// The innermost error, with any context layers stripped
    pub fn root(&self) -> &ClientError {
        match self {
            ClientError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Adds context to an error while keeping the original as its source.
    ///
    /// # Examples
    ///
    /// ```
    /// use glink_client::ClientError;
    ///
    /// let err = ClientError::Transport("stream reset".to_string())
    ///     .with_context("while resolving root type");
    /// assert_eq!(err.code(), "TRANSPORT");
    /// assert_eq!(err.to_string(), "while resolving root type: Transport error: stream reset");
    /// ```
    pub fn with_context(self, context: impl Into<String>) -> ClientError {
        ClientError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Convert a gRPC Status from the transaction stream to ClientError
///
/// A status on the stream ends the whole transaction, so every code is a
/// channel-level failure.
impl From<Status> for ClientError {
    fn from(status: Status) -> Self {
        let msg = status.message().to_string();

        match status.code() {
            tonic::Code::DeadlineExceeded => ClientError::Timeout(msg),
            tonic::Code::Unavailable => ClientError::Transport(format!("unavailable: {}", msg)),
            tonic::Code::Cancelled => ClientError::Transport(format!("cancelled: {}", msg)),
            code => ClientError::Transport(format!("{:?}: {}", code, msg)),
        }
    }
}
