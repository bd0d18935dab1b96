// Error types shared by the runtime seam, the stream sources and the wire protocol

use std::io;

use thiserror::Error;

/// Failures of the container runtime collaborator.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error("Container {0} not found")]
    NotFound(String),

    #[error("container runtime unavailable: {0}")]
    Unavailable(String),

    #[error("runtime stream failed: {0}")]
    Stream(String),
}

/// Data failures that end the current session. Never retried.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("malformed stats frame: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("stats frame is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("log output is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// A request the connection server refuses to serve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("malformed request line")]
    Malformed,

    #[error("{0} method is not supported")]
    MethodNotAllowed(String),

    #[error("unknown route {0}")]
    UnknownRoute(String),

    #[error("container name is required")]
    MissingContainer,
}

impl ProtocolError {
    /// Status code and reason phrase of the response sent for this error.
    pub fn status(&self) -> (u16, &'static str) {
        match self {
            ProtocolError::Malformed | ProtocolError::MissingContainer => (400, "Bad Request"),
            ProtocolError::MethodNotAllowed(_) => (405, "Method Not Allowed"),
            ProtocolError::UnknownRoute(_) => (404, "Not Found"),
        }
    }

    /// Short plaintext body naming the cause.
    pub fn body(&self) -> String {
        match self {
            ProtocolError::UnknownRoute(_) => {
                "Only /stream with container as param is allowed".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// True for errors that mean the peer went away (reset, broken pipe, abort).
/// These end a session cleanly rather than as a failure.
pub fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof
    )
}
