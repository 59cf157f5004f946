//! Error types
//!
//! The pipeline distinguishes three failure classes:
//! - transport failures (fatal, the process exits non-zero)
//! - per-item classification failures (logged and swallowed by the pool)
//! - validation failures on received categories (policy decided by the aggregator)

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// I/O error outside the transport (e.g. listing the frame folder)
    Io(io::Error),
    /// Broadcast channel or join barrier failure
    Transport(TransportError),
    /// A single work item could not be classified
    Classification(ClassificationError),
    /// A received category was malformed or outside the known class range
    Validation(ValidationError),
    /// The external frame extraction tool failed
    Producer(String),
    /// Invalid configuration
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Transport(e) => write!(f, "Transport error: {}", e),
            Error::Classification(e) => write!(f, "Classification error: {}", e),
            Error::Validation(e) => write!(f, "Validation error: {}", e),
            Error::Producer(msg) => write!(f, "Frame extraction failed: {}", msg),
            Error::Config(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Transport(e) => Some(e),
            Error::Classification(e) => Some(e),
            Error::Validation(e) => Some(e),
            Error::Producer(_) | Error::Config(_) => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Error::Transport(e)
    }
}

impl From<ClassificationError> for Error {
    fn from(e: ClassificationError) -> Self {
        Error::Classification(e)
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Validation(e)
    }
}

/// Broadcast channel and join barrier errors
#[derive(Debug)]
pub enum TransportError {
    /// Binding a listening socket failed
    Bind { addr: String, source: io::Error },
    /// Connecting to a publisher or barrier failed
    Connect { addr: String, source: io::Error },
    /// Socket read/write failure
    Io(io::Error),
    /// Peer closed the connection
    ConnectionClosed,
    /// Frame length prefix exceeded the allowed maximum
    FrameTooLarge(usize),
    /// Handshake peer sent something other than the expected token
    UnexpectedBarrierPayload(String),
    /// Barrier handshake did not complete in time
    BarrierTimeout { joined: usize, expected: usize },
    /// Broadcast payload could not be decoded
    MalformedMessage(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Bind { addr, source } => {
                write!(f, "failed to bind {}: {}", addr, source)
            }
            TransportError::Connect { addr, source } => {
                write!(f, "failed to connect to {}: {}", addr, source)
            }
            TransportError::Io(e) => write!(f, "socket error: {}", e),
            TransportError::ConnectionClosed => write!(f, "connection closed by peer"),
            TransportError::FrameTooLarge(len) => write!(f, "frame too large: {} bytes", len),
            TransportError::UnexpectedBarrierPayload(payload) => {
                write!(f, "unexpected barrier payload: {:?}", payload)
            }
            TransportError::BarrierTimeout { joined, expected } => write!(
                f,
                "join barrier timed out with {}/{} subscribers",
                joined, expected
            ),
            TransportError::MalformedMessage(msg) => write!(f, "malformed message: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Bind { source, .. } | TransportError::Connect { source, .. } => {
                Some(source)
            }
            TransportError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            TransportError::ConnectionClosed
        } else {
            TransportError::Io(e)
        }
    }
}

/// Failure to classify a single work item
#[derive(Debug, Clone)]
pub struct ClassificationError {
    /// The offending work item
    pub item: PathBuf,
    /// Human readable reason
    pub reason: String,
}

impl ClassificationError {
    pub fn new(item: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ClassificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.item.display(), self.reason)
    }
}

impl std::error::Error for ClassificationError {}

/// A received category the aggregator cannot count
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Integer category outside `[0, num_classes)`
    OutOfRange { category: i64, num_classes: usize },
    /// Category that is not an integer at all (raw JSON text)
    NotAnInteger { raw: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::OutOfRange {
                category,
                num_classes,
            } => write!(
                f,
                "category {} outside valid range [0, {})",
                category, num_classes
            ),
            ValidationError::NotAnInteger { raw } => {
                write!(f, "category {} is not an integer", raw)
            }
        }
    }
}

impl std::error::Error for ValidationError {}
