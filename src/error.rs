//! Error types for the engine.

use std::collections::HashMap;
use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = core::result::Result<T, Error>;

/// PostgreSQL error/notice field type codes.
pub mod field_type {
    pub const SEVERITY: u8 = b'S';
    pub const SEVERITY_V: u8 = b'V';
    pub const CODE: u8 = b'C';
    pub const MESSAGE: u8 = b'M';
    pub const DETAIL: u8 = b'D';
    pub const HINT: u8 = b'H';
    pub const POSITION: u8 = b'P';
    pub const INTERNAL_POSITION: u8 = b'p';
    pub const INTERNAL_QUERY: u8 = b'q';
    pub const WHERE: u8 = b'W';
    pub const SCHEMA: u8 = b's';
    pub const TABLE: u8 = b't';
    pub const COLUMN: u8 = b'c';
    pub const DATA_TYPE: u8 = b'd';
    pub const CONSTRAINT: u8 = b'n';
    pub const FILE: u8 = b'F';
    pub const LINE: u8 = b'L';
    pub const ROUTINE: u8 = b'R';
}

/// A server-reported error or notice, keyed by its raw field type byte.
#[derive(Debug, Clone)]
pub struct ServerError(pub(crate) HashMap<u8, String>);

impl ServerError {
    pub fn new(fields: HashMap<u8, String>) -> Self {
        Self(fields)
    }

    /// Severity, preferring the non-localized `V` field and falling back to `S`.
    pub fn severity(&self) -> &str {
        self.0
            .get(&field_type::SEVERITY_V)
            .or_else(|| self.0.get(&field_type::SEVERITY))
            .map(String::as_str)
            .unwrap_or("UNKNOWN")
    }

    pub fn code(&self) -> &str {
        self.0.get(&field_type::CODE).map(String::as_str).unwrap_or_default()
    }

    pub fn message(&self) -> &str {
        self.0.get(&field_type::MESSAGE).map(String::as_str).unwrap_or_default()
    }

    pub fn detail(&self) -> Option<&str> {
        self.0.get(&field_type::DETAIL).map(String::as_str)
    }

    pub fn hint(&self) -> Option<&str> {
        self.0.get(&field_type::HINT).map(String::as_str)
    }

    pub fn position(&self) -> Option<u32> {
        self.0.get(&field_type::POSITION).and_then(|s| s.parse().ok())
    }

    pub fn internal_position(&self) -> Option<u32> {
        self.0.get(&field_type::INTERNAL_POSITION).and_then(|s| s.parse().ok())
    }

    pub fn internal_query(&self) -> Option<&str> {
        self.0.get(&field_type::INTERNAL_QUERY).map(String::as_str)
    }

    pub fn where_(&self) -> Option<&str> {
        self.0.get(&field_type::WHERE).map(String::as_str)
    }

    pub fn schema(&self) -> Option<&str> {
        self.0.get(&field_type::SCHEMA).map(String::as_str)
    }

    pub fn table(&self) -> Option<&str> {
        self.0.get(&field_type::TABLE).map(String::as_str)
    }

    pub fn column(&self) -> Option<&str> {
        self.0.get(&field_type::COLUMN).map(String::as_str)
    }

    pub fn data_type(&self) -> Option<&str> {
        self.0.get(&field_type::DATA_TYPE).map(String::as_str)
    }

    pub fn constraint(&self) -> Option<&str> {
        self.0.get(&field_type::CONSTRAINT).map(String::as_str)
    }

    pub fn file(&self) -> Option<&str> {
        self.0.get(&field_type::FILE).map(String::as_str)
    }

    pub fn line(&self) -> Option<u32> {
        self.0.get(&field_type::LINE).and_then(|s| s.parse().ok())
    }

    pub fn routine(&self) -> Option<&str> {
        self.0.get(&field_type::ROUTINE).map(String::as_str)
    }

    /// Fetch a field by its raw type code, for fields without a named accessor.
    pub fn get(&self, field_type: u8) -> Option<&str> {
        self.0.get(&field_type).map(String::as_str)
    }
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} (SQLSTATE {})", self.severity(), self.message(), self.code())?;
        if let Some(detail) = self.detail() {
            write!(f, "\nDETAIL: {detail}")?;
        }
        if let Some(hint) = self.hint() {
            write!(f, "\nHINT: {hint}")?;
        }
        Ok(())
    }
}

/// Error type for the engine.
#[derive(Debug, Error)]
pub enum Error {
    /// The server sent an `ErrorResponse`.
    #[error("PostgreSQL error: {0}")]
    Server(ServerError),

    /// The byte stream violated the wire protocol contract.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Transport failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The `execute` call was cancelled while a request was in flight.
    #[error("operation cancelled")]
    Cancelled,

    /// The connection is closed and can no longer be used.
    #[error("connection is closed")]
    ConnectionBroken,

    /// Caller misuse (bad connection options, nested calls, etc).
    #[error("invalid usage: {0}")]
    InvalidUsage(String),

    /// The server asked for an authentication method this engine does not implement.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A wire value could not be decoded into the requested host type.
    #[error("decode error: {0}")]
    Decode(String),
}

impl Error {
    /// True if the connection cannot be reused after this error.
    ///
    /// A decode failure means the server sent bytes that don't match the
    /// type it declared for the column: the wire contract is already
    /// broken, same as a framing error.
    pub fn is_connection_broken(&self) -> bool {
        match self {
            Error::Io(_)
            | Error::ConnectionBroken
            | Error::Protocol(_)
            | Error::Cancelled
            | Error::Decode(_) => true,
            Error::Server(err) => matches!(err.severity(), "FATAL" | "PANIC"),
            Error::Unsupported(_) | Error::InvalidUsage(_) => false,
        }
    }

    /// SQLSTATE code, if this is a server error.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Error::Server(err) => Some(err.code()),
            _ => None,
        }
    }
}

impl<Src: std::fmt::Debug, Dst: std::fmt::Debug + ?Sized> From<zerocopy::error::CastError<Src, Dst>>
    for Error
{
    fn from(err: zerocopy::error::CastError<Src, Dst>) -> Self {
        Error::Protocol(format!("zerocopy cast error: {err:?}"))
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}
