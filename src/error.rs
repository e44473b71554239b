use std::fmt::Display;

/// Errors surfaced by pagination requests.
///
/// Every error is terminal for the request that raised it: a page is either
/// returned complete or not at all.
#[derive(Debug)]
pub enum Error {
    /// The cursor could not be decoded against the active ordering.
    InvalidCursor(String),
    /// The cursor was minted under a different ordering.
    OrderingMismatch { expected: String, found: String },
    /// The ordering attached to the query cannot be paginated.
    InvalidOrdering(String),
    /// Error raised by the underlying query engine, kept intact.
    Engine(Box<dyn std::error::Error + Send + Sync + 'static>),
    /// A row or configuration could not be converted into the requested type.
    Deserialize(String),
}

impl Error {
    pub fn invalid_cursor(msg: impl Into<String>) -> Self {
        Error::InvalidCursor(msg.into())
    }

    pub fn engine(err: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Error::Engine(err.into())
    }

    /// True when the error was caused by caller input and should map to an
    /// invalid-request response rather than a server failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidCursor(_) | Error::OrderingMismatch { .. })
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidCursor(msg) => write!(f, "Invalid cursor: {}", msg),
            Error::OrderingMismatch { expected, found } => write!(
                f,
                "Cursor ordering mismatch: expected {}, found {}",
                expected, found
            ),
            Error::InvalidOrdering(msg) => write!(f, "Invalid ordering: {}", msg),
            Error::Engine(err) => write!(f, "Engine error: {}", err),
            Error::Deserialize(err) => write!(f, "Deserialization error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Engine(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

#[cfg(any(feature = "postgres", feature = "sqlite"))]
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Engine(Box::new(err))
    }
}
