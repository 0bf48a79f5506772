use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure kinds produced by probing, inspection, persistence and delivery.
///
/// Callers branch on the kind instead of catching broadly: the first three
/// variants classify a site as down, `TlsFault` only suppresses the
/// certificate warning for one cycle.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not responding: {0}")]
    NetworkFault(String),

    #[error("unexpected status code: {status_code}")]
    ProtocolFault { status_code: u16, elapsed: Duration },

    #[error("expected text '{expected}' not found")]
    ContentMismatch { expected: String, elapsed: Duration },

    #[error("tls inspection failed: {0}")]
    TlsFault(String),

    #[error("persistence failure: {0}")]
    PersistenceFault(String),

    #[error("notification failed: {0}")]
    NotificationFault(String),

    #[error("invalid site: {0}")]
    Validation(String),

    #[error("site {0} not found")]
    NotFound(i64),

    /// A component could not be built from its settings
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Duration measured before the failure was detected, if the request completed.
    pub fn response_time(&self) -> Option<Duration> {
        match self {
            Error::ProtocolFault { elapsed, .. } | Error::ContentMismatch { elapsed, .. } => {
                Some(*elapsed)
            }
            _ => None,
        }
    }

    /// Reason string recorded for a down classification.
    pub fn down_reason(&self) -> Option<&'static str> {
        match self {
            Error::NetworkFault(_) => Some("not responding"),
            Error::ProtocolFault { .. } => Some("unexpected status code"),
            Error::ContentMismatch { .. } => Some("expected text not found"),
            _ => None,
        }
    }
}

impl From<libsql::Error> for Error {
    fn from(err: libsql::Error) -> Self {
        Error::PersistenceFault(err.to_string())
    }
}

impl From<deadpool::managed::PoolError<libsql::Error>> for Error {
    fn from(err: deadpool::managed::PoolError<libsql::Error>) -> Self {
        Error::PersistenceFault(err.to_string())
    }
}
