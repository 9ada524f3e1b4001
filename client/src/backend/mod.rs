//! [`Backend`] definitions.
//!
//! A [`Backend`] is the remote side of the attendance server. Every request
//! is an operation the [`Backend`] handles:
//! - `Select<By<Snapshot, TimeZone>>` fetches the current [`Snapshot`];
//! - `Select<By<History, list::Selector>>` fetches a [`History`];
//! - `Perform<By<Snapshot, (Action, TimeZone)>>` performs an [`Action`];
//! - `Update<By<Snapshot, (attendance::Id, ShiftReport, TimeZone)>>`
//!   submits a [`ShiftReport`].
//!
//! [`Action`]: service::domain::attendance::Action
//! [`History`]: service::read::attendance::History
//! [`ShiftReport`]: service::domain::attendance::ShiftReport
//! [`Snapshot`]: service::read::attendance::Snapshot
//! [`attendance::Id`]: service::domain::attendance::Id
//! [`list::Selector`]: service::read::attendance::list::Selector

pub mod http;

use derive_more::{Display, Error as StdError, From};
use serde::Deserialize;

pub use common::Handler as Backend;

pub use self::http::Http;

/// [`Backend`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// Server refused to handle the request.
    #[display("Server rejected the request: {_0}")]
    Rejected(Rejection),

    /// Request never reached the server, or its response could not be read.
    #[display("Request to the server failed: {_0}")]
    Transport(reqwest::Error),
}

impl Error {
    /// Indicates whether repeating the failed request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Rejected(r) => r.status >= 500,
            Self::Transport(_) => true,
        }
    }

    /// Returns the machine-readable code of the [`Rejection`], if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Rejected(r) => Some(&r.code),
            Self::Transport(_) => None,
        }
    }
}

/// Structured refusal of the server to handle a request.
#[derive(Clone, Debug, Display, Eq, PartialEq, StdError)]
#[display("[{status} {code}] {message}")]
pub struct Rejection {
    /// HTTP status code of the response.
    pub status: u16,

    /// Machine-readable code, e.g. `ALREADY_ACTIVE`.
    pub code: String,

    /// Human-readable message.
    pub message: String,
}

impl Rejection {
    /// Creates a new [`Rejection`] out of the provided parts.
    #[must_use]
    pub fn new(
        status: u16,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Wire representation of an error response body.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    /// Details of the error.
    error: ErrorDetails,
}

/// Details of an error response.
#[derive(Debug, Deserialize)]
struct ErrorDetails {
    /// Machine-readable code.
    code: String,

    /// Human-readable message.
    message: String,
}

#[cfg(test)]
mod spec {
    use super::{Error, Rejection};

    #[test]
    fn server_failures_are_transient() {
        let unavailable = Error::from(Rejection::new(503, "X", "down"));
        let conflict =
            Error::from(Rejection::new(409, "ALREADY_ACTIVE", "Already"));

        assert!(unavailable.is_transient());
        assert!(!conflict.is_transient());
        assert_eq!(conflict.code(), Some("ALREADY_ACTIVE"));
        assert_eq!(
            conflict.to_string(),
            "Server rejected the request: [409 ALREADY_ACTIVE] Already",
        );
    }
}
