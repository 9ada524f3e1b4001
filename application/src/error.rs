//! [`Error`]-related definitions.

use std::fmt;

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::typed_header::TypedHeaderRejection;
use derive_more::Error as StdError;
use itertools::Itertools as _;
use serde::Serialize;
use service::{
    command, domain::attendance::TransitionError, infra::database, query,
};
use tracerr::{Trace, Traced};

/// Defines a new error type.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_error {
    (
        enum $name:ident {
            $(
                #[code = $code:literal]
                #[status = $status_code:ident]
                #[message = $message:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        /// Error type.
        #[derive(
            Clone,
            Copy,
            Debug,
            ::derive_more::Display,
            ::derive_more::Error
        )]
        #[repr(u16)]
        pub enum $name {
            $(
                #[display($message)]
                #[doc = $message]
                $variant,
            )*
        }

        impl From<$name> for $crate::Error {
            fn from(err: $name) -> Self {
                match err {
                    $(
                        $name::$variant => Self {
                            code: $code,
                            status_code: ::http::StatusCode::$status_code,
                            message: $message.to_string(),
                            backtrace: None,
                        },
                    )*
                }
            }
        }
    };
}

/// HTTP API [`Error`].
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// [`Error`] code.
    pub code: Code,

    /// [`http::StatusCode`] of this [`Error`].
    pub status_code: http::StatusCode,

    /// Backtrace of this [`Error`].
    #[error(not(backtrace))]
    pub backtrace: Option<Trace>,

    /// [`Error`] message.
    pub message: String,
}

impl Error {
    /// Create a new [`Error`] representing an internal server error.
    #[must_use]
    pub fn internal(msg: &impl ToString) -> Self {
        Self {
            code: "INTERNAL_SERVER_ERROR",
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            backtrace: None,
        }
    }

    /// Creates a new [`Error`] describing malformed input.
    #[must_use]
    pub fn validation(msg: &impl ToString) -> Self {
        Self {
            code: "VALIDATION_ERROR",
            status_code: http::StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            backtrace: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            code,
            status_code: _,
            backtrace,
            message,
        } = self;

        write!(
            f,
            "[{code}]: {message}{}",
            backtrace
                .iter()
                .format_with("\n", |trace, f| f(&format_args!("{trace}"))),
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        /// Wire representation of an [`Error`].
        #[derive(Serialize)]
        struct Body<'a> {
            error: Details<'a>,
        }

        /// Details of an [`Error`].
        #[derive(Serialize)]
        struct Details<'a> {
            code: Code,
            message: &'a str,
        }

        if self.status_code.is_server_error() {
            tracing::error!("{self}");
        }

        // Internals of server errors never leave the server.
        let message = if self.status_code.is_server_error() {
            "Internal server error"
        } else {
            self.message.as_str()
        };
        let body = Body {
            error: Details {
                code: self.code,
                message,
            },
        };
        (self.status_code, Json(body)).into_response()
    }
}

/// [`Error`] code.
pub type Code = &'static str;

/// Helper trait for converting types into [`Error`]s.
pub trait AsError {
    /// Tries to convert the type into an [`Error`].
    ///
    /// [`None`] is returned if the type cannot be converted into an [`Error`].
    fn try_as_error(&self) -> Option<Error>;

    /// Converts the type into an [`Error`].
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error()
            .unwrap_or_else(|| Error::internal(&self))
    }

    /// Converts the type into an [`Error`] by consuming it.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        let mut error = self.as_ref().try_as_error()?;
        error.backtrace = Some(self.trace().clone());
        Some(error)
    }
}

impl AsError for TypedHeaderRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::validation(self))
    }
}

impl AsError for JsonRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::validation(&self.body_text()))
    }
}

impl AsError for QueryRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::validation(&self.body_text()))
    }
}

impl AsError for database::Error {
    fn try_as_error(&self) -> Option<Error> {
        None
    }
}

define_error! {
    enum AttendanceError {
        #[code = "ALREADY_ACTIVE"]
        #[status = CONFLICT]
        #[message = "Already clocked in"]
        AlreadyActive,

        #[code = "NOT_CLOCKED_IN"]
        #[status = CONFLICT]
        #[message = "Not clocked in"]
        NotClockedIn,

        #[code = "ALREADY_ON_BREAK"]
        #[status = CONFLICT]
        #[message = "Already on break"]
        AlreadyOnBreak,

        #[code = "NOT_ON_BREAK"]
        #[status = CONFLICT]
        #[message = "Not on break"]
        NotOnBreak,

        #[code = "CLOCK_SKEW"]
        #[status = BAD_REQUEST]
        #[message = "Action time precedes the start of the shift or break"]
        ClockSkew,

        #[code = "NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Attendance record not found"]
        NotFound,

        #[code = "PERMISSION_DENIED"]
        #[status = FORBIDDEN]
        #[message = "Permission denied"]
        PermissionDenied,
    }
}

impl From<TransitionError> for AttendanceError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::AlreadyActive => Self::AlreadyActive,
            TransitionError::NotClockedIn => Self::NotClockedIn,
            TransitionError::AlreadyOnBreak => Self::AlreadyOnBreak,
            TransitionError::NotOnBreak => Self::NotOnBreak,
            TransitionError::ClockSkew => Self::ClockSkew,
        }
    }
}

impl AsError for command::perform_attendance_action::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Transition(e) => Some(AttendanceError::from(*e).into()),
        }
    }
}

impl AsError for command::submit_shift_report::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::AttendanceNotExists(_) => {
                Some(AttendanceError::NotFound.into())
            }
            Self::NotOwner(_) => Some(AttendanceError::PermissionDenied.into()),
        }
    }
}

impl AsError for query::attendance::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::PermissionDenied(_) => {
                Some(AttendanceError::PermissionDenied.into())
            }
        }
    }
}
