//! [`Command`] definition.

pub mod authorize_user_session;
pub mod perform_attendance_action;
pub mod submit_shift_report;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    authorize_user_session::AuthorizeUserSession,
    perform_attendance_action::PerformAttendanceAction,
    submit_shift_report::SubmitShiftReport,
};
