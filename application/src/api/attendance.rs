//! Attendance endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query,
    },
    Json,
};
use common::Date;
use serde::Deserialize;
use service::{
    command::{self, Command as _},
    domain::{
        attendance::{self, breaks, Action, ShiftReport},
        user,
    },
    query::{self, Query as _},
    read::attendance::{list, History, Snapshot},
};
use uuid::Uuid;

use crate::{define_error, AsError, Context, Error};

/// Request body of the [`perform`] endpoint.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    /// Name of the [`Action`] to perform.
    pub action: String,

    /// IANA time zone of the caller.
    pub timezone: Option<String>,

    /// Kind of the [`breaks::Kind`] to start.
    pub break_type: Option<String>,

    /// Whether the finished shift should be attributed to the day after its
    /// clock-in day.
    pub use_next_day: Option<bool>,
}

impl ActionRequest {
    /// Parses the [`Action`] of this [`ActionRequest`].
    ///
    /// # Errors
    ///
    /// If the action or the break type is unknown.
    pub fn to_action(&self) -> Result<Action, Error> {
        Ok(match self.action.as_str() {
            "clock_in" => Action::ClockIn,
            "start_break" => Action::StartBreak(
                self.break_type
                    .as_deref()
                    .map(|t| t.trim().to_ascii_uppercase().parse::<breaks::Kind>())
                    .transpose()
                    .map_err(|_| ValidationError::UnknownBreakType)?
                    .unwrap_or_default(),
            ),
            "end_break" => Action::EndBreak,
            "clock_out" => {
                Action::ClockOut(self.use_next_day.unwrap_or_default().into())
            }
            _ => return Err(ValidationError::UnknownAction.into()),
        })
    }
}

/// Request body of the [`submit_report`] endpoint.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    /// ID of the [`attendance::Attendance`] to report.
    pub attendance_id: attendance::Id,

    /// Text of the report.
    pub shift_report: String,

    /// IANA time zone of the caller.
    pub timezone: Option<String>,
}

/// Query parameters of the [`history`] endpoint.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    /// Worker to list the history of.
    pub user_id: Option<Uuid>,

    /// Earliest [`Date`] to include.
    pub start_date: Option<Date>,

    /// Latest [`Date`] to include.
    pub end_date: Option<Date>,

    /// Maximum number of records to return.
    pub limit: Option<u32>,
}

/// Returns the current attendance [`Snapshot`] of the caller.
///
/// # Errors
///
/// If the time zone is unknown, or the [`Snapshot`] cannot be read.
#[tracing::instrument(
    skip_all,
    fields(user_id = %ctx.session().user_id),
)]
pub async fn current(ctx: Context) -> Result<Json<Snapshot>, Error> {
    let time_zone = ctx.time_zone(None)?;

    ctx.service()
        .execute(query::attendance::Current {
            user_id: ctx.session().user_id,
            time_zone,
        })
        .await
        .map(Json)
        .map_err(AsError::into_error)
}

/// Performs an attendance [`Action`] of the caller.
///
/// # Errors
///
/// If the request is malformed, or the [`Action`] is not allowed.
#[tracing::instrument(
    skip_all,
    fields(
        user_id = %ctx.session().user_id,
        action = tracing::field::Empty,
        time_zone = tracing::field::Empty,
    ),
)]
pub async fn perform(
    ctx: Context,
    body: Result<Json<ActionRequest>, JsonRejection>,
) -> Result<Json<Snapshot>, Error> {
    let Json(req) = body.map_err(AsError::into_error)?;
    let action = req.to_action()?;
    let time_zone = ctx.time_zone(req.timezone.as_deref())?;

    let span = tracing::Span::current();
    _ = span.record("action", action.name());
    _ = span.record("time_zone", time_zone.name());

    ctx.service()
        .execute(command::PerformAttendanceAction {
            user_id: ctx.session().user_id,
            action,
            time_zone,
        })
        .await
        .map(Json)
        .map_err(AsError::into_error)
}

/// Attaches a shift report to an attendance record of the caller.
///
/// # Errors
///
/// If the request is malformed, or the record is not the caller's one.
#[tracing::instrument(
    skip_all,
    fields(
        user_id = %ctx.session().user_id,
        attendance_id = tracing::field::Empty,
    ),
)]
pub async fn submit_report(
    ctx: Context,
    body: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<Json<Snapshot>, Error> {
    let Json(req) = body.map_err(AsError::into_error)?;
    _ = tracing::Span::current()
        .record("attendance_id", tracing::field::display(req.attendance_id));

    let time_zone = ctx.time_zone(req.timezone.as_deref())?;
    let report = ShiftReport::new(req.shift_report)
        .ok_or(ValidationError::InvalidShiftReport)?;

    ctx.service()
        .execute(command::SubmitShiftReport {
            user_id: ctx.session().user_id,
            attendance_id: req.attendance_id,
            report,
            time_zone,
        })
        .await
        .map(Json)
        .map_err(AsError::into_error)
}

/// Returns the attendance [`History`] visible to the caller.
///
/// # Errors
///
/// If the parameters are malformed, or the caller is not allowed to see the
/// requested history.
#[tracing::instrument(
    skip_all,
    fields(user_id = %ctx.session().user_id),
)]
pub async fn history(
    ctx: Context,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<History>, Error> {
    let Query(HistoryParams {
        user_id,
        start_date,
        end_date,
        limit,
    }) = params.map_err(AsError::into_error)?;
    let limit = limit
        .map(|l| list::Limit::new(l).ok_or(ValidationError::InvalidLimit))
        .transpose()?
        .unwrap_or_default();

    ctx.service()
        .execute(query::attendance::History {
            initiator: *ctx.session(),
            user_id: user_id.map(user::Id::from),
            from: start_date,
            to: end_date,
            limit,
        })
        .await
        .map(Json)
        .map_err(AsError::into_error)
}

define_error! {
    enum ValidationError {
        #[code = "VALIDATION_ERROR"]
        #[status = BAD_REQUEST]
        #[message = "Unknown action"]
        UnknownAction,

        #[code = "VALIDATION_ERROR"]
        #[status = BAD_REQUEST]
        #[message = "Unknown break type"]
        UnknownBreakType,

        #[code = "VALIDATION_ERROR"]
        #[status = BAD_REQUEST]
        #[message = "Shift report must be non-blank and at most 10000 \
                     characters long"]
        InvalidShiftReport,

        #[code = "VALIDATION_ERROR"]
        #[status = BAD_REQUEST]
        #[message = "Limit must be between 1 and 1000"]
        InvalidLimit,
    }
}
