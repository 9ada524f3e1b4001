//! Shift report [`Gate`].

use common::{DateTime, TimeZone};
use service::domain::{
    attendance::{self, Status},
    Attendance,
};

/// Gate demanding a shift report before the normal workflow continues.
///
/// A shift finished on the viewer's current local day without a report
/// blocks the workflow. Shifts finished on previous days are never
/// demanded retroactively.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Gate {
    /// Nothing to report.
    Open,

    /// Report of the [`Attendance`] with the provided ID is required.
    Blocked(attendance::Id),
}

impl Gate {
    /// Evaluates the [`Gate`] over the provided [`Attendance`] view as seen
    /// at `now` in the viewer's [`TimeZone`].
    #[must_use]
    pub fn evaluate(
        attendance: Option<&Attendance>,
        now: DateTime,
        time_zone: &TimeZone,
    ) -> Self {
        let Some(a) = attendance else {
            return Self::Open;
        };
        let finished_today = a.clock_out.is_some_and(|out| {
            out.local_date(time_zone) == now.local_date(time_zone)
        });
        if a.status == Status::ClockedOut
            && a.shift_report.is_none()
            && finished_today
        {
            Self::Blocked(a.id)
        } else {
            Self::Open
        }
    }

    /// Indicates whether this [`Gate`] blocks the workflow.
    #[must_use]
    pub const fn is_blocked(self) -> bool {
        matches!(self, Self::Blocked(_))
    }
}
