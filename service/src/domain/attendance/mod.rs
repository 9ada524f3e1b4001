//! [`Attendance`] definitions.
//!
//! An [`Attendance`] is a single shift of a worker, from clock-in to
//! clock-out. Its lifecycle is:
//! ```text
//! CLOCKED_IN ⇄ ON_BREAK
//!     └──────────┴──> CLOCKED_OUT
//! ```
//! All the transitions are pure: they never look at the system clock or the
//! ambient time zone, and they either apply completely or leave the
//! [`Attendance`] untouched.

pub mod breaks;

use common::{
    define_kind, unit, Date, DateTime, DateTimeOf, Hours, Minutes, TimeZone,
};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user;

pub use self::breaks::Break;

/// Single shift of a worker.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    /// ID of this [`Attendance`].
    pub id: Id,

    /// ID of the worker this [`Attendance`] belongs to.
    pub user_id: user::Id,

    /// Local calendar [`Date`] this shift is attributed to.
    pub date: Date,

    /// [`TimeZone`] captured at clock-in.
    #[serde(rename = "timezone")]
    pub time_zone: TimeZone,

    /// [`DateTime`] when this shift started.
    pub clock_in: ClockInDateTime,

    /// [`DateTime`] when this shift ended, if it did.
    pub clock_out: Option<ClockOutDateTime>,

    /// Current [`Status`] of this shift.
    pub status: Status,

    /// Sum of the lengths of all the closed [`Break`]s.
    #[serde(rename = "totalBreakMinutes")]
    pub total_break: Minutes,

    /// Elapsed time from clock-in to clock-out, breaks included.
    ///
    /// Set once at clock-out.
    #[serde(rename = "durationMinutes")]
    pub duration: Option<Minutes>,

    /// Net worked [`Hours`], breaks excluded.
    ///
    /// Set once at clock-out.
    pub total_hours: Option<Hours>,

    /// [`ShiftReport`] submitted for this shift, if any.
    pub shift_report: Option<ShiftReport>,

    /// [`DateTime`] when the [`ShiftReport`] was submitted.
    pub reported_at: Option<ReportDateTime>,

    /// [`Break`]s of this shift, ordered by their start.
    pub breaks: Vec<Break>,

    /// [`DateTime`] when this [`Attendance`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Attendance`] was last modified.
    pub updated_at: ModificationDateTime,
}

impl Attendance {
    /// Starts a new shift at the provided moment, attributing it to the local
    /// day of that moment in the provided [`TimeZone`].
    #[must_use]
    pub fn clock_in(
        user_id: user::Id,
        time_zone: TimeZone,
        now: DateTime,
    ) -> Self {
        Self {
            id: Id::new(),
            user_id,
            date: now.local_date(&time_zone),
            time_zone,
            clock_in: now.coerce(),
            clock_out: None,
            status: Status::ClockedIn,
            total_break: Minutes::ZERO,
            duration: None,
            total_hours: None,
            shift_report: None,
            reported_at: None,
            breaks: Vec::new(),
            created_at: now.coerce(),
            updated_at: now.coerce(),
        }
    }

    /// Indicates whether this shift is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Returns the currently running [`Break`], if any.
    #[must_use]
    pub fn active_break(&self) -> Option<&Break> {
        self.breaks.iter().find(|b| b.is_open())
    }

    /// Starts a new [`Break`] of the provided [`breaks::Kind`].
    ///
    /// # Errors
    ///
    /// - [`TransitionError::NotClockedIn`] if this shift is not running.
    /// - [`TransitionError::AlreadyOnBreak`] if a [`Break`] is running.
    /// - [`TransitionError::ClockSkew`] if `now` precedes the clock-in.
    pub fn start_break(
        &mut self,
        kind: breaks::Kind,
        now: DateTime,
    ) -> Result<Break, TransitionError> {
        use TransitionError as E;

        match self.status {
            Status::ClockedIn => {}
            Status::OnBreak => return Err(E::AlreadyOnBreak),
            Status::ClockedOut | Status::Absent => return Err(E::NotClockedIn),
        }
        if self.active_break().is_some() {
            return Err(E::AlreadyOnBreak);
        }
        if Minutes::between(self.clock_in, now).is_negative() {
            return Err(E::ClockSkew);
        }

        let started = Break::start(self.id, kind, now);
        self.breaks.push(started.clone());
        self.status = Status::OnBreak;
        self.updated_at = now.coerce();
        Ok(started)
    }

    /// Ends the running [`Break`], adding its length to the
    /// [`Attendance::total_break`].
    ///
    /// # Errors
    ///
    /// - [`TransitionError::NotOnBreak`] if no [`Break`] is running.
    /// - [`TransitionError::ClockSkew`] if `now` precedes the [`Break`] start.
    pub fn end_break(
        &mut self,
        now: DateTime,
    ) -> Result<Break, TransitionError> {
        if self.status != Status::OnBreak {
            return Err(TransitionError::NotOnBreak);
        }
        let (idx, length) = self
            .closing_break(now)?
            .ok_or(TransitionError::NotOnBreak)?;

        self.close_break(idx, now, length);
        self.status = Status::ClockedIn;
        self.updated_at = now.coerce();
        Ok(self.breaks[idx].clone())
    }

    /// Ends this shift at the provided moment.
    ///
    /// A running [`Break`] is ended first, and is returned. The [`Date`] of
    /// this shift is moved to the day after its clock-in day if
    /// [`DayAssignment::NextDay`] is requested.
    ///
    /// # Errors
    ///
    /// - [`TransitionError::NotClockedIn`] if this shift is not running.
    /// - [`TransitionError::ClockSkew`] if `now` precedes the clock-in or the
    ///   running [`Break`] start.
    pub fn clock_out(
        &mut self,
        now: DateTime,
        day: DayAssignment,
    ) -> Result<Option<Break>, TransitionError> {
        if !self.is_active() {
            return Err(TransitionError::NotClockedIn);
        }
        let duration = Minutes::between(self.clock_in, now);
        if duration.is_negative() {
            return Err(TransitionError::ClockSkew);
        }
        let closing = self.closing_break(now)?;

        // Nothing can fail past this point.
        let closed = closing.map(|(idx, length)| {
            self.close_break(idx, now, length);
            self.breaks[idx].clone()
        });
        self.duration = Some(duration);
        self.total_hours =
            Some(Hours::from_minutes(duration - self.total_break));
        self.clock_out = Some(now.coerce());
        self.status = Status::ClockedOut;
        if day == DayAssignment::NextDay {
            self.date = self.clock_in.local_date(&self.time_zone).next();
        }
        self.updated_at = now.coerce();
        Ok(closed)
    }

    /// Attaches the provided [`ShiftReport`] to this shift, overwriting any
    /// previous one.
    pub fn submit_report(&mut self, report: ShiftReport, now: DateTime) {
        self.shift_report = Some(report);
        self.reported_at = Some(now.coerce());
        self.updated_at = now.coerce();
    }

    /// Returns the net time worked in this shift so far, breaks excluded.
    #[must_use]
    pub fn worked_time(&self, now: DateTime) -> Minutes {
        let elapsed = self
            .duration
            .unwrap_or_else(|| Minutes::between(self.clock_in, now));
        (elapsed - self.total_break - self.break_time(now)).max(Minutes::ZERO)
    }

    /// Returns the time spent in the running [`Break`] so far.
    #[must_use]
    pub fn break_time(&self, now: DateTime) -> Minutes {
        self.active_break()
            .map_or(Minutes::ZERO, |b| {
                Minutes::between(b.start_time, now).max(Minutes::ZERO)
            })
    }

    /// Locates the running [`Break`] and computes its length if it ended at
    /// the provided moment.
    fn closing_break(
        &self,
        now: DateTime,
    ) -> Result<Option<(usize, Minutes)>, TransitionError> {
        self.breaks
            .iter()
            .position(Break::is_open)
            .map(|idx| Ok((idx, self.breaks[idx].length_until(now)?)))
            .transpose()
    }

    /// Closes the [`Break`] at the provided index.
    fn close_break(&mut self, idx: usize, now: DateTime, length: Minutes) {
        self.breaks[idx].close(now, length);
        self.total_break += length;
    }
}

/// ID of an [`Attendance`].
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    #[doc = "Status of an `Attendance`."]
    enum Status {
        #[doc = "Shift is running."]
        ClockedIn = 1,

        #[doc = "Shift is running, and the worker is on a break."]
        OnBreak = 2,

        #[doc = "Shift has ended."]
        ClockedOut = 3,

        #[doc = "No activity at all. Only ever seeded externally."]
        Absent = 4,
    }
}

impl Status {
    /// Indicates whether a shift in this [`Status`] is still running.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::ClockedIn | Self::OnBreak)
    }
}

/// Local day a finished shift is attributed to.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DayAssignment {
    /// Keep the local day of the clock-in.
    #[default]
    ClockInDay,

    /// Move to the day after the clock-in day.
    NextDay,
}

impl From<bool> for DayAssignment {
    fn from(use_next_day: bool) -> Self {
        if use_next_day {
            Self::NextDay
        } else {
            Self::ClockInDay
        }
    }
}

/// Free-text narrative of a finished shift.
#[derive(AsRef, Clone, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[serde(transparent)]
pub struct ShiftReport(String);

impl ShiftReport {
    /// Maximum number of characters in a [`ShiftReport`].
    pub const MAX_LENGTH: usize = 10_000;

    /// Creates a new [`ShiftReport`] if the provided `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        Self::check(&text).then_some(Self(text))
    }

    /// Checks whether the provided `text` is a valid [`ShiftReport`].
    fn check(text: &str) -> bool {
        !text.trim().is_empty() && text.chars().count() <= Self::MAX_LENGTH
    }
}

/// Attendance action a worker may perform.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    /// Start a new shift.
    ClockIn,

    /// Start a [`Break`] of the provided [`breaks::Kind`].
    StartBreak(breaks::Kind),

    /// End the running [`Break`].
    EndBreak,

    /// End the running shift.
    ClockOut(DayAssignment),
}

impl Action {
    /// Returns the wire name of this [`Action`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ClockIn => "clock_in",
            Self::StartBreak(_) => "start_break",
            Self::EndBreak => "end_break",
            Self::ClockOut(_) => "clock_out",
        }
    }

    /// Applies this [`Action`] to the `current` [`Attendance`] of a worker.
    ///
    /// The `current` one is either the running shift or the latest finished
    /// one, if any. The `time_zone` is only used for starting a new shift.
    ///
    /// # Errors
    ///
    /// If the [`Action`] is not allowed in the `current` state. Nothing is
    /// changed in such case.
    pub fn apply(
        self,
        current: Option<Attendance>,
        user_id: user::Id,
        time_zone: TimeZone,
        now: DateTime,
    ) -> Result<Transition, TransitionError> {
        use TransitionError as E;

        let mut transition = Transition {
            attendance: match (self, current) {
                (Self::ClockIn, Some(a)) if a.is_active() => {
                    return Err(E::AlreadyActive)
                }
                (Self::ClockIn, _) => {
                    Attendance::clock_in(user_id, time_zone, now)
                }
                (Self::StartBreak(_) | Self::ClockOut(_), None) => {
                    return Err(E::NotClockedIn)
                }
                (Self::EndBreak, None) => return Err(E::NotOnBreak),
                (_, Some(a)) => a,
            },
            opened_break: None,
            closed_break: None,
        };
        let attendance = &mut transition.attendance;
        match self {
            Self::ClockIn => {}
            Self::StartBreak(kind) => {
                transition.opened_break =
                    Some(attendance.start_break(kind, now)?);
            }
            Self::EndBreak => {
                transition.closed_break = Some(attendance.end_break(now)?);
            }
            Self::ClockOut(day) => {
                transition.closed_break = attendance.clock_out(now, day)?;
            }
        }
        Ok(transition)
    }
}

/// Result of applying an [`Action`].
#[derive(Clone, Debug)]
pub struct Transition {
    /// [`Attendance`] after the [`Action`].
    pub attendance: Attendance,

    /// [`Break`] started by the [`Action`], if any.
    pub opened_break: Option<Break>,

    /// [`Break`] ended by the [`Action`], if any.
    pub closed_break: Option<Break>,
}

/// Error of an [`Attendance`] transition.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum TransitionError {
    /// Worker already has a running shift.
    #[display("Already clocked in")]
    AlreadyActive,

    /// Worker has no running shift.
    #[display("Not clocked in")]
    NotClockedIn,

    /// Worker is already on a break.
    #[display("Already on break")]
    AlreadyOnBreak,

    /// Worker is not on a break.
    #[display("Not on break")]
    NotOnBreak,

    /// Transition moment precedes the moment it is measured from.
    #[display("Transition moment precedes the start of the measured interval")]
    ClockSkew,
}

/// [`DateTime`] when an [`Attendance`] shift started.
pub type ClockInDateTime = DateTimeOf<(Attendance, unit::ClockIn)>;

/// [`DateTime`] when an [`Attendance`] shift ended.
pub type ClockOutDateTime = DateTimeOf<(Attendance, unit::ClockOut)>;

/// [`DateTime`] when a [`ShiftReport`] was submitted.
pub type ReportDateTime = DateTimeOf<(Attendance, unit::Report)>;

/// [`DateTime`] when an [`Attendance`] was created.
pub type CreationDateTime = DateTimeOf<(Attendance, unit::Creation)>;

/// [`DateTime`] when an [`Attendance`] was last modified.
pub type ModificationDateTime = DateTimeOf<(Attendance, unit::Modification)>;
