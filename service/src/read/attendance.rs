//! [`Attendance`] read models definitions.

use common::{DateTime, Hours, TimeZone};
use serde::{Deserialize, Serialize, Serializer};

use crate::domain::{attendance::Break, Attendance};

/// Wrapper around an [`Attendance`] indicating that it [`is_active()`].
///
/// [`is_active()`]: Attendance::is_active
#[derive(Clone, Debug)]
pub struct Active<T>(pub T);

/// Current attendance view of a worker.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Running shift if any, otherwise the latest shift of the local today.
    pub attendance: Option<Attendance>,

    /// Running [`Break`] of the [`Snapshot::attendance`].
    pub active_break: Option<Break>,

    /// Moment this [`Snapshot`] was taken at.
    pub server_time: DateTime,

    /// [`TimeZone`] this [`Snapshot`] was taken in.
    #[serde(rename = "timezone")]
    pub time_zone: TimeZone,
}

impl Snapshot {
    /// Creates a new [`Snapshot`] of the provided [`Attendance`].
    #[must_use]
    pub fn new(
        attendance: Option<Attendance>,
        server_time: DateTime,
        time_zone: TimeZone,
    ) -> Self {
        Self {
            active_break: attendance
                .as_ref()
                .and_then(Attendance::active_break)
                .cloned(),
            attendance,
            server_time,
            time_zone,
        }
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        /// Wire representation of a [`Snapshot`].
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Wire<'a> {
            attendance: &'a Option<Attendance>,
            active_break: &'a Option<Break>,
            server_time: String,
            timezone: &'a TimeZone,
        }

        Wire {
            attendance: &self.attendance,
            active_break: &self.active_break,
            server_time: self.server_time.to_rfc3339_in(&self.time_zone),
            timezone: &self.time_zone,
        }
        .serialize(s)
    }
}

/// Timesheet summary over a list of [`Attendance`]s.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Number of shifts.
    pub shifts: u32,

    /// Sum of the net worked [`Hours`] of the finished shifts.
    pub total_hours: Hours,

    /// Average net worked [`Hours`] per finished shift.
    pub average_hours: Hours,

    /// Number of shifts with a submitted report.
    pub reported: u32,
}

impl Summary {
    /// Summarizes the provided [`Attendance`]s.
    #[must_use]
    pub fn of(attendances: &[Attendance]) -> Self {
        let worked = || attendances.iter().filter_map(|a| a.total_hours);
        Self {
            shifts: count(attendances.iter()),
            total_hours: worked().sum(),
            average_hours: Hours::average(worked()),
            reported: count(
                attendances.iter().filter(|a| a.shift_report.is_some()),
            ),
        }
    }
}

/// Counts the provided items, saturating at [`u32::MAX`].
fn count<T>(items: impl Iterator<Item = T>) -> u32 {
    u32::try_from(items.count()).unwrap_or(u32::MAX)
}

/// Attendance history of one or all workers.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    /// [`Attendance`]s ordered from the latest [`Date`].
    ///
    /// [`Date`]: common::Date
    pub attendance: Vec<Attendance>,

    /// Number of the returned [`Attendance`]s.
    pub count: u32,

    /// [`Summary`] of the returned [`Attendance`]s.
    pub summary: Summary,
}

impl From<Vec<Attendance>> for History {
    fn from(attendance: Vec<Attendance>) -> Self {
        Self {
            count: count(attendance.iter()),
            summary: Summary::of(&attendance),
            attendance,
        }
    }
}

pub mod list {
    //! [`Attendance`]s list definitions.

    use common::Date;
    use derive_more::Display;

    use crate::domain::user;
    #[cfg(doc)]
    use crate::domain::Attendance;

    /// Filter of [`Attendance`]s in a [`Selector`].
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct Filter {
        /// Worker to list the [`Attendance`]s of.
        ///
        /// [`None`] means all the workers.
        pub user_id: Option<user::Id>,

        /// Earliest [`Date`] to include.
        pub from: Option<Date>,

        /// Latest [`Date`] to include.
        pub to: Option<Date>,
    }

    impl Filter {
        /// Checks whether the provided [`Attendance`] parameters match this
        /// [`Filter`].
        #[must_use]
        pub fn matches(&self, user_id: user::Id, date: Date) -> bool {
            self.user_id.map_or(true, |id| id == user_id)
                && self.from.map_or(true, |from| date >= from)
                && self.to.map_or(true, |to| date <= to)
        }
    }

    /// Selector of [`Attendance`]s, ordered by their [`Date`] and clock-in,
    /// latest first.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct Selector {
        /// [`Filter`] to apply.
        pub filter: Filter,

        /// Maximum number of [`Attendance`]s to select.
        pub limit: Limit,
    }

    /// Maximum number of [`Attendance`]s in a list.
    #[derive(
        Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd,
    )]
    pub struct Limit(u16);

    impl Limit {
        /// Default [`Limit`].
        pub const DEFAULT: Self = Self(100);

        /// Maximum allowed [`Limit`].
        pub const MAX: Self = Self(1000);

        /// Creates a new [`Limit`] if the provided value is within
        /// `1..=`[`Limit::MAX`].
        #[must_use]
        pub fn new(limit: u32) -> Option<Self> {
            u16::try_from(limit)
                .ok()
                .filter(|l| (1..=Self::MAX.0).contains(l))
                .map(Self)
        }

        /// Returns this [`Limit`] as a [`usize`].
        #[must_use]
        pub fn get(self) -> usize {
            self.0.into()
        }
    }

    impl Default for Limit {
        fn default() -> Self {
            Self::DEFAULT
        }
    }

    impl From<Limit> for i64 {
        fn from(limit: Limit) -> Self {
            limit.0.into()
        }
    }
}
