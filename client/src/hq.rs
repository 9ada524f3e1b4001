//! Headquarters [`Hq`] time display.

use std::fmt;

use common::{DateTime, TimeZone};
use time::{format_description::FormatItem, macros::format_description};

/// 12-hour wall-clock format, e.g. `09:05:00 PM`.
const CLOCK: &[FormatItem<'static>] =
    format_description!("[hour repr:12]:[minute]:[second] [period]");

/// Headquarters of the organization, whose wall clock is shown next to the
/// worker's own one.
///
/// Display only: never influences the attribution of shifts to days.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Hq {
    /// [`TimeZone`] of the headquarters.
    time_zone: TimeZone,
}

impl Hq {
    /// Creates a new [`Hq`] located in the provided [`TimeZone`].
    #[must_use]
    pub const fn new(time_zone: TimeZone) -> Self {
        Self { time_zone }
    }

    /// Returns the [`TimeZone`] of this [`Hq`].
    #[must_use]
    pub const fn time_zone(&self) -> TimeZone {
        self.time_zone
    }

    /// Indicates whether a viewer in the provided [`TimeZone`] shares the
    /// wall clock of this [`Hq`], so showing both is redundant.
    #[must_use]
    pub fn is_local(&self, viewer: &TimeZone) -> bool {
        self.time_zone == *viewer
    }

    /// Renders the wall clock of this [`Hq`] at the provided moment.
    #[must_use]
    pub fn clock(&self, at: DateTime) -> WallClock {
        WallClock(at.in_time_zone(&self.time_zone))
    }
}

/// Wall-clock reading rendered in the 12-hour format.
#[derive(Clone, Copy, Debug)]
pub struct WallClock(time::OffsetDateTime);

impl fmt::Display for WallClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0.format(CLOCK).map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}
