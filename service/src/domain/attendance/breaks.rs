//! [`Break`] definitions.

use common::{define_kind, unit, DateTime, DateTimeOf, Minutes};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Attendance, TransitionError};

/// Break interval within a shift of an [`Attendance`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Break {
    /// ID of this [`Break`].
    pub id: Id,

    /// ID of the [`Attendance`] this [`Break`] belongs to.
    pub attendance_id: super::Id,

    /// [`DateTime`] when this [`Break`] started.
    pub start_time: StartDateTime,

    /// [`DateTime`] when this [`Break`] ended.
    ///
    /// [`None`] while this [`Break`] is still running.
    pub end_time: Option<EndDateTime>,

    /// Length of this [`Break`], frozen once it ends.
    #[serde(rename = "durationMinutes")]
    pub duration: Option<Minutes>,

    /// [`Kind`] of this [`Break`].
    #[serde(rename = "type")]
    pub kind: Kind,

    /// Optional free-text notes.
    pub notes: Option<String>,
}

impl Break {
    /// Starts a new [`Break`] of the provided [`Kind`] at the provided
    /// moment.
    #[must_use]
    pub fn start(attendance_id: super::Id, kind: Kind, now: DateTime) -> Self {
        Self {
            id: Id::new(),
            attendance_id,
            start_time: now.coerce(),
            end_time: None,
            duration: None,
            kind,
            notes: None,
        }
    }

    /// Indicates whether this [`Break`] is still running.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Returns the length of this [`Break`] if it ended at the provided
    /// moment.
    ///
    /// # Errors
    ///
    /// With [`TransitionError::ClockSkew`] if `now` precedes the start of
    /// this [`Break`].
    pub fn length_until(&self, now: DateTime) -> Result<Minutes, TransitionError> {
        let length = Minutes::between(self.start_time, now);
        if length.is_negative() {
            return Err(TransitionError::ClockSkew);
        }
        Ok(length)
    }

    /// Ends this [`Break`] at the provided moment with the provided
    /// (already computed) length.
    pub(super) fn close(&mut self, now: DateTime, length: Minutes) {
        self.end_time = Some(now.coerce());
        self.duration = Some(length);
    }
}

/// ID of a [`Break`].
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
    #[doc = "Kind of a `Break`."]
    enum Kind {
        #[doc = "Short break."]
        Short = 1,

        #[doc = "Lunch break."]
        Lunch = 2,

        #[doc = "Personal break."]
        Personal = 3,

        #[doc = "Any other break."]
        Other = 4,
    }
}

impl Default for Kind {
    fn default() -> Self {
        Self::Short
    }
}

/// [`DateTime`] when a [`Break`] started.
pub type StartDateTime = DateTimeOf<(Break, unit::Start)>;

/// [`DateTime`] when a [`Break`] ended.
pub type EndDateTime = DateTimeOf<(Break, unit::End)>;
