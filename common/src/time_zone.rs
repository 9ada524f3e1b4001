//! [IANA] [`TimeZone`] definitions.
//!
//! [IANA]: https://www.iana.org/time-zones

#[cfg(feature = "postgres")]
use std::error::Error as StdError;
use std::{fmt, hash, str::FromStr};

use derive_more::{Display, Error};
#[cfg(feature = "postgres")]
use postgres_types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};
use time::UtcOffset;
use time_tz::{timezones, OffsetDateTimeExt as _, TimeZone as _, Tz};

/// [IANA] time zone, e.g. `Asia/Manila`.
///
/// Used to resolve instants into local wall-clock readings and calendar
/// days. Never used to store instants, which are always kept in UTC.
///
/// [IANA]: https://www.iana.org/time-zones
#[derive(Clone, Copy)]
pub struct TimeZone(Inner);

/// Inner representation of a [`TimeZone`].
#[derive(Clone, Copy)]
enum Inner {
    /// Coordinated Universal Time.
    Utc,

    /// Zone from the [IANA] database.
    ///
    /// [IANA]: https://www.iana.org/time-zones
    Iana(&'static Tz),
}

impl TimeZone {
    /// Name of the UTC [`TimeZone`].
    const UTC: &'static str = "UTC";

    /// Returns the UTC [`TimeZone`].
    #[must_use]
    pub const fn utc() -> Self {
        Self(Inner::Utc)
    }

    /// Looks up a [`TimeZone`] by its [IANA] name.
    ///
    /// [`None`] is returned if no such zone is known.
    ///
    /// [IANA]: https://www.iana.org/time-zones
    #[must_use]
    pub fn by_name(name: &str) -> Option<Self> {
        if name == Self::UTC {
            return Some(Self::utc());
        }
        timezones::get_by_name(name).map(|tz| Self(Inner::Iana(tz)))
    }

    /// Returns the [IANA] name of this [`TimeZone`].
    ///
    /// [IANA]: https://www.iana.org/time-zones
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self.0 {
            Inner::Utc => Self::UTC,
            Inner::Iana(tz) => tz.name(),
        }
    }

    /// Projects the provided instant onto the wall clock of this
    /// [`TimeZone`], keeping the instant itself unchanged.
    #[must_use]
    pub fn project(&self, dt: time::OffsetDateTime) -> time::OffsetDateTime {
        match self.0 {
            Inner::Utc => dt.to_offset(UtcOffset::UTC),
            Inner::Iana(tz) => dt.to_timezone(tz),
        }
    }
}

impl Default for TimeZone {
    fn default() -> Self {
        Self::utc()
    }
}

impl fmt::Debug for TimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TimeZone").field(&self.name()).finish()
    }
}

impl fmt::Display for TimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Eq for TimeZone {}
impl PartialEq for TimeZone {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl hash::Hash for TimeZone {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl FromStr for TimeZone {
    type Err = UnknownTimeZone;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::by_name(s.trim()).ok_or_else(|| UnknownTimeZone(s.to_owned()))
    }
}

/// Error of looking up a [`TimeZone`] by an unknown name.
#[derive(Clone, Debug, Display, Error)]
#[display("unknown time zone: `{_0}`")]
pub struct UnknownTimeZone(#[error(not(source))] String);

#[cfg(feature = "postgres")]
impl FromSql<'_> for TimeZone {
    accepts!(VARCHAR, TEXT);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        Ok(<&str>::from_sql(ty, raw)?.parse()?)
    }
}

#[cfg(feature = "postgres")]
impl ToSql for TimeZone {
    accepts!(VARCHAR, TEXT);
    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        w: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.name().to_sql(ty, w)
    }
}

mod serde {
    //! Module providing integration with [`serde`] crate.

    use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

    use super::TimeZone;

    impl Serialize for TimeZone {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            s.serialize_str(self.name())
        }
    }

    impl<'de> Deserialize<'de> for TimeZone {
        fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
            let raw = <std::borrow::Cow<'de, str>>::deserialize(d)?;
            raw.parse().map_err(D::Error::custom)
        }
    }
}
