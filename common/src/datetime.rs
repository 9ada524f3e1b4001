//! Date and time utilities.

#[cfg(feature = "postgres")]
use std::error::Error as StdError;
use std::{cmp::Ordering, marker::PhantomData, ops, time::Duration};

use derive_more::{Debug, Display, Error};
#[cfg(feature = "postgres")]
use postgres_types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};
use time::{format_description::well_known::Rfc3339, UtcOffset};

use crate::{Date, TimeZone};

/// Untyped date and time.
pub type DateTime = DateTimeOf;

/// UTC date and time.
///
/// The `Of` parameter only tags the meaning of an instant (clock-in,
/// break start, report submission, ...), so that instants of different
/// meaning cannot be mixed up accidentally. Use [`DateTimeOf::coerce()`]
/// to change it explicitly.
#[derive(Debug)]
pub struct DateTimeOf<Of: ?Sized = ()> {
    /// Inner representation of the date and time.
    inner: time::OffsetDateTime,

    /// Type parameter describing the kind of date and time.
    #[debug(skip)]
    _of: PhantomData<Of>,
}

impl<Of: ?Sized> DateTimeOf<Of> {
    /// A [`DateTime`] representing the Unix epoch.
    pub const UNIX_EPOCH: Self = Self {
        inner: time::OffsetDateTime::UNIX_EPOCH,
        _of: PhantomData,
    };

    /// Creates a new [`DateTime`] representing the current date and time.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn now() -> Self {
        let inner = time::OffsetDateTime::now_utc();
        Self {
            _of: PhantomData,
            inner: inner
                .replace_microsecond(inner.microsecond())
                .expect("infallible"),
        }
    }

    /// Creates a new [`DateTime`] from the provided [`UNIX_EPOCH`] timestamp.
    ///
    /// [`None`] is returned if the timestamp is invalid.
    ///
    /// [`UNIX_EPOCH`]: Self::UNIX_EPOCH
    #[must_use]
    pub fn from_unix_timestamp(timestamp: i64) -> Option<Self> {
        Some(Self {
            inner: time::OffsetDateTime::from_unix_timestamp(timestamp).ok()?,
            _of: PhantomData,
        })
    }

    /// Returns the [`UNIX_EPOCH`] timestamp of this [`DateTime`].
    ///
    /// [`UNIX_EPOCH`]: Self::UNIX_EPOCH
    #[must_use]
    pub fn unix_timestamp(&self) -> i64 {
        self.inner.unix_timestamp()
    }

    /// Creates a new [`DateTime`] from the provided [RFC 3339] string.
    ///
    /// Any UTC offset of the input is normalized away.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid [RFC 3339] date and time.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    pub fn from_rfc3339(input: &str) -> Result<Self, ParseError> {
        use ParseError as E;

        time::OffsetDateTime::parse(input, &Rfc3339)
            .map_err(E::Parse)?
            .try_into()
            .map_err(E::ComponentRange)
    }

    /// Returns the [`DateTime`] as an [RFC 3339] string in UTC.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        format_rfc3339(self.inner)
    }

    /// Returns the [`DateTime`] as an [RFC 3339] string carrying the UTC
    /// offset of the provided [`TimeZone`] at this instant.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[must_use]
    pub fn to_rfc3339_in(&self, tz: &TimeZone) -> String {
        format_rfc3339(self.in_time_zone(tz))
    }

    /// Returns the wall-clock reading of this [`DateTime`] in the provided
    /// [`TimeZone`].
    #[must_use]
    pub fn in_time_zone(&self, tz: &TimeZone) -> time::OffsetDateTime {
        tz.project(self.inner)
    }

    /// Returns the local calendar [`Date`] of this [`DateTime`] in the
    /// provided [`TimeZone`].
    ///
    /// Only the local `(year, month, day)` reading is kept, so the same local
    /// day in two different zones gives equal [`Date`]s.
    #[must_use]
    pub fn local_date(&self, tz: &TimeZone) -> Date {
        self.in_time_zone(tz).date().into()
    }

    /// Coerces one kind of [`DateTime`] into another.
    #[must_use]
    pub fn coerce<NewOf: ?Sized>(self) -> DateTimeOf<NewOf> {
        DateTimeOf {
            inner: self.inner,
            _of: PhantomData,
        }
    }
}

/// Formats the provided [`time::OffsetDateTime`] as an [RFC 3339] string.
///
/// [RFC 3339]: https://tools.ietf.org/html/rfc3339
fn format_rfc3339(dt: time::OffsetDateTime) -> String {
    dt.format(&Rfc3339).unwrap_or_else(|e| {
        panic!("cannot format `DateTime` as RFC 3339: {e}")
    })
}

/// Error of parsing [`DateTime`] from a string.
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum ParseError {
    /// Failed to parse the string into an [`DateTime`].
    Parse(time::error::Parse),

    /// Parsed [`DateTime`] has an out of range component.
    ComponentRange(time::error::ComponentRange),
}

impl<Of: ?Sized> Copy for DateTimeOf<Of> {}
impl<Of: ?Sized> Clone for DateTimeOf<Of> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Of: ?Sized> Eq for DateTimeOf<Of> {}
impl<Of: ?Sized> PartialEq for DateTimeOf<Of> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<Of: ?Sized> Ord for DateTimeOf<Of> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}
impl<Of: ?Sized> PartialOrd for DateTimeOf<Of> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<Of: ?Sized> TryFrom<time::OffsetDateTime> for DateTimeOf<Of> {
    type Error = time::error::ComponentRange;

    fn try_from(dt: time::OffsetDateTime) -> Result<Self, Self::Error> {
        dt.to_offset(UtcOffset::UTC)
            .replace_microsecond(dt.microsecond())
            .map(|inner| Self {
                inner,
                _of: PhantomData,
            })
    }
}

impl<Of: ?Sized> From<DateTimeOf<Of>> for time::OffsetDateTime {
    fn from(dt: DateTimeOf<Of>) -> Self {
        dt.inner
    }
}

impl<Of: ?Sized> ops::Add<Duration> for DateTimeOf<Of> {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self {
            inner: self.inner + rhs,
            _of: PhantomData,
        }
    }
}

/// Signed difference between two instants.
///
/// Negative when `rhs` is later than `self`.
impl<Of: ?Sized> ops::Sub for DateTimeOf<Of> {
    type Output = time::Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        self.inner - rhs.inner
    }
}

impl<Of: ?Sized> ops::Sub<Duration> for DateTimeOf<Of> {
    type Output = Self;

    fn sub(self, rhs: Duration) -> Self::Output {
        Self {
            inner: self.inner - rhs,
            _of: PhantomData,
        }
    }
}

#[cfg(feature = "postgres")]
impl<Of: ?Sized> FromSql<'_> for DateTimeOf<Of> {
    accepts!(TIMESTAMPTZ);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        time::OffsetDateTime::from_sql(ty, raw)?
            .try_into()
            .map_err(Box::from)
    }
}

#[cfg(feature = "postgres")]
impl<Of: ?Sized> ToSql for DateTimeOf<Of> {
    accepts!(TIMESTAMPTZ);
    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        w: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.inner.to_sql(ty, w)
    }
}

pub mod serde {
    //! Module providing integration with [`serde`] crate.
    //!
    //! [`DateTimeOf`] is (de)serialized as an [RFC 3339] string by default.
    //!
    //! [RFC 3339]: https://tools.ietf.org/html/rfc3339

    use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

    use super::DateTimeOf;

    impl<Of: ?Sized> Serialize for DateTimeOf<Of> {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            s.serialize_str(&self.to_rfc3339())
        }
    }

    impl<'de, Of: ?Sized> Deserialize<'de> for DateTimeOf<Of> {
        fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
            let raw = <std::borrow::Cow<'de, str>>::deserialize(d)?;
            Self::from_rfc3339(&raw).map_err(D::Error::custom)
        }
    }

    pub mod unix_timestamp {
        //! Module providing serialization and deserialization of [`DateTimeOf`]
        //! as a Unix timestamp.

        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        use super::DateTimeOf;

        /// Serializes the [`DateTimeOf`] as a Unix timestamp.
        ///
        /// # Errors
        ///
        /// Returns an error if the timestamp is invalid.
        pub fn serialize<Of, S>(
            dt: &DateTimeOf<Of>,
            serializer: S,
        ) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
            Of: ?Sized,
        {
            serializer.serialize_i64(dt.unix_timestamp())
        }

        /// Deserializes the Unix timestamp into a [`DateTimeOf`].
        ///
        /// # Errors
        ///
        /// Returns an error if the timestamp is invalid.
        pub fn deserialize<'de, D, Of>(
            deserializer: D,
        ) -> Result<DateTimeOf<Of>, D::Error>
        where
            D: Deserializer<'de>,
            Of: ?Sized,
        {
            DateTimeOf::from_unix_timestamp(i64::deserialize(deserializer)?)
                .ok_or_else(|| Error::custom("invalid timestamp"))
        }
    }
}

#[cfg(test)]
mod spec {
    use super::DateTime;
    use crate::{Date, TimeZone};

    fn at(s: &str) -> DateTime {
        DateTime::from_rfc3339(s).unwrap()
    }

    #[test]
    fn local_date_follows_zone() {
        let manila: TimeZone = "Asia/Manila".parse().unwrap();
        let la: TimeZone = "America/Los_Angeles".parse().unwrap();

        // 2024-12-03T17:30Z is Dec 4 01:30 in Manila, Dec 3 09:30 in LA.
        let instant = at("2024-12-03T17:30:00Z");
        assert_eq!(
            instant.local_date(&manila),
            Date::from_ymd(2024, 12, 4).unwrap(),
        );
        assert_eq!(
            instant.local_date(&la),
            Date::from_ymd(2024, 12, 3).unwrap(),
        );
        assert_eq!(
            instant.local_date(&TimeZone::utc()),
            Date::from_ymd(2024, 12, 3).unwrap(),
        );
    }

    #[test]
    fn same_local_day_is_equal_across_zones() {
        let manila: TimeZone = "Asia/Manila".parse().unwrap();
        let la: TimeZone = "America/Los_Angeles".parse().unwrap();

        assert_eq!(
            at("2024-12-04T01:00:00+08:00").local_date(&manila),
            at("2024-12-04T23:00:00-08:00").local_date(&la),
        );
    }

    #[test]
    fn local_date_across_dst_change() {
        let la: TimeZone = "America/Los_Angeles".parse().unwrap();

        // DST ended at 2024-11-03T09:00Z; 23:30 local is UTC-8 afterwards.
        assert_eq!(
            at("2024-11-04T07:30:00Z").local_date(&la),
            Date::from_ymd(2024, 11, 3).unwrap(),
        );
        // Before the change 23:30 local was UTC-7.
        assert_eq!(
            at("2024-11-02T06:30:00Z").local_date(&la),
            Date::from_ymd(2024, 11, 1).unwrap(),
        );
    }

    #[test]
    fn rfc3339_in_zone_carries_offset() {
        let manila: TimeZone = "Asia/Manila".parse().unwrap();

        assert_eq!(
            at("2024-12-03T17:30:00Z").to_rfc3339_in(&manila),
            "2024-12-04T01:30:00+08:00",
        );
        assert_eq!(at("2024-12-03T17:30:00+02:00").to_rfc3339(), "2024-12-03T15:30:00Z");
    }

    #[test]
    fn subtraction_is_signed() {
        let a = at("2024-12-03T10:00:00Z");
        let b = at("2024-12-03T10:05:00Z");

        assert_eq!((b - a).whole_minutes(), 5);
        assert_eq!((a - b).whole_minutes(), -5);
    }
}
