//! [`Minutes`] definitions.

#[cfg(feature = "postgres")]
use std::error::Error as StdError;
use std::{iter, ops};

use derive_more::Display;
#[cfg(feature = "postgres")]
use postgres_types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};

use crate::DateTimeOf;

/// Whole number of minutes.
#[derive(
    Clone, Copy, Debug, Default, Display, Eq, Hash, Ord, PartialEq, PartialOrd,
)]
pub struct Minutes(i32);

impl Minutes {
    /// Zero [`Minutes`].
    pub const ZERO: Self = Self(0);

    /// Creates new [`Minutes`] out of the provided number.
    #[must_use]
    pub const fn new(minutes: i32) -> Self {
        Self(minutes)
    }

    /// Returns the number of minutes elapsed from `start` to `end`, rounded
    /// to the nearest minute with halves rounded away from zero.
    ///
    /// Negative if `end` precedes `start`. Saturates on overflow.
    #[must_use]
    pub fn between<A: ?Sized, B: ?Sized>(
        start: DateTimeOf<A>,
        end: DateTimeOf<B>,
    ) -> Self {
        /// Microseconds in a minute.
        const MINUTE: i128 = 60_000_000;

        let micros =
            (end.coerce::<()>() - start.coerce::<()>()).whole_microseconds();
        let minutes = (micros.abs() + MINUTE / 2) / MINUTE * micros.signum();
        Self(i32::try_from(minutes).unwrap_or(if minutes < 0 {
            i32::MIN
        } else {
            i32::MAX
        }))
    }

    /// Returns the inner number of minutes.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Indicates whether these [`Minutes`] are negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl From<i32> for Minutes {
    fn from(minutes: i32) -> Self {
        Self(minutes)
    }
}

impl ops::Add for Minutes {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl ops::AddAssign for Minutes {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl ops::Sub for Minutes {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl iter::Sum for Minutes {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, ops::Add::add)
    }
}

#[cfg(feature = "postgres")]
impl FromSql<'_> for Minutes {
    accepts!(INT4);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        i32::from_sql(ty, raw).map(Self)
    }
}

#[cfg(feature = "postgres")]
impl ToSql for Minutes {
    accepts!(INT4);
    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        w: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, w)
    }
}

mod serde {
    //! Module providing integration with [`serde`] crate.

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Minutes;

    impl Serialize for Minutes {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            s.serialize_i32(self.0)
        }
    }

    impl<'de> Deserialize<'de> for Minutes {
        fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
            i32::deserialize(d).map(Self)
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use super::Minutes;
    use crate::DateTime;

    fn base() -> DateTime {
        DateTime::from_rfc3339("2024-12-04T08:00:00Z").unwrap()
    }

    #[test]
    fn rounds_half_away_from_zero() {
        let start = base();

        assert_eq!(Minutes::between(start, start), Minutes::ZERO);
        assert_eq!(
            Minutes::between(start, start + Duration::from_secs(29)),
            Minutes::new(0),
        );
        assert_eq!(
            Minutes::between(start, start + Duration::from_secs(30)),
            Minutes::new(1),
        );
        assert_eq!(
            Minutes::between(start, start + Duration::from_secs(89)),
            Minutes::new(1),
        );
        assert_eq!(
            Minutes::between(start, start + Duration::from_secs(90)),
            Minutes::new(2),
        );
        assert_eq!(
            Minutes::between(start, start + Duration::from_secs(9 * 3600)),
            Minutes::new(540),
        );
    }

    #[test]
    fn negative_when_reversed() {
        let start = base();
        let end = start + Duration::from_secs(90);

        assert_eq!(Minutes::between(end, start), Minutes::new(-2));
        assert!(Minutes::between(end, start).is_negative());
    }

    #[test]
    fn sums() {
        let total: Minutes =
            [15, 30, 5].into_iter().map(Minutes::new).sum();

        assert_eq!(total, Minutes::new(50));
        assert_eq!(total - Minutes::new(20), Minutes::new(30));
    }
}
