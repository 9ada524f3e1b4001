//! [`Hours`] definitions.

use std::{fmt, iter, ops};

use rust_decimal::{prelude::ToPrimitive as _, Decimal, RoundingStrategy};

use crate::Minutes;

/// Number of hours with a two-decimal precision, e.g. `8.25`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Hours(Decimal);

impl Hours {
    /// Zero [`Hours`].
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Converts the provided [`Minutes`] into [`Hours`], rounded to two
    /// decimal places with halves rounded away from zero.
    #[must_use]
    pub fn from_minutes(minutes: Minutes) -> Self {
        Self::rounded(Decimal::from(minutes.get()) / Decimal::from(60))
    }

    /// Returns the arithmetic mean of the provided [`Hours`].
    ///
    /// [`Hours::ZERO`] is returned if there is nothing to average.
    #[must_use]
    pub fn average<I>(hours: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let (count, total) = hours
            .into_iter()
            .fold((0_u32, Decimal::ZERO), |(n, sum), h| (n + 1, sum + h.0));
        if count == 0 {
            return Self::ZERO;
        }
        Self::rounded(total / Decimal::from(count))
    }

    /// Returns the inner [`Decimal`] value.
    #[must_use]
    pub const fn get(self) -> Decimal {
        self.0
    }

    /// Rounds the provided [`Decimal`] into [`Hours`].
    fn rounded(value: Decimal) -> Self {
        Self(value.round_dp_with_strategy(
            2,
            RoundingStrategy::MidpointAwayFromZero,
        ))
    }
}

impl fmt::Display for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl ops::Add for Hours {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl iter::Sum for Hours {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, ops::Add::add)
    }
}

impl From<Hours> for f64 {
    fn from(hours: Hours) -> Self {
        hours.0.to_f64().unwrap_or_default()
    }
}

#[cfg(feature = "postgres")]
mod postgres {
    //! Module providing integration with [`postgres_types`] crate.

    use std::error::Error as StdError;

    use postgres_types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    };
    use rust_decimal::Decimal;

    use super::Hours;

    impl FromSql<'_> for Hours {
        accepts!(NUMERIC);

        fn from_sql(
            ty: &Type,
            raw: &[u8],
        ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
            Decimal::from_sql(ty, raw).map(Self::rounded)
        }
    }

    impl ToSql for Hours {
        accepts!(NUMERIC);
        to_sql_checked!();

        fn to_sql(
            &self,
            ty: &Type,
            w: &mut BytesMut,
        ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
            self.0.to_sql(ty, w)
        }
    }
}

mod serde {
    //! Module providing integration with [`serde`] crate.
    //!
    //! [`Hours`] are represented as a JSON number.

    use rust_decimal::Decimal;
    use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

    use super::Hours;

    impl Serialize for Hours {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            s.serialize_f64((*self).into())
        }
    }

    impl<'de> Deserialize<'de> for Hours {
        fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
            let raw = f64::deserialize(d)?;
            Decimal::try_from(raw)
                .map(Hours::rounded)
                .map_err(D::Error::custom)
        }
    }
}

#[cfg(test)]
mod spec {
    use super::Hours;
    use crate::Minutes;

    fn hours(s: &str) -> Hours {
        Hours(s.parse().unwrap())
    }

    #[test]
    fn converts_from_minutes() {
        assert_eq!(Hours::from_minutes(Minutes::new(480)), hours("8"));
        assert_eq!(Hours::from_minutes(Minutes::new(495)), hours("8.25"));
        assert_eq!(Hours::from_minutes(Minutes::new(500)), hours("8.33"));
        assert_eq!(Hours::from_minutes(Minutes::new(1)), hours("0.02"));
        assert_eq!(Hours::from_minutes(Minutes::ZERO), Hours::ZERO);
    }

    #[test]
    fn averages() {
        let all = [hours("8"), hours("7.5"), hours("6.25")];

        assert_eq!(all.into_iter().sum::<Hours>(), hours("21.75"));
        assert_eq!(Hours::average(all), hours("7.25"));
        assert_eq!(Hours::average([]), Hours::ZERO);
    }

    #[test]
    fn displays_two_decimals() {
        assert_eq!(Hours::from_minutes(Minutes::new(540)).to_string(), "9.00");
        assert_eq!(hours("8.3").to_string(), "8.30");
    }

    #[test]
    fn serializes_as_number() {
        let json = serde_json::to_string(&hours("8.25")).unwrap();

        assert_eq!(json, "8.25");
        assert_eq!(serde_json::from_str::<Hours>("8.25").unwrap(), hours("8.25"));
    }
}
