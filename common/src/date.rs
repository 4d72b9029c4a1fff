//! Calendar [`Date`] definitions.

use std::{fmt, str::FromStr};

use derive_more::{Display, Error, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use time::{
    format_description::{well_known::Rfc3339, FormatItem},
    macros::format_description,
    OffsetDateTime,
};

pub use time::UtcOffset;

/// Format of a [`Date`] in its string representation.
const FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Calendar date without a time zone.
///
/// Comparisons between [`Date`]s are day-granular: no time of day is ever
/// involved.
#[derive(Clone, Copy, Eq, From, Hash, Into, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Date(time::Date);

impl Date {
    /// Returns the current UTC [`Date`].
    #[must_use]
    pub fn today() -> Self {
        Self(OffsetDateTime::now_utc().date())
    }

    /// Returns the current [`Date`] in the time zone of the provided
    /// [`UtcOffset`].
    #[must_use]
    pub fn today_at(offset: UtcOffset) -> Self {
        Self::of(OffsetDateTime::now_utc(), offset)
    }

    /// Returns the [`Date`] the provided moment falls on at the provided
    /// [`UtcOffset`].
    fn of(moment: OffsetDateTime, offset: UtcOffset) -> Self {
        Self(moment.to_offset(offset).date())
    }

    /// Parses a [`Date`] out of either a `YYYY-MM-DD` string or an
    /// [RFC 3339] date and time.
    ///
    /// A date and time is reduced to the calendar date in its own offset, so
    /// `2025-03-01T00:00:00+01:00` is `2025-03-01` rather than the previous
    /// day in UTC.
    ///
    /// # Errors
    ///
    /// If the input is neither of the supported formats.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let input = input.trim();
        if let Ok(d) = time::Date::parse(input, FORMAT) {
            return Ok(Self(d));
        }
        OffsetDateTime::parse(input, &Rfc3339)
            .map(|dt| Self(dt.date()))
            .map_err(ParseError)
    }

    /// Returns the number of days from this [`Date`] until the `other` one.
    ///
    /// Negative if the `other` [`Date`] precedes this one.
    #[must_use]
    pub fn days_until(self, other: Self) -> i64 {
        (other.0 - self.0).whole_days()
    }
}

impl fmt::Debug for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Date({self})")
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0.format(FORMAT).map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}

impl FromStr for Date {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Error of parsing a [`Date`] from a string.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("invalid date: {_0}")]
pub struct ParseError(time::error::Parse);

#[cfg(feature = "serde")]
mod serde {
    //! Module providing integration with [`serde`] crate.

    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    use super::Date;

    impl Serialize for Date {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            s.collect_str(self)
        }
    }

    impl<'de> Deserialize<'de> for Date {
        fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
            let s = String::deserialize(d)?;
            Self::parse(&s).map_err(de::Error::custom)
        }
    }
}
