//! [`Money`]-related definitions.

use std::{fmt, ops, str::FromStr};

use rust_decimal::{prelude::ToPrimitive as _, Decimal, RoundingStrategy};

use crate::define_kind;

/// Amount of money in some [`Currency`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Money {
    /// Amount of this [`Money`] in major units of the [`Currency`].
    pub amount: Decimal,

    /// [`Currency`] of this amount.
    pub currency: Currency,
}

impl Money {
    /// Number of minor units in a single major unit of any [`Currency`].
    pub const MINOR_UNITS: i64 = 100;

    /// Creates a zero [`Money`] amount in the provided [`Currency`].
    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Creates a new [`Money`] out of the provided amount of minor units
    /// (kobo, cents).
    #[must_use]
    pub fn from_minor_units(units: i64, currency: Currency) -> Self {
        Self {
            amount: Decimal::new(units, 2),
            currency,
        }
    }

    /// Returns this [`Money`] rounded to the nearest minor unit.
    ///
    /// Midpoints are rounded away from zero.
    #[must_use]
    pub fn round(self) -> Self {
        Self {
            amount: self.amount.round_dp_with_strategy(
                2,
                RoundingStrategy::MidpointAwayFromZero,
            ),
            currency: self.currency,
        }
    }

    /// Returns the amount of minor units in this [`Money`], after rounding it
    /// to the nearest one.
    ///
    /// [`None`] is returned if the amount doesn't fit into [`i64`].
    #[must_use]
    pub fn minor_units(self) -> Option<i64> {
        (self.round().amount * Decimal::from(Self::MINOR_UNITS)).to_i64()
    }

    /// Indicates whether this [`Money`] amount is negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    /// Returns the lesser of this and the `other` [`Money`] amount.
    ///
    /// # Panics
    ///
    /// If the [`Currency`]s differ.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        assert_eq!(self.currency, other.currency, "currency mismatch");
        if other.amount < self.amount {
            other
        } else {
            self
        }
    }

    /// Subtracts the `other` [`Money`] from this one, flooring the result at
    /// zero.
    ///
    /// # Panics
    ///
    /// If the [`Currency`]s differ.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        let diff = self - other;
        if diff.is_negative() {
            Self::zero(self.currency)
        } else {
            diff
        }
    }
}

impl ops::Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        assert_eq!(self.currency, rhs.currency, "currency mismatch");
        Self {
            amount: self.amount + rhs.amount,
            currency: self.currency,
        }
    }
}

impl ops::Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        assert_eq!(self.currency, rhs.currency, "currency mismatch");
        Self {
            amount: self.amount - rhs.amount,
            currency: self.currency,
        }
    }
}

impl ops::Mul<Decimal> for Money {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self {
            amount: self.amount * rhs,
            currency: self.currency,
        }
    }
}

impl ops::Div<Decimal> for Money {
    type Output = Self;

    fn div(self, rhs: Decimal) -> Self::Output {
        Self {
            amount: self.amount / rhs,
            currency: self.currency,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { amount, currency } = self;
        if amount.is_integer() {
            write!(f, "{}{currency}", amount.to_i128().expect("integer"))
        } else {
            write!(f, "{amount}{currency}")
        }
    }
}

impl FromStr for Money {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() < 4 {
            return Err("too short");
        }

        let (amount, currency) = s.split_at(s.len() - 3);
        let amount = Decimal::from_str(amount).map_err(|_| "invalid amount")?;
        let currency =
            Currency::from_str(currency).map_err(|_| "invalid currency")?;

        Ok(Self { amount, currency })
    }
}

define_kind! {
    #[doc = "Currency of a [`Money`] amount."]
    enum Currency {
        #[doc = "Nigerian Naira."]
        Ngn = 1,

        #[doc = "US Dollar."]
        Usd = 2,

        #[doc = "Ghanaian Cedi."]
        Ghs = 3,
    }
}

impl Currency {
    /// Returns the ISO 4217 code of this [`Currency`].
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Ngn => "NGN",
            Self::Usd => "USD",
            Self::Ghs => "GHS",
        }
    }
}

#[cfg(feature = "serde")]
mod serde {
    //! Module providing integration with [`serde`] crate.

    use std::str::FromStr as _;

    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    use super::Money;

    impl Serialize for Money {
        fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
            s.collect_str(self)
        }
    }

    impl<'de> Deserialize<'de> for Money {
        fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
            let s = String::deserialize(d)?;
            Self::from_str(&s).map_err(de::Error::custom)
        }
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use super::{Currency, Money};

    fn decimal(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn ngn(s: &str) -> Money {
        Money {
            amount: decimal(s),
            currency: Currency::Ngn,
        }
    }

    #[test]
    fn from_str() {
        assert_eq!(Money::from_str("123.45NGN").unwrap(), ngn("123.45"));
        assert_eq!(
            Money::from_str("123.45USD").unwrap(),
            Money {
                amount: decimal("123.45"),
                currency: Currency::Usd,
            },
        );

        assert!(Money::from_str("123.45").is_err());
        assert!(Money::from_str("123.45Ng").is_err());
        assert!(Money::from_str("123.45Naira").is_err());

        assert!(Money::from_str("123.00NGN").is_ok());
        assert!(Money::from_str("123NGN").is_ok());
    }

    #[test]
    fn to_string() {
        assert_eq!(ngn("123.45").to_string(), "123.45NGN");
        assert_eq!(ngn("123.00").to_string(), "123NGN");
        assert_eq!(ngn("123").to_string(), "123NGN");
    }

    #[test]
    fn rounds_to_minor_units() {
        assert_eq!(ngn("10.005").round(), ngn("10.01"));
        assert_eq!(ngn("10.004").round(), ngn("10.00"));
        assert_eq!(ngn("90000").minor_units(), Some(9_000_000));
        assert_eq!(ngn("0.125").minor_units(), Some(13));
        assert_eq!(
            Money::from_minor_units(9_000_050, Currency::Ngn),
            ngn("90000.50"),
        );
    }

    #[test]
    fn saturating_sub_floors_at_zero() {
        assert_eq!(ngn("100").saturating_sub(ngn("30")), ngn("70"));
        assert_eq!(ngn("100").saturating_sub(ngn("130")), ngn("0"));
        assert!(!ngn("0").is_negative());
        assert!((ngn("1") - ngn("2")).is_negative());
    }
}
