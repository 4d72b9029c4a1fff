//! [`BookingRequest`] definitions.

pub mod guest;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{discount, property, tenant, Stay};

pub use self::guest::Guest;

/// Prospective booking of a property, submitted by a [`Guest`] before paying.
///
/// [`Guest`] and [`StayDetails`] are snapshots, so they stay stable even if
/// the property listing changes later.
#[derive(Clone, Debug)]
pub struct BookingRequest {
    /// ID of this [`BookingRequest`].
    pub id: Id,

    /// ID of the booked property.
    pub property_id: property::Id,

    /// [`Guest`] who submitted this [`BookingRequest`].
    pub guest: Guest,

    /// [`StayDetails`] of this [`BookingRequest`].
    pub stay: StayDetails,

    /// [`AppliedDiscount`] of this [`BookingRequest`], if any.
    pub discount: Option<AppliedDiscount>,

    /// [`Status`] of this [`BookingRequest`].
    pub status: Status,

    /// ID of the [`Tenant`] this [`BookingRequest`] was converted to.
    ///
    /// [`Tenant`]: crate::domain::Tenant
    pub converted_to_tenant: Option<tenant::Id>,

    /// Audit log of this [`BookingRequest`].
    pub communications: Vec<Communication>,

    /// [`DateTime`] when this [`BookingRequest`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`BookingRequest`] was last modified.
    pub updated_at: ModificationDateTime,
}

impl BookingRequest {
    /// Moves this [`BookingRequest`] into the `next` [`Status`].
    ///
    /// # Errors
    ///
    /// If the [`Status`] machine doesn't allow such transition. This
    /// [`BookingRequest`] stays untouched then.
    pub fn transition(
        &mut self,
        next: Status,
    ) -> Result<(), InvalidTransition> {
        if !self.status.can_become(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = ModificationDateTime::now();
        Ok(())
    }

    /// Appends the provided `message` to the audit log of this
    /// [`BookingRequest`].
    pub fn note(&mut self, message: impl Into<String>) {
        self.communications.push(Communication {
            message: message.into(),
            created_at: DateTimeOf::now(),
        });
        self.updated_at = ModificationDateTime::now();
    }
}

/// ID of a [`BookingRequest`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
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

/// Priced [`Stay`] of a [`BookingRequest`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StayDetails {
    /// Booked [`Stay`].
    pub stay: Stay,

    /// Number of [`Guests`].
    pub guests: Guests,

    /// Price of a single night.
    pub price_per_night: Money,

    /// Price of all the nights before any discount.
    pub subtotal: Money,

    /// Amount to be paid.
    pub total: Money,
}

impl StayDetails {
    /// Prices the provided [`Stay`] at the given `price_per_night`.
    #[must_use]
    pub fn new(stay: Stay, guests: Guests, price_per_night: Money) -> Self {
        let subtotal =
            (price_per_night * Decimal::from(stay.nights())).round();
        Self {
            stay,
            guests,
            price_per_night,
            subtotal,
            total: subtotal,
        }
    }

    /// Subtracts the provided `discount` from the subtotal of these
    /// [`StayDetails`].
    ///
    /// The total never goes below zero.
    #[must_use]
    pub fn discounted(self, discount: Money) -> Self {
        Self {
            total: self.subtotal.saturating_sub(discount).round(),
            ..self
        }
    }

    /// Returns the number of nights of these [`StayDetails`].
    #[must_use]
    pub fn nights(&self) -> u32 {
        self.stay.nights()
    }
}

/// Number of guests staying, at least one.
#[derive(Clone, Copy, Debug, Display, Eq, Into, PartialEq, Serialize)]
pub struct Guests(u16);

impl Guests {
    /// Creates new [`Guests`] if there is at least one.
    #[must_use]
    pub fn new(count: u16) -> Option<Self> {
        (count > 0).then_some(Self(count))
    }
}

#[cfg(feature = "postgres")]
mod guests_postgres {
    //! Module storing [`Guests`] as `INT2`.

    use std::error::Error as StdError;

    use postgres_types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    };

    use super::Guests;

    impl<'a> FromSql<'a> for Guests {
        accepts!(INT2);

        fn from_sql(
            ty: &Type,
            raw: &'a [u8],
        ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
            let count = u16::try_from(i16::from_sql(ty, raw)?)?;
            Self::new(count).ok_or_else(|| "zero `Guests`".into())
        }
    }

    impl ToSql for Guests {
        accepts!(INT2);
        to_sql_checked!();

        fn to_sql(
            &self,
            ty: &Type,
            w: &mut BytesMut,
        ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
            i16::try_from(self.0)?.to_sql(ty, w)
        }
    }
}

/// [`DiscountCode`] applied to a [`BookingRequest`].
///
/// [`DiscountCode`]: crate::domain::DiscountCode
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AppliedDiscount {
    /// Applied [`discount::Code`].
    pub code: discount::Code,

    /// Amount subtracted from the subtotal.
    pub amount: Money,
}

/// Timestamped entry of a [`BookingRequest`] audit log.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Communication {
    /// Human-readable message of this [`Communication`].
    pub message: String,

    /// [`DateTime`] when this [`Communication`] happened.
    pub created_at: DateTimeOf<(Communication, unit::Creation)>,
}

define_kind! {
    #[doc = "Status of a `BookingRequest`."]
    enum Status {
        #[doc = "Submitted and awaiting payment."]
        Pending = 1,

        #[doc = "Paid, tenancy not yet created."]
        Approved = 2,

        #[doc = "Tenancy created."]
        Converted = 3,

        #[doc = "Rejected by an administrator."]
        Rejected = 4,

        #[doc = "Cancelled."]
        Cancelled = 5,
    }
}

impl Status {
    /// Indicates whether this [`Status`] may be followed by the `next` one.
    ///
    /// A failed payment keeps a [`Status::Pending`] request pending, so that
    /// transition is allowed too.
    #[must_use]
    pub const fn can_become(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Pending | Self::Approved)
                | (Self::Approved, Self::Converted)
                | (
                    Self::Pending | Self::Approved,
                    Self::Rejected | Self::Cancelled,
                ),
        )
    }

    /// Indicates whether this [`Status`] is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Converted | Self::Rejected | Self::Cancelled)
    }
}

/// Error of an illegal [`Status`] transition.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("`BookingRequest` cannot go from `{from}` to `{to}`")]
pub struct InvalidTransition {
    /// Current [`Status`].
    #[error(not(source))]
    pub from: Status,

    /// Requested [`Status`].
    #[error(not(source))]
    pub to: Status,
}

/// [`DateTime`] when a [`BookingRequest`] was created.
pub type CreationDateTime = DateTimeOf<(BookingRequest, unit::Creation)>;

/// [`DateTime`] when a [`BookingRequest`] was last modified.
pub type ModificationDateTime =
    DateTimeOf<(BookingRequest, unit::Modification)>;

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use common::Money;

    use crate::domain::stay::spec::stay;

    use super::{Guests, Status, StayDetails};

    #[test]
    fn status_machine() {
        use Status as S;

        assert!(S::Pending.can_become(S::Approved));
        assert!(S::Pending.can_become(S::Pending));
        assert!(S::Approved.can_become(S::Converted));
        assert!(S::Pending.can_become(S::Cancelled));
        assert!(S::Approved.can_become(S::Rejected));

        assert!(!S::Pending.can_become(S::Converted));
        assert!(!S::Approved.can_become(S::Pending));
        for terminal in [S::Converted, S::Rejected, S::Cancelled] {
            assert!(terminal.is_terminal());
            for next in [
                S::Pending,
                S::Approved,
                S::Converted,
                S::Rejected,
                S::Cancelled,
            ] {
                assert!(!terminal.can_become(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn prices_stay() {
        let details = StayDetails::new(
            stay("2025-03-01", "2025-03-05"),
            Guests::new(2).unwrap(),
            Money::from_str("25000NGN").unwrap(),
        );

        assert_eq!(details.nights(), 4);
        assert_eq!(details.subtotal, Money::from_str("100000NGN").unwrap());
        assert_eq!(details.total, details.subtotal);

        let discounted =
            details.discounted(Money::from_str("10000NGN").unwrap());
        assert_eq!(discounted.total, Money::from_str("90000NGN").unwrap());

        let free = details.discounted(Money::from_str("150000NGN").unwrap());
        assert_eq!(free.total, Money::from_str("0NGN").unwrap());
    }

    #[test]
    fn guests_are_positive() {
        assert!(Guests::new(0).is_none());
        assert!(Guests::new(1).is_some());
    }
}
