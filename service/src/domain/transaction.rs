//! [`Transaction`] definitions.

use std::str::FromStr;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{AsRef, Display, Error, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::booking::{self, guest};

/// Payment attempt for a [`BookingRequest`] through a payment gateway.
///
/// [`BookingRequest`]: crate::domain::BookingRequest
#[derive(Clone, Debug)]
pub struct Transaction {
    /// ID of this [`Transaction`].
    pub id: Id,

    /// Internally generated [`Reference`] of this [`Transaction`].
    pub reference: Reference,

    /// [`Reference`] the payment gateway knows this [`Transaction`] by.
    pub gateway_reference: Reference,

    /// Access code of the payment gateway checkout.
    pub access_code: String,

    /// ID of the paid [`BookingRequest`].
    ///
    /// [`BookingRequest`]: crate::domain::BookingRequest
    pub booking_request_id: booking::Id,

    /// [`Kind`] of this [`Transaction`].
    pub kind: Kind,

    /// Amount to be paid.
    pub amount: Money,

    /// [`Customer`] paying.
    pub customer: Customer,

    /// [`Status`] of this [`Transaction`].
    pub status: Status,

    /// Status reported by the payment gateway, if any.
    pub gateway_status: Option<String>,

    /// Reason of this [`Transaction`] failing, if it did.
    pub failure_reason: Option<String>,

    /// Raw payment gateway response of the last verification.
    pub gateway_response: Option<serde_json::Value>,

    /// [`DateTime`] when this [`Transaction`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Transaction`] was settled, if it was.
    pub settled_at: Option<SettlementDateTime>,
}

impl Transaction {
    /// Settles this [`Transaction`] as [`Status::Success`].
    ///
    /// # Errors
    ///
    /// If this [`Transaction`] is settled already.
    pub fn succeed(
        &mut self,
        gateway_status: String,
        gateway_response: serde_json::Value,
    ) -> Result<(), AlreadySettled> {
        self.settle(Status::Success)?;
        self.gateway_status = Some(gateway_status);
        self.gateway_response = Some(gateway_response);
        Ok(())
    }

    /// Settles this [`Transaction`] as [`Status::Failed`] with the provided
    /// `reason`.
    ///
    /// # Errors
    ///
    /// If this [`Transaction`] is settled already.
    pub fn fail(
        &mut self,
        reason: String,
        gateway_status: Option<String>,
        gateway_response: Option<serde_json::Value>,
    ) -> Result<(), AlreadySettled> {
        self.settle(Status::Failed)?;
        self.failure_reason = Some(reason);
        self.gateway_status = gateway_status;
        self.gateway_response = gateway_response;
        Ok(())
    }

    /// Moves this [`Transaction`] into the provided terminal [`Status`].
    fn settle(&mut self, status: Status) -> Result<(), AlreadySettled> {
        if self.status != Status::Pending {
            return Err(AlreadySettled(self.status));
        }
        self.status = status;
        self.settled_at = Some(SettlementDateTime::now());
        Ok(())
    }
}

/// ID of a [`Transaction`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    derive_more::FromStr,
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

/// Globally unique reference of a [`Transaction`].
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize,
)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Reference(String);

impl Reference {
    /// Prefix of generated [`Reference`]s.
    const PREFIX: &'static str = "BK-";

    /// Generates a new unique [`Reference`].
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{}{}", Self::PREFIX, Uuid::new_v4().simple()))
    }

    /// Creates a new [`Reference`] if the given `reference` is valid.
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Option<Self> {
        let reference = reference.into();
        Self::check(&reference).then_some(Self(reference))
    }

    /// Checks whether the given `reference` is a valid [`Reference`].
    fn check(reference: impl AsRef<str>) -> bool {
        let reference = reference.as_ref();
        (1..=100).contains(&reference.len())
            && reference
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b"-._=".contains(&b))
    }
}

impl FromStr for Reference {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Reference`")
    }
}

/// Snapshot of a paying [`Guest`].
///
/// [`Guest`]: crate::domain::Guest
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Customer {
    /// [`guest::Email`] of this [`Customer`].
    pub email: guest::Email,

    /// [`guest::Name`] of this [`Customer`].
    pub name: guest::Name,

    /// [`guest::Phone`] of this [`Customer`].
    pub phone: guest::Phone,
}

define_kind! {
    #[doc = "Kind of a `Transaction`."]
    enum Kind {
        #[doc = "Full price is paid."]
        Full = 1,

        #[doc = "Only a deposit is paid upfront."]
        Deposit = 2,
    }
}

define_kind! {
    #[doc = "Status of a `Transaction`."]
    enum Status {
        #[doc = "Awaiting settlement."]
        Pending = 1,

        #[doc = "Paid."]
        Success = 2,

        #[doc = "Not paid."]
        Failed = 3,
    }
}

/// Error of settling an already settled [`Transaction`].
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("`Transaction` is settled already as `{_0}`")]
pub struct AlreadySettled(#[error(not(source))] pub Status);

/// [`DateTime`] when a [`Transaction`] was created.
pub type CreationDateTime = DateTimeOf<(Transaction, unit::Creation)>;

/// [`DateTime`] when a [`Transaction`] was settled.
pub type SettlementDateTime = DateTimeOf<(Transaction, unit::Modification)>;

/// [`DateTime`] when a pending [`Transaction`] was last verified without
/// being settled.
pub type CheckDateTime = DateTimeOf<(Transaction, unit::Verification)>;

#[cfg(test)]
pub(crate) mod spec {
    use std::str::FromStr as _;

    use common::{DateTimeOf, Money};
    use serde_json::json;

    use crate::domain::booking::{self, guest};

    use super::{Customer, Id, Kind, Reference, Status, Transaction};

    pub(crate) fn pending() -> Transaction {
        let reference = Reference::generate();
        Transaction {
            id: Id::new(),
            gateway_reference: reference.clone(),
            reference,
            access_code: "ac_123".into(),
            booking_request_id: booking::Id::new(),
            kind: Kind::Full,
            amount: Money::from_str("90000NGN").unwrap(),
            customer: Customer {
                email: guest::Email::new("ada@example.com").unwrap(),
                name: guest::Name::new("Ada Obi").unwrap(),
                phone: guest::Phone::new("+2348012345678").unwrap(),
            },
            status: Status::Pending,
            gateway_status: None,
            failure_reason: None,
            gateway_response: None,
            created_at: DateTimeOf::now(),
            settled_at: None,
        }
    }

    #[test]
    fn generates_unique_references() {
        let a = Reference::generate();
        let b = Reference::generate();

        assert_ne!(a, b);
        assert!(a.to_string().starts_with("BK-"));
        assert_eq!(Reference::new(a.to_string()), Some(a));
        assert!(Reference::new("").is_none());
        assert!(Reference::new("bad ref").is_none());
    }

    #[test]
    fn settles_once() {
        let mut tx = pending();

        tx.succeed("success".into(), json!({"status": "success"}))
            .unwrap();
        assert_eq!(tx.status, Status::Success);
        assert!(tx.settled_at.is_some());

        assert!(tx.fail("declined".into(), None, None).is_err());
        assert!(tx.succeed("success".into(), json!({})).is_err());
        assert_eq!(tx.status, Status::Success);
        assert_eq!(tx.failure_reason, None);
    }

    #[test]
    fn records_failure_reason() {
        let mut tx = pending();

        tx.fail("Declined".into(), Some("failed".into()), None).unwrap();
        assert_eq!(tx.status, Status::Failed);
        assert_eq!(tx.failure_reason.as_deref(), Some("Declined"));
    }
}
