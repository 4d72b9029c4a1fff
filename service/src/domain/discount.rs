//! [`DiscountCode`] definitions.

use std::str::FromStr;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money, Percent};
use derive_more::{AsRef, Display, Error};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::booking::{self, guest};

/// Promotional code reducing the price of a booking.
#[derive(Clone, Debug)]
pub struct DiscountCode {
    /// [`Code`] of this [`DiscountCode`].
    pub code: Code,

    /// [`Value`] of this [`DiscountCode`].
    pub value: Value,

    /// Upper bound of the discount amount, in the currency of the discounted
    /// total.
    pub max_discount: Option<Decimal>,

    /// Minimum number of nights a stay should last to be discounted.
    pub minimum_stay_days: u32,

    /// Indicator whether this [`DiscountCode`] may be used at all.
    pub is_active: bool,

    /// [`DateTime`] when this [`DiscountCode`] expires, if ever.
    pub expires_at: Option<ExpirationDateTime>,

    /// Maximum number of [`Usage`]s, if limited.
    pub usage_limit: Option<u32>,

    /// [`Usage`]s of this [`DiscountCode`] so far.
    pub usages: Vec<Usage>,

    /// [`DateTime`] when this [`DiscountCode`] was created.
    pub created_at: CreationDateTime,
}

impl DiscountCode {
    /// Evaluates this [`DiscountCode`] against the provided order.
    ///
    /// Pure: nothing is recorded, so evaluating twice gives the same result.
    /// Checks go in order and the first failing one wins.
    ///
    /// # Errors
    ///
    /// With a [`Rejection`] describing the first failed check.
    pub fn evaluate(
        &self,
        total: Money,
        nights: u32,
        user: &UserId,
        now: DateTimeOf,
    ) -> Result<Application, Rejection> {
        if !self.is_active {
            return Err(Rejection::Inactive);
        }
        if self.expires_at.is_some_and(|exp| exp.coerce::<()>() <= now) {
            return Err(Rejection::Expired);
        }
        if self.usage_limit.is_some_and(|limit| self.usage_count() >= limit) {
            return Err(Rejection::UsageLimitReached);
        }
        if nights < self.minimum_stay_days {
            return Err(Rejection::MinimumStayNotMet {
                required: self.minimum_stay_days,
            });
        }
        if self.is_used_by(user) {
            return Err(Rejection::AlreadyUsed);
        }

        let discount = match self.value {
            Value::Percentage(percent) => {
                let amount = percent.of(total);
                self.max_discount.map_or(amount, |max| {
                    amount.min(Money {
                        amount: max,
                        currency: total.currency,
                    })
                })
            }
            Value::Fixed(amount) => Money {
                amount,
                currency: total.currency,
            },
        };
        let discount = discount.min(total).round();

        Ok(Application {
            code: self.code.clone(),
            value: self.value,
            discount,
            final_amount: total.saturating_sub(discount).round(),
        })
    }

    /// Records a [`Usage`] of this [`DiscountCode`] by the provided `user`.
    ///
    /// # Errors
    ///
    /// With [`Rejection::AlreadyUsed`] if the `user` has used this
    /// [`DiscountCode`] before.
    pub fn redeem(
        &mut self,
        user: UserId,
        order: OrderId,
    ) -> Result<(), Rejection> {
        if self.is_used_by(&user) {
            return Err(Rejection::AlreadyUsed);
        }
        self.usages.push(Usage {
            user_id: user,
            order_id: order,
            used_at: DateTimeOf::now(),
        });
        Ok(())
    }

    /// Indicates whether the provided `user` has already used this
    /// [`DiscountCode`].
    #[must_use]
    pub fn is_used_by(&self, user: &UserId) -> bool {
        self.usages.iter().any(|u| &u.user_id == user)
    }

    /// Indicates whether the provided `user` has already used this
    /// [`DiscountCode`] for the provided `order`.
    #[must_use]
    pub fn is_used_for(&self, user: &UserId, order: &OrderId) -> bool {
        self.usages
            .iter()
            .any(|u| &u.user_id == user && &u.order_id == order)
    }

    /// Returns the number of [`Usage`]s of this [`DiscountCode`].
    #[must_use]
    pub fn usage_count(&self) -> u32 {
        u32::try_from(self.usages.len()).unwrap_or(u32::MAX)
    }
}

/// Value of a [`DiscountCode`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Value {
    /// Percentage of the total.
    Percentage(Percent),

    /// Fixed amount in the currency of the total.
    Fixed(Decimal),
}

impl Value {
    /// Returns the [`Kind`] of this [`Value`].
    #[must_use]
    pub const fn kind(&self) -> Kind {
        match self {
            Self::Percentage(_) => Kind::Percentage,
            Self::Fixed(_) => Kind::Fixed,
        }
    }

    /// Returns the raw number of this [`Value`].
    #[must_use]
    pub fn number(&self) -> Decimal {
        match self {
            Self::Percentage(p) => p.value(),
            Self::Fixed(v) => *v,
        }
    }

    /// Reassembles a [`Value`] out of its [`Kind`] and raw number.
    #[must_use]
    pub fn from_parts(kind: Kind, number: Decimal) -> Option<Self> {
        match kind {
            Kind::Percentage => Percent::new(number).map(Self::Percentage),
            Kind::Fixed => {
                (!number.is_sign_negative()).then_some(Self::Fixed(number))
            }
        }
    }
}

define_kind! {
    #[doc = "Kind of a `DiscountCode` value."]
    enum Kind {
        #[doc = "Percentage of the total."]
        Percentage = 1,

        #[doc = "Fixed amount."]
        Fixed = 2,
    }
}

/// Successful evaluation of a [`DiscountCode`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Application {
    /// [`Code`] of the applied [`DiscountCode`].
    pub code: Code,

    /// [`Value`] of the applied [`DiscountCode`].
    pub value: Value,

    /// Amount subtracted from the total.
    pub discount: Money,

    /// Amount left to pay.
    pub final_amount: Money,
}

/// Reason of a [`DiscountCode`] not being applicable.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum Rejection {
    /// [`DiscountCode`] doesn't exist.
    #[display("Invalid discount code")]
    NotFound,

    /// [`DiscountCode`] is switched off.
    #[display("Discount code is not active")]
    Inactive,

    /// [`DiscountCode`] has expired.
    #[display("Discount code has expired")]
    Expired,

    /// [`DiscountCode`] has been used the maximum number of times.
    #[display("Discount code usage limit reached")]
    UsageLimitReached,

    /// Stay is too short for the [`DiscountCode`].
    #[display("Minimum stay of {required} nights required")]
    MinimumStayNotMet {
        /// Required number of nights.
        required: u32,
    },

    /// [`UserId`] has already used the [`DiscountCode`].
    #[display("You have already used this discount code")]
    AlreadyUsed,
}

/// Record of a [`DiscountCode`] being used.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Usage {
    /// [`UserId`] who used the [`DiscountCode`].
    pub user_id: UserId,

    /// [`OrderId`] the [`DiscountCode`] was used for.
    pub order_id: OrderId,

    /// [`DateTime`] when the [`DiscountCode`] was used.
    pub used_at: UsageDateTime,
}

/// Case-insensitive code of a [`DiscountCode`], stored in upper case.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq, Serialize)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Code(String);

impl Code {
    /// Length of every [`Code`].
    pub const LENGTH: usize = 6;

    /// Creates a new [`Code`] if the given `code` is valid, normalizing it to
    /// upper case.
    #[must_use]
    pub fn new(code: impl AsRef<str>) -> Option<Self> {
        let code = code.as_ref().trim().to_ascii_uppercase();
        Self::check(&code).then_some(Self(code))
    }

    /// Checks whether the given `code` is a valid [`Code`].
    fn check(code: impl AsRef<str>) -> bool {
        let code = code.as_ref();
        code.len() == Self::LENGTH
            && code.bytes().all(|b| b.is_ascii_alphanumeric())
    }
}

impl FromStr for Code {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Code`")
    }
}

/// Identifier of a user redeeming a [`DiscountCode`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq, Serialize)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct UserId(String);

impl UserId {
    /// Creates a new [`UserId`] if the given `id` is valid.
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Option<Self> {
        let id = id.as_ref().trim();
        Self::check(id).then(|| Self(id.to_owned()))
    }

    /// Checks whether the given `id` is a valid [`UserId`].
    fn check(id: impl AsRef<str>) -> bool {
        let id = id.as_ref();
        !id.is_empty() && id.len() <= 320
    }
}

impl From<&guest::Email> for UserId {
    fn from(email: &guest::Email) -> Self {
        Self(email.to_string())
    }
}

impl FromStr for UserId {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `UserId`")
    }
}

/// Identifier of an order a [`DiscountCode`] was redeemed for.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq, Serialize)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct OrderId(String);

impl OrderId {
    /// Creates a new [`OrderId`] if the given `id` is valid.
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Option<Self> {
        let id = id.as_ref().trim();
        (!id.is_empty() && id.len() <= 128).then(|| Self(id.to_owned()))
    }
}

impl From<booking::Id> for OrderId {
    fn from(id: booking::Id) -> Self {
        Self(id.to_string())
    }
}

impl FromStr for OrderId {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `OrderId`")
    }
}

/// [`DateTime`] when a [`DiscountCode`] was created.
pub type CreationDateTime = DateTimeOf<(DiscountCode, unit::Creation)>;

/// [`DateTime`] when a [`DiscountCode`] expires.
pub type ExpirationDateTime = DateTimeOf<(DiscountCode, unit::Expiration)>;

/// [`DateTime`] when a [`DiscountCode`] was used.
pub type UsageDateTime = DateTimeOf<(Usage, unit::Creation)>;

#[cfg(test)]
pub(crate) mod spec {
    use std::{str::FromStr as _, time::Duration};

    use common::{DateTime, DateTimeOf, Money, Percent};
    use rust_decimal::Decimal;

    use super::{
        Application, Code, DiscountCode, OrderId, Rejection, UserId, Value,
    };

    pub(crate) fn save10() -> DiscountCode {
        DiscountCode {
            code: Code::new("save10").unwrap(),
            value: Value::Percentage(Percent::from_str("10").unwrap()),
            max_discount: None,
            minimum_stay_days: 3,
            is_active: true,
            expires_at: None,
            usage_limit: None,
            usages: vec![],
            created_at: DateTimeOf::now(),
        }
    }

    fn ngn(s: &str) -> Money {
        Money::from_str(&format!("{s}NGN")).unwrap()
    }

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[test]
    fn applies_percentage() {
        let applied = save10()
            .evaluate(
                ngn("100000"),
                4,
                &user("ada@example.com"),
                DateTime::now(),
            )
            .unwrap();

        assert_eq!(AsRef::<str>::as_ref(&applied.code), "SAVE10");
        assert_eq!(applied.discount, ngn("10000"));
        assert_eq!(applied.final_amount, ngn("90000"));
    }

    #[test]
    fn evaluation_is_pure() {
        let code = save10();
        let now = DateTime::now();
        let eval = |c: &DiscountCode| -> Result<Application, Rejection> {
            c.evaluate(ngn("100000"), 4, &user("ada@example.com"), now)
        };

        assert_eq!(eval(&code), eval(&code));
        assert!(code.usages.is_empty());
    }

    #[test]
    fn caps_discount() {
        let mut code = save10();
        code.max_discount = Some(Decimal::from(5000));
        let applied = code
            .evaluate(ngn("100000"), 4, &user("ada"), DateTime::now())
            .unwrap();
        assert_eq!(applied.discount, ngn("5000"));
        assert_eq!(applied.final_amount, ngn("95000"));

        code.value = Value::Fixed(Decimal::from(250_000));
        code.max_discount = None;
        let applied = code
            .evaluate(ngn("100000"), 4, &user("ada"), DateTime::now())
            .unwrap();
        assert_eq!(applied.discount, ngn("100000"));
        assert_eq!(applied.final_amount, ngn("0"));
    }

    #[test]
    fn rounds_to_minor_units() {
        let mut code = save10();
        code.value = Value::Percentage(Percent::from_str("12.5").unwrap());

        let applied = code
            .evaluate(ngn("999.99"), 4, &user("ada"), DateTime::now())
            .unwrap();
        assert_eq!(applied.discount, ngn("125.00"));
        assert_eq!(applied.final_amount, ngn("874.99"));
    }

    #[test]
    fn checks_in_order() {
        let now = DateTime::now();
        let ada = user("ada");
        let mut code = save10();
        code.is_active = false;
        code.expires_at = Some((now - Duration::from_secs(60)).coerce());
        code.usage_limit = Some(0);

        let eval = |c: &DiscountCode, nights| {
            c.evaluate(ngn("100000"), nights, &ada, now)
        };

        assert_eq!(eval(&code, 1), Err(Rejection::Inactive));
        code.is_active = true;
        assert_eq!(eval(&code, 1), Err(Rejection::Expired));
        code.expires_at = Some((now + Duration::from_secs(60)).coerce());
        assert_eq!(eval(&code, 1), Err(Rejection::UsageLimitReached));
        code.usage_limit = Some(1);
        assert_eq!(
            eval(&code, 1),
            Err(Rejection::MinimumStayNotMet { required: 3 }),
        );
        code.redeem(ada.clone(), OrderId::new("order-1").unwrap())
            .unwrap();
        code.usage_limit = None;
        assert_eq!(eval(&code, 3), Err(Rejection::AlreadyUsed));
        assert!(eval(&code, 3).is_err());
        assert!(code
            .evaluate(ngn("100000"), 3, &user("obi"), now)
            .is_ok());
    }

    #[test]
    fn redeems_once_per_user() {
        let mut code = save10();
        let order = OrderId::new("order-1").unwrap();

        assert!(code.redeem(user("ada"), order.clone()).is_ok());
        assert_eq!(
            code.redeem(user("ada"), order.clone()).unwrap_err(),
            Rejection::AlreadyUsed,
        );
        assert!(code.redeem(user("obi"), order).is_ok());
        assert_eq!(code.usage_count(), 2);
    }

    #[test]
    fn tells_usage_per_order() {
        let mut code = save10();
        let order = OrderId::new("order-1").unwrap();
        code.redeem(user("ada"), order.clone()).unwrap();

        assert!(code.is_used_for(&user("ada"), &order));
        assert!(!code.is_used_for(&user("obi"), &order));
        assert!(!code
            .is_used_for(&user("ada"), &OrderId::new("order-2").unwrap()));
    }

    #[test]
    fn codes_are_case_insensitive() {
        assert_eq!(Code::new("Save10"), Code::new("SAVE10"));
        assert!(Code::new("SAVE1").is_none());
        assert!(Code::new("SAVE-1").is_none());
        assert!(Code::new("SAVE100").is_none());
    }
}
