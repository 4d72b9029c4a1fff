//! [`DiscountCode`]-related API definitions.
//!
//! [`DiscountCode`]: service::domain::DiscountCode

use axum::Extension;
use common::Money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, use_discount_code},
    domain::discount::{self, Application, Rejection},
    query, Command as _,
};

use crate::{api::Json, define_error, AsError, Error, Service};

define_error! {
    enum InvalidInput {
        #[code = "INVALID_DISCOUNT_CODE"]
        #[status = BAD_REQUEST]
        #[message = "Discount code must be 6 letters or digits"]
        Code,

        #[code = "INVALID_USER_ID"]
        #[status = BAD_REQUEST]
        #[message = "User ID is invalid"]
        UserId,

        #[code = "INVALID_ORDER_ID"]
        #[status = BAD_REQUEST]
        #[message = "Order ID is invalid"]
        OrderId,

        #[code = "INVALID_TOTAL_AMOUNT"]
        #[status = BAD_REQUEST]
        #[message = "Total amount must not be negative"]
        TotalAmount,
    }
}

/// Converts a [`Rejection`] of a discount code into an API [`Error`].
#[must_use]
pub fn rejection(reason: Rejection) -> Error {
    let (code, status) = match reason {
        Rejection::NotFound => {
            ("DISCOUNT_NOT_FOUND", http::StatusCode::NOT_FOUND)
        }
        Rejection::Inactive => {
            ("DISCOUNT_INACTIVE", http::StatusCode::BAD_REQUEST)
        }
        Rejection::Expired => {
            ("DISCOUNT_EXPIRED", http::StatusCode::BAD_REQUEST)
        }
        Rejection::UsageLimitReached => {
            ("DISCOUNT_USAGE_LIMIT_REACHED", http::StatusCode::BAD_REQUEST)
        }
        Rejection::MinimumStayNotMet { .. } => {
            ("DISCOUNT_MINIMUM_STAY_NOT_MET", http::StatusCode::BAD_REQUEST)
        }
        Rejection::AlreadyUsed => {
            ("DISCOUNT_ALREADY_USED", http::StatusCode::CONFLICT)
        }
    };
    Error::new(code, status, reason.to_string())
}

/// Body of a `POST /discount-codes/validate` request.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    /// Discount code to validate.
    pub code: String,

    /// Total amount of the order.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,

    /// Number of nights of the ordered stay.
    pub number_of_days: u32,

    /// ID of the user applying the discount code.
    pub user_id: String,
}

impl ValidateRequest {
    /// Converts this [`ValidateRequest`] into a [`query::discount::Validate`]
    /// pricing the total in the provided `currency`.
    ///
    /// # Errors
    ///
    /// If any of the fields is invalid.
    pub fn into_query(
        self,
        currency: common::money::Currency,
    ) -> Result<query::discount::Validate, InvalidInput> {
        let Self {
            code,
            total_amount,
            number_of_days,
            user_id,
        } = self;

        if total_amount.is_sign_negative() {
            return Err(InvalidInput::TotalAmount);
        }
        Ok(query::discount::Validate {
            code: discount::Code::new(code).ok_or(InvalidInput::Code)?,
            total: Money {
                amount: total_amount,
                currency,
            },
            nights: number_of_days,
            user_id: discount::UserId::new(user_id)
                .ok_or(InvalidInput::UserId)?,
        })
    }
}

/// Body of a `POST /discount-codes/use` request.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UseRequest {
    /// Discount code to use.
    pub code: String,

    /// ID of the user using the discount code.
    pub user_id: String,

    /// ID of the order the discount code is used for.
    pub order_id: String,
}

impl TryFrom<UseRequest> for command::UseDiscountCode {
    type Error = InvalidInput;

    fn try_from(req: UseRequest) -> Result<Self, Self::Error> {
        let UseRequest {
            code,
            user_id,
            order_id,
        } = req;

        Ok(Self {
            code: discount::Code::new(code).ok_or(InvalidInput::Code)?,
            user_id: discount::UserId::new(user_id)
                .ok_or(InvalidInput::UserId)?,
            order_id: discount::OrderId::new(order_id)
                .ok_or(InvalidInput::OrderId)?,
        })
    }
}

/// Breakdown of an applied discount code.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    /// Applied discount code.
    pub code: discount::Code,

    /// Kind of the discount.
    #[serde(rename = "type")]
    pub kind: discount::Kind,

    /// Percentage or fixed amount of the discount.
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,

    /// Amount subtracted from the total.
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_amount: Decimal,

    /// Amount left to pay.
    #[serde(with = "rust_decimal::serde::float")]
    pub final_amount: Decimal,
}

impl From<Application> for Breakdown {
    fn from(app: Application) -> Self {
        let Application {
            code,
            value,
            discount,
            final_amount,
        } = app;

        Self {
            code,
            kind: value.kind(),
            value: value.number(),
            discount_amount: discount.amount,
            final_amount: final_amount.amount,
        }
    }
}

/// Response of a successful discount code validation.
#[derive(Clone, Debug, Serialize)]
pub struct Validated {
    /// Always `true`.
    pub success: bool,

    /// Discount breakdown.
    pub discount: Breakdown,
}

/// Response of a successful discount code usage.
#[derive(Clone, Debug, Serialize)]
pub struct Used {
    /// Always `true`.
    pub success: bool,

    /// Human-readable confirmation.
    pub message: &'static str,
}

/// Evaluates a discount code against an order without using it.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_*` - malformed input;
/// - `DISCOUNT_*` - discount code cannot be applied.
#[tracing::instrument(
    skip_all,
    fields(http.name = "validateDiscountCode", discount.code = %req.code),
)]
pub async fn validate(
    Extension(service): Extension<Service>,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<Validated>, Error> {
    let applied = service
        .execute(req.into_query(service.config().currency)?)
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(Validated {
        success: true,
        discount: applied.into(),
    }))
}

/// Records a discount code as used by a user.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_*` - malformed input;
/// - `DISCOUNT_ALREADY_USED` - the user has used the discount code already;
/// - `DISCOUNT_*` - discount code cannot be used.
#[tracing::instrument(
    skip_all,
    fields(
        http.name = "useDiscountCode",
        discount.code = %req.code,
        order.id = %req.order_id,
    ),
)]
pub async fn redeem(
    Extension(service): Extension<Service>,
    Json(req): Json<UseRequest>,
) -> Result<Json<Used>, Error> {
    _ = service
        .execute(command::UseDiscountCode::try_from(req)?)
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(Used {
        success: true,
        message: "Discount code applied successfully",
    }))
}

impl AsError for query::discount::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Rejected(r) => Some(rejection(*r)),
        }
    }
}

impl AsError for use_discount_code::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Rejected(r) => Some(rejection(*r)),
        }
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use common::{money::Currency, Money, Percent};
    use rust_decimal::Decimal;
    use serde_json::json;
    use service::domain::discount::{self, Application, Rejection};

    use super::{rejection, Breakdown, ValidateRequest};

    #[test]
    fn prices_total_in_configured_currency() {
        let req: ValidateRequest = serde_json::from_value(json!({
            "code": "save10",
            "totalAmount": 100_000,
            "numberOfDays": 4,
            "userId": "ada@example.com",
        }))
        .unwrap();

        let query = req.into_query(Currency::Ngn).unwrap();

        assert_eq!(query.code.to_string(), "SAVE10");
        assert_eq!(query.total, Money::from_str("100000NGN").unwrap());
        assert_eq!(query.nights, 4);
    }

    #[test]
    fn rejects_negative_total() {
        let req: ValidateRequest = serde_json::from_value(json!({
            "code": "SAVE10",
            "totalAmount": -1,
            "numberOfDays": 4,
            "userId": "ada@example.com",
        }))
        .unwrap();

        let err = req.into_query(Currency::Ngn).unwrap_err();

        assert_eq!(crate::Error::from(err).code, "INVALID_TOTAL_AMOUNT");
    }

    #[test]
    fn renders_breakdown() {
        let breakdown = Breakdown::from(Application {
            code: discount::Code::new("SAVE10").unwrap(),
            value: discount::Value::Percentage(
                Percent::new(Decimal::from(10)).unwrap(),
            ),
            discount: Money::from_str("10000NGN").unwrap(),
            final_amount: Money::from_str("90000NGN").unwrap(),
        });

        assert_eq!(
            serde_json::to_value(breakdown).unwrap(),
            json!({
                "code": "SAVE10",
                "type": "percentage",
                "value": 10.0,
                "discountAmount": 10000.0,
                "finalAmount": 90000.0,
            }),
        );
    }

    #[test]
    fn maps_rejections() {
        let used = rejection(Rejection::AlreadyUsed);
        assert_eq!(used.status_code, http::StatusCode::CONFLICT);
        assert_eq!(used.message, "You have already used this discount code");

        let short = rejection(Rejection::MinimumStayNotMet { required: 3 });
        assert_eq!(short.code, "DISCOUNT_MINIMUM_STAY_NOT_MET");
        assert_eq!(short.status_code, http::StatusCode::BAD_REQUEST);
        assert_eq!(short.message, "Minimum stay of 3 nights required");
    }
}
