//! HTTP JSON API definitions.

pub mod availability;
pub mod booking;
pub mod discount;
pub mod payment;

use axum::{
    extract::{FromRequest, FromRequestParts},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Router,
};
use common::{Date, Money};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{Error, Service};

/// [`axum::Json`] extractor and response rejecting with an API [`Error`].
#[derive(Clone, Copy, Debug, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// [`axum::extract::Path`] extractor rejecting with an API [`Error`].
#[derive(Clone, Copy, Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct Path<T>(pub T);

/// Builds the [`Router`] serving the whole HTTP API over the provided
/// [`Service`].
pub fn router(service: Service) -> Router {
    Router::new()
        .route("/bookings", post(booking::create))
        .route("/bookings/:id", get(booking::get))
        .route(
            "/apartments/:id/check-availability",
            post(availability::check),
        )
        .route("/apartments/:id/bookings", get(availability::list))
        .route("/discount-codes/validate", post(discount::validate))
        .route("/discount-codes/use", post(discount::redeem))
        .route("/payments/initialize", post(payment::initialize))
        .route("/payments/verify", post(payment::verify))
        .route("/payments/:reference", get(payment::get))
        .layer(Extension(service))
}

/// Amount of [`Money`] as rendered in responses.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Amount {
    /// Amount in major units.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    /// ISO 4217 currency code.
    pub currency: &'static str,
}

impl From<Money> for Amount {
    fn from(money: Money) -> Self {
        Self {
            amount: money.amount,
            currency: money.currency.code(),
        }
    }
}

/// Parses a [`Date`] provided by a client, turning a malformed one into the
/// provided [`Error`].
fn date(input: &str, err: impl Into<Error>) -> Result<Date, Error> {
    Date::parse(input).map_err(|_| err.into())
}
