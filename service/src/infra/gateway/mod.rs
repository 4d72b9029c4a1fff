//! Payment [`Gateway`] definitions.

#[cfg(test)]
pub(crate) mod mock;
#[cfg(feature = "paystack")]
pub mod paystack;

use common::Money;
use derive_more::{Display, Error as StdError, From};

use crate::domain::{booking::guest, transaction};

#[cfg(feature = "paystack")]
pub use self::paystack::Paystack;

/// Payment gateway operation.
pub use common::Handler as Gateway;

/// Checkout to initialize in a payment [`Gateway`].
#[derive(Clone, Debug)]
pub struct Checkout {
    /// Internal [`transaction::Reference`] to track the payment by.
    pub reference: transaction::Reference,

    /// [`guest::Email`] of the paying customer.
    pub email: guest::Email,

    /// Amount to charge.
    pub amount: Money,

    /// Arbitrary metadata attached to the payment.
    pub metadata: serde_json::Value,
}

/// Result of initializing a [`Checkout`].
#[derive(Clone, Debug)]
pub struct Initialized {
    /// URL the customer should be redirected to for paying.
    pub authorization_url: String,

    /// Access code of the checkout.
    pub access_code: String,

    /// [`transaction::Reference`] the payment [`Gateway`] tracks the payment
    /// by.
    pub reference: transaction::Reference,
}

/// Result of verifying a payment.
#[derive(Clone, Debug)]
pub struct Verification {
    /// [`Outcome`] of the payment.
    pub outcome: Outcome,

    /// Raw status reported by the payment [`Gateway`].
    pub gateway_status: String,

    /// Amount actually paid, if reported.
    pub amount: Option<Money>,

    /// Raw payment [`Gateway`] response.
    pub raw: serde_json::Value,
}

/// Outcome of a payment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Payment is settled successfully.
    Success,

    /// Payment failed with the provided reason.
    Failed(String),

    /// Payment is not settled yet.
    Pending,
}

/// Payment [`Gateway`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// HTTP request to the payment [`Gateway`] failed.
    #[cfg(feature = "paystack")]
    #[display("HTTP request failed: {_0}")]
    Request(reqwest::Error),

    /// Payment [`Gateway`] rejected the request.
    #[display("Payment gateway rejected the request: {_0}")]
    #[from(ignore)]
    Rejected(#[error(not(source))] String),

    /// Payment [`Gateway`] responded with something undecodable.
    #[display("Malformed payment gateway response: {_0}")]
    #[from(ignore)]
    Malformed(#[error(not(source))] String),

    /// Amount cannot be expressed in minor units.
    #[display("Amount `{_0}` cannot be charged")]
    #[from(ignore)]
    InvalidAmount(#[error(not(source))] Money),
}
