//! [`Transaction`]-related API definitions.

use axum::Extension;
use serde::{Deserialize, Serialize};
use service::{
    command::{
        self, initialize_payment,
        verify_payment::{self, Verified},
    },
    domain::{booking, tenant, transaction, Transaction},
    query, Command as _,
};
use tracing as log;

use crate::{
    api::{Amount, Json, Path},
    define_error, AsError, Error, Service,
};

define_error! {
    enum InvalidInput {
        #[code = "INVALID_BOOKING_ID"]
        #[status = BAD_REQUEST]
        #[message = "Booking request ID is invalid"]
        BookingId,

        #[code = "INVALID_PAYMENT_TYPE"]
        #[status = BAD_REQUEST]
        #[message = "Payment type must be either `full` or `deposit`"]
        PaymentType,

        #[code = "INVALID_REFERENCE"]
        #[status = BAD_REQUEST]
        #[message = "Payment reference is invalid"]
        Reference,
    }
}

define_error! {
    enum NotFound {
        #[code = "TRANSACTION_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Payment not found"]
        Transaction,
    }
}

define_error! {
    enum GatewayError {
        #[code = "PAYMENT_GATEWAY_ERROR"]
        #[status = BAD_GATEWAY]
        #[message = "Payment gateway is unavailable, retry later"]
        Unavailable,
    }
}

/// Body of a `POST /payments/initialize` request.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    /// ID of the booking request to pay for.
    pub booking_request_id: String,

    /// `full` or `deposit`.
    pub payment_type: String,
}

impl TryFrom<InitializeRequest> for command::InitializePayment {
    type Error = InvalidInput;

    fn try_from(req: InitializeRequest) -> Result<Self, Self::Error> {
        let InitializeRequest {
            booking_request_id,
            payment_type,
        } = req;

        Ok(Self {
            booking_request_id: booking_request_id
                .trim()
                .parse::<booking::Id>()
                .map_err(|_| InvalidInput::BookingId)?,
            kind: payment_type
                .trim()
                .parse::<transaction::Kind>()
                .map_err(|_| InvalidInput::PaymentType)?,
        })
    }
}

/// Body of a `POST /payments/verify` request.
#[derive(Clone, Debug, Deserialize)]
pub struct VerifyRequest {
    /// Reference of the payment to verify.
    pub reference: String,
}

/// Parses a [`transaction::Reference`] provided by a client.
fn reference(input: String) -> Result<transaction::Reference, InvalidInput> {
    transaction::Reference::new(input.trim()).ok_or(InvalidInput::Reference)
}

/// [`Transaction`] as rendered in responses.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// ID of the [`Transaction`].
    pub id: transaction::Id,

    /// Reference of the [`Transaction`].
    pub reference: transaction::Reference,

    /// ID of the paid booking request.
    pub booking_request_id: booking::Id,

    /// `full` or `deposit`.
    pub payment_type: transaction::Kind,

    /// Charged amount.
    pub amount: Amount,

    /// Status of the [`Transaction`].
    pub status: transaction::Status,

    /// Raw status reported by the payment gateway.
    pub gateway_status: Option<String>,

    /// Reason of a failure, if any.
    pub failure_reason: Option<String>,

    /// RFC 3339 creation date and time.
    pub created_at: String,

    /// RFC 3339 settlement date and time.
    pub settled_at: Option<String>,
}

impl From<Transaction> for Payment {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id,
            reference: tx.reference,
            booking_request_id: tx.booking_request_id,
            payment_type: tx.kind,
            amount: tx.amount.into(),
            status: tx.status,
            gateway_status: tx.gateway_status,
            failure_reason: tx.failure_reason,
            created_at: tx.created_at.to_rfc3339(),
            settled_at: tx.settled_at.map(|at| at.to_rfc3339()),
        }
    }
}

/// Response of an initialized payment.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Initialized {
    /// URL to redirect the guest to.
    pub authorization_url: String,

    /// Access code of the checkout.
    pub access_code: String,

    /// Reference to verify the payment by.
    pub reference: transaction::Reference,

    /// ID of the created [`Transaction`].
    pub transaction_id: transaction::Id,
}

/// Response of a settled payment.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settled {
    /// Status of the payment.
    pub status: transaction::Status,

    /// Settled [`Transaction`].
    pub transaction: Payment,

    /// Human-readable outcome.
    pub message: String,

    /// ID of the tenancy confirmed by this verification, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<tenant::Id>,
}

impl From<Verified> for Settled {
    fn from(verified: Verified) -> Self {
        let Verified {
            transaction: tx,
            tenant,
        } = verified;

        let message = match tx.status {
            transaction::Status::Success => {
                "Payment verified successfully".to_owned()
            }
            transaction::Status::Failed => tx
                .failure_reason
                .clone()
                .unwrap_or_else(|| "Payment failed".to_owned()),
            transaction::Status::Pending => {
                "Payment is not settled yet".to_owned()
            }
        };

        Self {
            status: tx.status,
            transaction: tx.into(),
            message,
            tenant_id: tenant.map(|t| t.id),
        }
    }
}

/// Response of a found [`Transaction`].
#[derive(Clone, Debug, Serialize)]
pub struct Found {
    /// Always `true`.
    pub success: bool,

    /// Found [`Transaction`].
    pub transaction: Payment,
}

/// Starts paying for a booking request through the payment gateway.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_*` - malformed input;
/// - `BOOKING_NOT_FOUND` - no such booking request exists;
/// - `BOOKING_NOT_PAYABLE` - booking request is not awaiting payment;
/// - `BOOKING_ALREADY_PAID` - booking request is paid already;
/// - `DATES_UNAVAILABLE` - booked dates have been taken meanwhile;
/// - `NOTHING_TO_PAY` - amount to charge is zero;
/// - `PAYMENT_GATEWAY_ERROR` - payment gateway failed, retry later.
#[tracing::instrument(
    skip_all,
    fields(
        booking.id = %req.booking_request_id,
        http.name = "initializePayment",
        payment.kind = %req.payment_type,
    ),
)]
pub async fn initialize(
    Extension(service): Extension<Service>,
    Json(req): Json<InitializeRequest>,
) -> Result<Json<Initialized>, Error> {
    let (tx, checkout) = service
        .execute(command::InitializePayment::try_from(req)?)
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(Initialized {
        authorization_url: checkout.authorization_url,
        access_code: checkout.access_code,
        reference: tx.reference,
        transaction_id: tx.id,
    }))
}

/// Verifies a payment with the payment gateway and reconciles its booking
/// request.
///
/// Repeating the call for a settled payment returns the same outcome.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_REFERENCE` - malformed reference;
/// - `TRANSACTION_NOT_FOUND` - no such payment exists;
/// - `PAYMENT_NOT_SETTLED` - payment gateway hasn't settled the payment yet,
///                           retry later;
/// - `PAYMENT_GATEWAY_ERROR` - payment gateway failed, retry later;
/// - `PAYMENT_VERIFICATION_FAILED` - payment couldn't be processed, contact
///                                   support with the reference.
#[tracing::instrument(
    skip_all,
    fields(http.name = "verifyPayment", payment.reference = %req.reference),
)]
pub async fn verify(
    Extension(service): Extension<Service>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<Settled>, Error> {
    let reference = reference(req.reference)?;

    let verified = service
        .execute(command::VerifyPayment {
            reference: reference.clone(),
        })
        .await
        .map_err(|e| for_support(e.into_error(), &reference))?;

    if let Some(t) = &verified.tenant {
        log::info!(tenant.id = %t.id, "tenancy confirmed");
    }
    Ok(Json(verified.into()))
}

/// Returns the payment with the provided reference.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_REFERENCE` - malformed reference;
/// - `TRANSACTION_NOT_FOUND` - no such payment exists.
#[tracing::instrument(
    skip_all,
    fields(http.name = "getPayment", payment.reference = %input),
)]
pub async fn get(
    Extension(service): Extension<Service>,
    Path(input): Path<String>,
) -> Result<Json<Found>, Error> {
    let tx = service
        .execute(query::transaction::ByReference::by(reference(input)?))
        .await
        .map_err(AsError::into_error)?
        .ok_or(NotFound::Transaction)?;

    Ok(Json(Found {
        success: true,
        transaction: tx.into(),
    }))
}

/// Attaches the payment `reference` to server-side [`Error`]s, so the guest
/// can follow up with support.
fn for_support(err: Error, reference: &transaction::Reference) -> Error {
    if err.code == Error::INTERNAL {
        log::error!("failed to verify payment `{reference}`: {err}");
        return Error::new(
            "PAYMENT_VERIFICATION_FAILED",
            http::StatusCode::INTERNAL_SERVER_ERROR,
            format!(
                "Failed to process payment `{reference}`, contact support",
            ),
        );
    }
    if err.status_code == http::StatusCode::BAD_GATEWAY {
        return Error {
            message: format!("{} (reference: `{reference}`)", err.message),
            ..err
        };
    }
    err
}

impl AsError for initialize_payment::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "BOOKING_NOT_FOUND"]
                #[status = NOT_FOUND]
                #[message = "Booking request not found"]
                NotFound,

                #[code = "BOOKING_ALREADY_PAID"]
                #[status = CONFLICT]
                #[message = "Booking request is paid already"]
                AlreadyPaid,

                #[code = "DATES_UNAVAILABLE"]
                #[status = CONFLICT]
                #[message = "Requested dates are already booked"]
                Conflict,

                #[code = "NOTHING_TO_PAY"]
                #[status = BAD_REQUEST]
                #[message = "Nothing to pay for this booking request"]
                NothingToPay,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Gateway(_) => Some(GatewayError::Unavailable.into()),
            Self::NotFound(_) => Some(Error::NotFound.into()),
            Self::NotPayable(status) => Some(crate::Error::new(
                "BOOKING_NOT_PAYABLE",
                http::StatusCode::CONFLICT,
                format!("Booking request is `{status}` and cannot be paid"),
            )),
            Self::AlreadyPaid(_) => Some(Error::AlreadyPaid.into()),
            Self::Conflict(_) => Some(Error::Conflict.into()),
            Self::NothingToPay(_) => Some(Error::NothingToPay.into()),
        }
    }
}

impl AsError for verify_payment::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Gateway(_) => Some(GatewayError::Unavailable.into()),
            Self::NotFound(_) => Some(NotFound::Transaction.into()),
            Self::NotSettled(reference) => Some(crate::Error::new(
                "PAYMENT_NOT_SETTLED",
                http::StatusCode::SERVICE_UNAVAILABLE,
                format!(
                    "Payment `{reference}` is not settled yet, retry later",
                ),
            )),
            Self::Transition(_) => None,
        }
    }
}

#[cfg(test)]
mod spec {
    use service::{
        command::{self, initialize_payment, verify_payment},
        domain::{booking, transaction},
        infra::gateway,
    };

    use crate::{AsError as _, Error};

    use super::{for_support, InitializeRequest};

    fn initialize(
        id: &str,
        kind: &str,
    ) -> Result<command::InitializePayment, Error> {
        command::InitializePayment::try_from(InitializeRequest {
            booking_request_id: id.into(),
            payment_type: kind.into(),
        })
        .map_err(Into::into)
    }

    #[test]
    fn parses_payment_type() {
        let id = booking::Id::new();

        let cmd = initialize(&id.to_string(), "Deposit").unwrap();
        assert_eq!(cmd.booking_request_id, id);
        assert_eq!(cmd.kind, transaction::Kind::Deposit);

        let err = initialize(&id.to_string(), "half").unwrap_err();
        assert_eq!(err.code, "INVALID_PAYMENT_TYPE");

        let err = initialize("apt-1", "full").unwrap_err();
        assert_eq!(err.code, "INVALID_BOOKING_ID");
    }

    #[test]
    fn maps_initialization_errors() {
        use initialize_payment::ExecutionError as E;

        let err = E::NotPayable(booking::Status::Converted).as_error();
        assert_eq!(err.code, "BOOKING_NOT_PAYABLE");
        assert_eq!(err.status_code, http::StatusCode::CONFLICT);

        let err = E::Gateway(gateway::Error::Rejected("Invalid key".into()))
            .as_error();
        assert_eq!(err.status_code, http::StatusCode::BAD_GATEWAY);
        assert!(!err.message.contains("Invalid key"));
    }

    #[test]
    fn not_settled_carries_reference() {
        let reference = transaction::Reference::new("BK-42").unwrap();

        let err = verify_payment::ExecutionError::NotSettled(reference.clone())
            .as_error();

        assert_eq!(err.code, "PAYMENT_NOT_SETTLED");
        assert_eq!(err.status_code, http::StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.message.contains("BK-42"));
    }

    #[test]
    fn attaches_reference_for_support() {
        let reference = transaction::Reference::new("BK-42").unwrap();

        let internal = for_support(Error::internal(&"deadlock"), &reference);
        assert_eq!(internal.code, "PAYMENT_VERIFICATION_FAILED");
        assert!(internal.message.contains("BK-42"));
        assert!(!internal.message.contains("deadlock"));

        let gateway = for_support(
            verify_payment::ExecutionError::Gateway(
                gateway::Error::Malformed("<html>".into()),
            )
            .as_error(),
            &reference,
        );
        assert_eq!(gateway.code, "PAYMENT_GATEWAY_ERROR");
        assert!(gateway.message.contains("BK-42"));
    }
}
