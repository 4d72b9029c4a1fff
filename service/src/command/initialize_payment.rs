//! [`Command`] for initializing a payment of a [`BookingRequest`].

use common::{
    operations::{By, Initialize, Insert, Select},
    DateTime, Money,
};
use derive_more::{Display, Error, From};
use rust_decimal::Decimal;
use serde_json::json;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        booking,
        transaction::{self, Customer},
        BookingRequest, Transaction,
    },
    infra::{
        database,
        gateway::{self, Checkout, Initialized},
        Database, Gateway,
    },
    read::{reservation::Overlapping, Reservation},
    Service,
};

use super::Command;

/// [`Command`] for initializing a payment of a [`BookingRequest`].
#[derive(Clone, Copy, Debug)]
pub struct InitializePayment {
    /// ID of the [`BookingRequest`] to pay for.
    pub booking_request_id: booking::Id,

    /// [`transaction::Kind`] of the payment.
    pub kind: transaction::Kind,
}

impl<Db, Gw> Command<InitializePayment> for Service<Db, Gw>
where
    Db: Database<
            Select<By<Option<BookingRequest>, booking::Id>>,
            Ok = Option<BookingRequest>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Transaction>, booking::Id>>,
            Ok = Vec<Transaction>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Reservation>, Overlapping>>,
            Ok = Option<Reservation>,
            Err = Traced<database::Error>,
        > + Database<Insert<Transaction>, Err = Traced<database::Error>>,
    Gw: Gateway<
        Initialize<Checkout>,
        Ok = Initialized,
        Err = Traced<gateway::Error>,
    >,
{
    type Ok = (Transaction, Initialized);
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: InitializePayment,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let InitializePayment {
            booking_request_id,
            kind,
        } = cmd;

        let booking = self
            .database()
            .execute(Select(By::<Option<BookingRequest>, _>::new(
                booking_request_id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| tracerr::new!(E::NotFound(booking_request_id)))?;
        if booking.status != booking::Status::Pending {
            return Err(tracerr::new!(E::NotPayable(booking.status)));
        }

        let paid = self
            .database()
            .execute(Select(By::<Vec<Transaction>, _>::new(booking.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .into_iter()
            .any(|t| t.status == transaction::Status::Success);
        if paid {
            return Err(tracerr::new!(E::AlreadyPaid(booking.id)));
        }

        // Dates could have been taken since the request was submitted.
        let conflict = self
            .database()
            .execute(Select(By::new(Overlapping {
                property_id: booking.property_id.clone(),
                stay: booking.stay.stay,
            })))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if let Some(r) = conflict {
            return Err(tracerr::new!(E::Conflict(r)));
        }

        let total = booking.stay.total;
        let amount = match kind {
            transaction::Kind::Full => total,
            transaction::Kind::Deposit => {
                self.config().deposit.of(total).round()
            }
        };
        if amount.amount <= Decimal::ZERO {
            return Err(tracerr::new!(E::NothingToPay(amount)));
        }

        let reference = transaction::Reference::generate();
        let initialized = self
            .gateway()
            .execute(Initialize(Checkout {
                reference: reference.clone(),
                email: booking.guest.email.clone(),
                amount,
                metadata: json!({
                    "bookingRequestId": booking.id,
                    "propertyId": booking.property_id,
                    "paymentType": kind.to_string(),
                    "guestName": AsRef::<str>::as_ref(&booking.guest.name),
                }),
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let transaction = Transaction {
            id: transaction::Id::new(),
            reference,
            gateway_reference: initialized.reference.clone(),
            access_code: initialized.access_code.clone(),
            booking_request_id: booking.id,
            kind,
            amount,
            customer: Customer {
                email: booking.guest.email,
                name: booking.guest.name,
                phone: booking.guest.phone,
            },
            status: transaction::Status::Pending,
            gateway_status: None,
            failure_reason: None,
            gateway_response: None,
            created_at: DateTime::now().coerce(),
            settled_at: None,
        };
        self.database()
            .execute(Insert(transaction.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            reference = %transaction.reference,
            booking_id = %transaction.booking_request_id,
            "payment initialized for {}",
            transaction.amount,
        );

        Ok((transaction, initialized))
    }
}

/// Error of [`InitializePayment`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Payment [`Gateway`] error.
    #[display("Payment gateway failed: {_0}")]
    Gateway(gateway::Error),

    /// [`BookingRequest`] doesn't exist.
    #[display("`BookingRequest(id: {_0})` doesn't exist")]
    #[from(ignore)]
    NotFound(#[error(not(source))] booking::Id),

    /// [`BookingRequest`] is not awaiting payment.
    #[display("`BookingRequest` is `{_0}` and cannot be paid")]
    #[from(ignore)]
    NotPayable(#[error(not(source))] booking::Status),

    /// [`BookingRequest`] is paid already.
    #[display("`BookingRequest(id: {_0})` is already paid")]
    #[from(ignore)]
    AlreadyPaid(#[error(not(source))] booking::Id),

    /// Booked dates are taken by an existing [`Reservation`].
    #[display("Requested dates are already booked")]
    #[from(ignore)]
    Conflict(#[error(not(source))] Reservation),

    /// Amount to charge is not positive.
    #[display("Nothing to pay: `{_0}`")]
    #[from(ignore)]
    NothingToPay(#[error(not(source))] Money),
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use common::Money;

    use crate::{
        command::{
            create_booking_request::spec::{paid, request},
            Command as _,
        },
        domain::{booking, transaction},
        infra::{
            gateway::{mock::Scripted, Outcome},
            Memory,
        },
        spec::{drain, service},
    };

    use super::{ExecutionError, InitializePayment};

    #[tokio::test]
    async fn charges_full_total() {
        let (svc, _) = service(Memory::new(), Scripted::new(Outcome::Success));
        let booking = svc
            .execute(request("apt-1", "2030-03-01", "2030-03-04"))
            .await
            .unwrap();

        let (tx, init) = svc
            .execute(InitializePayment {
                booking_request_id: booking.id,
                kind: transaction::Kind::Full,
            })
            .await
            .unwrap();

        assert_eq!(tx.amount, Money::from_str("90000NGN").unwrap());
        assert_eq!(tx.status, transaction::Status::Pending);
        assert_eq!(tx.gateway_reference, init.reference);
        assert_eq!(tx.access_code, init.access_code);
        assert!(tx.reference.to_string().starts_with("BK-"));
    }

    #[tokio::test]
    async fn charges_deposit_share() {
        let (svc, _) = service(Memory::new(), Scripted::new(Outcome::Success));
        let booking = svc
            .execute(request("apt-1", "2030-03-01", "2030-03-04"))
            .await
            .unwrap();

        let (tx, _) = svc
            .execute(InitializePayment {
                booking_request_id: booking.id,
                kind: transaction::Kind::Deposit,
            })
            .await
            .unwrap();

        assert_eq!(tx.amount, Money::from_str("45000NGN").unwrap());
    }

    #[tokio::test]
    async fn rejects_unknown_booking() {
        let (svc, _) = service(Memory::new(), Scripted::new(Outcome::Success));

        let err = svc
            .execute(InitializePayment {
                booking_request_id: booking::Id::new(),
                kind: transaction::Kind::Full,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotFound(_)));
    }

    #[tokio::test]
    async fn rejects_converted_booking() {
        let (svc, mut inbox) =
            service(Memory::new(), Scripted::new(Outcome::Success));
        let booking =
            paid(&svc, request("apt-1", "2030-03-01", "2030-03-04")).await;
        _ = drain(&mut inbox);

        let err = svc
            .execute(InitializePayment {
                booking_request_id: booking.id,
                kind: transaction::Kind::Full,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::NotPayable(booking::Status::Converted),
        ));
    }

    #[tokio::test]
    async fn rechecks_availability() {
        let (svc, _) = service(Memory::new(), Scripted::new(Outcome::Success));
        let late = svc
            .execute(request("apt-1", "2030-03-02", "2030-03-06"))
            .await
            .unwrap();
        _ = paid(&svc, request("apt-1", "2030-03-01", "2030-03-04")).await;

        let err = svc
            .execute(InitializePayment {
                booking_request_id: late.id,
                kind: transaction::Kind::Full,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::Conflict(_)));
    }

    #[tokio::test]
    async fn gateway_failure_persists_nothing() {
        let gateway = Scripted::new(Outcome::Success);
        let (svc, _) = service(Memory::new(), gateway.clone());
        let booking = svc
            .execute(request("apt-1", "2030-03-01", "2030-03-04"))
            .await
            .unwrap();
        gateway.go_down();

        let err = svc
            .execute(InitializePayment {
                booking_request_id: booking.id,
                kind: transaction::Kind::Full,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::Gateway(_)));

        gateway.report(Outcome::Success);
        assert!(svc
            .execute(InitializePayment {
                booking_request_id: booking.id,
                kind: transaction::Kind::Full,
            })
            .await
            .is_ok());
    }
}
