//! [`Command`] for verifying a payment and reconciling its outcome.

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted, Update, Verify,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        booking,
        discount::{self, Usage},
        property, tenant, transaction, BookingRequest, DiscountCode,
        Notification, Tenant, Transaction,
    },
    infra::{
        database,
        gateway::{self, Outcome, Verification},
        Database, Gateway,
    },
    Service,
};

use super::Command;

/// [`Command`] for verifying a payment in a payment [`Gateway`] and
/// reconciling its outcome.
///
/// Settling a [`Transaction`] successfully confirms a [`Tenant`] out of its
/// [`BookingRequest`] atomically. Executing this [`Command`] again for an
/// already settled [`Transaction`] changes nothing.
#[derive(Clone, Debug)]
pub struct VerifyPayment {
    /// [`transaction::Reference`] of the [`Transaction`] to verify.
    pub reference: transaction::Reference,
}

/// Result of a [`VerifyPayment`] [`Command`] execution.
#[derive(Clone, Debug)]
pub struct Verified {
    /// Settled [`Transaction`].
    pub transaction: Transaction,

    /// [`Tenant`] confirmed by this execution, if any.
    pub tenant: Option<Tenant>,
}

impl<Db, Gw> Command<VerifyPayment> for Service<Db, Gw>
where
    Db: Database<
            Select<By<Option<Transaction>, transaction::Reference>>,
            Ok = Option<Transaction>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Transaction, transaction::Reference>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Transaction>, transaction::Reference>>,
            Ok = Option<Transaction>,
            Err = Traced<database::Error>,
        > + Database<Update<Transaction>, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<BookingRequest>, booking::Id>>,
            Ok = Option<BookingRequest>,
            Err = Traced<database::Error>,
        > + Database<Update<BookingRequest>, Err = Traced<database::Error>>
        + Database<
            Lock<By<Tenant, property::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Tenant>, tenant::Key>>,
            Ok = Option<Tenant>,
            Err = Traced<database::Error>,
        > + Database<Insert<Tenant>, Err = Traced<database::Error>>
        + Database<
            Lock<By<DiscountCode, discount::Code>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<DiscountCode>, discount::Code>>,
            Ok = Option<DiscountCode>,
            Err = Traced<database::Error>,
        > + Database<
            Insert<(discount::Code, Usage)>,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
    Gw: Gateway<
        Verify<transaction::Reference>,
        Ok = Verification,
        Err = Traced<gateway::Error>,
    >,
{
    type Ok = Verified;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: VerifyPayment) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let VerifyPayment { reference } = cmd;

        let transaction = self
            .database()
            .execute(Select(By::<Option<Transaction>, _>::new(
                reference.clone(),
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| tracerr::new!(E::NotFound(reference.clone())))?;
        if transaction.status != transaction::Status::Pending {
            return Ok(Verified {
                transaction,
                tenant: None,
            });
        }

        let Verification {
            outcome,
            gateway_status,
            amount,
            raw,
        } = self
            .gateway()
            .execute(Verify(transaction.gateway_reference.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let failure = match outcome {
            Outcome::Pending => {
                return Err(tracerr::new!(E::NotSettled(reference)));
            }
            Outcome::Failed(reason) => Some(reason),
            Outcome::Success => match amount {
                Some(paid) if paid != transaction.amount => {
                    log::warn!(
                        reference = %reference,
                        "paid amount `{paid}` differs from the expected `{}`",
                        transaction.amount,
                    );
                    Some(format!(
                        "Paid amount {paid} differs from the expected {}",
                        transaction.amount,
                    ))
                }
                Some(_) | None => None,
            },
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Serialize concurrent verifications of the same `Transaction`.
        tx.execute(Lock(By::<Transaction, _>::new(reference.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        let mut transaction = tx
            .execute(Select(By::<Option<Transaction>, _>::new(
                reference.clone(),
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| tracerr::new!(E::NotFound(reference.clone())))?;
        let settled = match &failure {
            Some(reason) => transaction.fail(
                reason.clone(),
                Some(gateway_status),
                Some(raw),
            ),
            None => transaction.succeed(gateway_status, raw),
        };
        if settled.is_err() {
            // Settled concurrently.
            return Ok(Verified {
                transaction,
                tenant: None,
            });
        }

        let booking = tx
            .execute(Select(By::<Option<BookingRequest>, _>::new(
                transaction.booking_request_id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if booking.is_none() {
            log::warn!(
                reference = %reference,
                "`BookingRequest(id: {})` of the payment doesn't exist",
                transaction.booking_request_id,
            );
        }

        let mut confirmed = None;
        if let Some(reason) = failure {
            tx.execute(Update(transaction.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            if let Some(mut booking) = booking {
                // Failed payment keeps the request open for a retry.
                if booking.transition(booking::Status::Pending).is_ok() {
                    booking.note(format!(
                        "Payment {reference} failed: {reason}",
                    ));
                    tx.execute(Update(booking))
                        .await
                        .map_err(tracerr::map_from_and_wrap!(=> E))
                        .map(drop)?;
                }
            }
        } else {
            tx.execute(Update(transaction.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

            if let Some(mut booking) = booking {
                // Avoid concurrent tenancies over the same property.
                tx.execute(Lock(By::<Tenant, _>::new(
                    booking.property_id.clone(),
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;

                if booking.status == booking::Status::Pending {
                    booking
                        .transition(booking::Status::Approved)
                        .map_err(tracerr::from_and_wrap!(=> E))?;
                }
                if booking.status == booking::Status::Approved {
                    let key = tenant::Key::new(
                        &booking.guest.email,
                        &booking.property_id,
                        &booking.stay.stay,
                    );
                    let existing = tx
                        .execute(Select(By::<Option<Tenant>, _>::new(key)))
                        .await
                        .map_err(tracerr::map_from_and_wrap!(=> E))?;
                    let tenant = if let Some(t) = existing {
                        t
                    } else {
                        let t = Tenant::confirm(&booking, &transaction);
                        tx.execute(Insert(t.clone()))
                            .await
                            .map_err(tracerr::map_from_and_wrap!(=> E))
                            .map(drop)?;
                        confirmed = Some(t.clone());
                        t
                    };

                    redeem_discount(&tx, &booking)
                        .await
                        .map_err(tracerr::map_from_and_wrap!(=> E))?;

                    booking
                        .transition(booking::Status::Converted)
                        .map_err(tracerr::from_and_wrap!(=> E))?;
                    booking.converted_to_tenant = Some(tenant.id);
                    booking.note(format!(
                        "Payment {reference} succeeded, tenancy {} confirmed",
                        tenant.id,
                    ));
                } else {
                    log::warn!(
                        reference = %reference,
                        "payment succeeded for `{}` `BookingRequest(id: {})`",
                        booking.status,
                        booking.id,
                    );
                    booking.note(format!(
                        "Payment {reference} succeeded for a {} request",
                        booking.status,
                    ));
                }
                tx.execute(Update(booking))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
            }
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            reference = %reference,
            "payment settled as `{}`",
            transaction.status,
        );
        if let Some(n) = Notification::payment_settled(&transaction) {
            self.outbox().push(n);
        }
        if let Some(t) = &confirmed {
            self.outbox().push(Notification::tenancy_confirmed(t));
        }

        Ok(Verified {
            transaction,
            tenant: confirmed,
        })
    }
}

/// Records the usage of the [`DiscountCode`] applied to the provided paid
/// [`BookingRequest`], unless it's recorded for this [`BookingRequest`]
/// already.
///
/// A [`DiscountCode`] that cannot be used anymore is only logged, since the
/// payment is taken already.
async fn redeem_discount<Db>(
    tx: &Db,
    booking: &BookingRequest,
) -> Result<(), Traced<database::Error>>
where
    Db: Database<
            Lock<By<DiscountCode, discount::Code>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<DiscountCode>, discount::Code>>,
            Ok = Option<DiscountCode>,
            Err = Traced<database::Error>,
        > + Database<
            Insert<(discount::Code, Usage)>,
            Err = Traced<database::Error>,
        >,
{
    let Some(applied) = &booking.discount else {
        return Ok(());
    };
    let user = discount::UserId::from(&booking.guest.email);
    let order = discount::OrderId::from(booking.id);

    tx.execute(Lock(By::<DiscountCode, _>::new(applied.code.clone())))
        .await
        .map_err(tracerr::wrap!())
        .map(drop)?;
    let Some(mut code) = tx
        .execute(Select(By::<Option<DiscountCode>, _>::new(
            applied.code.clone(),
        )))
        .await
        .map_err(tracerr::wrap!())?
    else {
        log::warn!(
            "`DiscountCode({})` applied to `BookingRequest(id: {})` doesn't \
             exist",
            applied.code,
            booking.id,
        );
        return Ok(());
    };
    if code.is_used_for(&user, &order) {
        return Ok(());
    }
    if let Err(e) = code.redeem(user, order) {
        log::warn!(
            "`DiscountCode({})` applied to paid `BookingRequest(id: {})` \
             cannot be used: {e}",
            applied.code,
            booking.id,
        );
        return Ok(());
    }
    let Some(usage) = code.usages.pop() else {
        return Ok(());
    };
    tx.execute(Insert((code.code, usage)))
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
}

/// Error of [`VerifyPayment`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Payment [`Gateway`] error.
    #[display("Payment gateway failed: {_0}")]
    Gateway(gateway::Error),

    /// [`Transaction`] doesn't exist.
    #[display("`Transaction(reference: {_0})` doesn't exist")]
    #[from(ignore)]
    NotFound(#[error(not(source))] transaction::Reference),

    /// Payment [`Gateway`] hasn't settled the payment yet.
    #[display("Payment `{_0}` is not settled yet")]
    #[from(ignore)]
    NotSettled(#[error(not(source))] transaction::Reference),

    /// [`BookingRequest`] cannot move into the required status.
    #[display("{_0}")]
    Transition(booking::InvalidTransition),
}
