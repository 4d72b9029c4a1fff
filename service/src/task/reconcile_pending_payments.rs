//! [`ReconcilePendingPayments`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::operations::{By, Perform, Select, Start, Update};
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    command::{
        verify_payment::{self, Verified},
        Command, VerifyPayment,
    },
    domain::transaction,
    infra::{database, Database},
    read::transaction::{Checked, StalePending},
    Service,
};

use super::Task;

/// Configuration for [`ReconcilePendingPayments`] [`Task`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Interval between sweeps.
    pub interval: time::Duration,

    /// Timeout after which a pending [`Transaction`] is verified again.
    ///
    /// [`Transaction`]: crate::domain::Transaction
    pub timeout: time::Duration,

    /// Maximum number of [`Transaction`]s verified in a single sweep.
    ///
    /// [`Transaction`]: crate::domain::Transaction
    pub batch: u16,
}

/// [`Task`] verifying payments left pending for too long, so abandoned
/// checkouts get failed and missed confirmations get reconciled.
///
/// Payments staying pending after a verification are marked as [`Checked`],
/// so the next sweeps get to the other ones first.
#[derive(Clone, Copy, Debug)]
pub struct ReconcilePendingPayments<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db, Gw> Task<Start<By<ReconcilePendingPayments<Self>, Config>>>
    for Service<Db, Gw>
where
    ReconcilePendingPayments<Service<Db, Gw>>:
        Task<Perform<()>, Ok = usize, Err: Error> + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<ReconcilePendingPayments<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = ReconcilePendingPayments {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            match task.execute(Perform(())).await {
                Ok(0) => {}
                Ok(n) => log::info!("reconciled {n} pending payments"),
                Err(e) => {
                    log::error!("`task::ReconcilePendingPayments` failed: {e}");
                }
            }
        }
    }
}

impl<Db, Gw> Task<Perform<()>> for ReconcilePendingPayments<Service<Db, Gw>>
where
    Db: Database<
        Select<By<Vec<transaction::Reference>, StalePending>>,
        Ok = Vec<transaction::Reference>,
        Err = Traced<database::Error>,
    > + Database<Update<Checked>, Ok = (), Err = Traced<database::Error>>,
    Service<Db, Gw>: Command<
        VerifyPayment,
        Ok = Verified,
        Err = Traced<verify_payment::ExecutionError>,
    >,
{
    /// Number of settled [`Transaction`]s.
    ///
    /// [`Transaction`]: crate::domain::Transaction
    type Ok = usize;
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let stale = self
            .service
            .database()
            .execute(Select(By::new(StalePending {
                created_before: transaction::CreationDateTime::now()
                    - self.config.timeout,
                limit: self.config.batch,
            })))
            .await
            .map_err(tracerr::wrap!())?;

        let mut settled = 0;
        for reference in stale {
            match self
                .service
                .execute(VerifyPayment {
                    reference: reference.clone(),
                })
                .await
            {
                Ok(v) => {
                    settled += 1;
                    log::info!(
                        reference = %reference,
                        "stale payment settled as `{}`",
                        v.transaction.status,
                    );
                }
                Err(e) => {
                    match e.as_ref() {
                        verify_payment::ExecutionError::NotSettled(_) => {
                            log::debug!(
                                reference = %reference,
                                "stale payment is still pending",
                            );
                        }
                        _ => log::warn!(
                            reference = %reference,
                            "failed to reconcile stale payment: {e}",
                        ),
                    }
                    self.service
                        .database()
                        .execute(Update(Checked {
                            reference,
                            at: transaction::CheckDateTime::now(),
                        }))
                        .await
                        .map_err(tracerr::wrap!())?;
                }
            }
        }
        Ok(settled)
    }
}

/// Error of [`ReconcilePendingPayments`] execution.
pub type ExecutionError = Traced<database::Error>;
