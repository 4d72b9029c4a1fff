//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;
pub mod task;

use std::error::Error;

use common::{
    date::UtcOffset,
    money::Currency,
    operations::{By, Start},
    Percent,
};

#[cfg(doc)]
use infra::{Database, Gateway};

pub use self::{command::Command, query::Query, task::Task};

/// [`Service`] configuration.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// [`Currency`] properties are priced in.
    pub currency: Currency,

    /// [`Percent`] of the total charged as a deposit.
    pub deposit: Percent,

    /// [`UtcOffset`] of the business time zone, deciding which [`Date`] is
    /// today.
    ///
    /// [`Date`]: common::Date
    pub utc_offset: UtcOffset,

    /// [`task::ReconcilePendingPayments`] configuration.
    pub reconcile_pending_payments: task::reconcile_pending_payments::Config,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db, Gw> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// Payment [`Gateway`] of this [`Service`].
    gateway: Gw,

    /// [`task::Outbox`] of this [`Service`].
    outbox: task::Outbox,
}

impl<Db, Gw> Service<Db, Gw> {
    /// Creates a new [`Service`] with the provided parameters.
    ///
    /// [`Notification`]s are delivered with the provided `notifier` by the
    /// returned [`task::Background`].
    ///
    /// [`Notification`]: domain::Notification
    pub fn new<N>(
        config: Config,
        database: Db,
        gateway: Gw,
        notifier: N,
    ) -> (Self, task::Background)
    where
        Self: Task<
                Start<
                    By<
                        task::ReconcilePendingPayments<Self>,
                        task::reconcile_pending_payments::Config,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Task<
                Start<task::DispatchNotifications<N>>,
                Ok = (),
                Err: Error,
            > + Clone
            + 'static,
        N: 'static,
    {
        let (outbox, inbox) = task::Outbox::new();
        let this = Self {
            config,
            database,
            gateway,
            outbox,
        };

        let mut bg = task::Background::default();
        let svc = this.clone();
        bg.spawn("dispatch_notifications", async move {
            svc.execute(Start(task::DispatchNotifications::new(
                notifier, inbox,
            )))
            .await
        });
        let svc = this.clone();
        bg.spawn("reconcile_pending_payments", async move {
            svc.execute(Start(By::new(
                svc.config().reconcile_pending_payments,
            )))
            .await
        });

        (this, bg)
    }

    /// Returns [`Config`] of this [`Service`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns payment [`Gateway`] of this [`Service`].
    #[must_use]
    pub fn gateway(&self) -> &Gw {
        &self.gateway
    }

    /// Returns [`task::Outbox`] of this [`Service`].
    #[must_use]
    pub fn outbox(&self) -> &task::Outbox {
        &self.outbox
    }
}

#[cfg(test)]
pub(crate) mod spec {
    use std::time::Duration;

    use common::{date::UtcOffset, money::Currency, Percent};
    use rust_decimal::Decimal;
    use tokio::sync::mpsc;

    use crate::{
        domain::Notification,
        infra::{gateway::mock::Scripted, Memory},
        task::{self, reconcile_pending_payments},
        Config, Service,
    };

    /// [`Service`] under test.
    pub(crate) type TestService = Service<Memory, Scripted>;

    /// Creates a new [`TestService`] over the provided [`Memory`] database
    /// and [`Scripted`] gateway, along with the receiving end of its
    /// [`task::Outbox`].
    pub(crate) fn service(
        db: Memory,
        gateway: Scripted,
    ) -> (TestService, mpsc::UnboundedReceiver<Notification>) {
        let (outbox, inbox) = task::Outbox::new();
        let svc = Service {
            config: Config {
                currency: Currency::Ngn,
                deposit: Percent::new(Decimal::from(50)).unwrap(),
                utc_offset: UtcOffset::UTC,
                reconcile_pending_payments: reconcile_pending_payments::Config {
                    interval: Duration::from_secs(60),
                    timeout: Duration::from_secs(30 * 60),
                    batch: 10,
                },
            },
            database: db,
            gateway,
            outbox,
        };
        (svc, inbox.into_inner())
    }

    /// Collects all the [`Notification`]s pushed so far.
    pub(crate) fn drain(
        inbox: &mut mpsc::UnboundedReceiver<Notification>,
    ) -> Vec<Notification> {
        let mut all = vec![];
        while let Ok(n) = inbox.try_recv() {
            all.push(n);
        }
        all
    }
}
