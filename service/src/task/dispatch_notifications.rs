//! [`DispatchNotifications`] [`Task`].

use std::{convert::Infallible, fmt};

use common::operations::{Notify, Start};
use tracing as log;

use crate::{domain::Notification, infra::Notifier, Service};

use super::{outbox::Inbox, Task};

/// [`Task`] delivering [`Notification`]s drained from an [`Inbox`] with a
/// [`Notifier`].
#[derive(Debug)]
pub struct DispatchNotifications<N> {
    /// [`Notifier`] delivering [`Notification`]s.
    notifier: N,

    /// [`Inbox`] to drain.
    inbox: Inbox,
}

impl<N> DispatchNotifications<N> {
    /// Creates a new [`DispatchNotifications`] [`Task`].
    #[must_use]
    pub fn new(notifier: N, inbox: Inbox) -> Self {
        Self { notifier, inbox }
    }
}

impl<Db, Gw, N> Task<Start<DispatchNotifications<N>>> for Service<Db, Gw>
where
    N: Notifier<Notify<Notification>, Ok = (), Err: fmt::Display>,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(task): Start<DispatchNotifications<N>>,
    ) -> Result<Self::Ok, Self::Err> {
        let DispatchNotifications {
            notifier,
            mut inbox,
        } = task;
        while let Some(notification) = inbox.recv().await {
            deliver(&notifier, notification).await;
        }
        Ok(())
    }
}

/// Delivers the provided [`Notification`], logging any failure.
async fn deliver<N>(notifier: &N, notification: Notification)
where
    N: Notifier<Notify<Notification>, Ok = (), Err: fmt::Display>,
{
    let kind = notification.kind();
    if let Err(e) = notifier.execute(Notify(notification)).await {
        log::error!("failed to deliver `{kind}` notification: {e}");
    }
}

#[cfg(test)]
mod spec {
    use std::sync::{Arc, Mutex};

    use common::operations::{Notify, Start};
    use derive_more::Display;

    use crate::{
        domain::{transaction::spec::pending, Notification},
        infra::{
            gateway::{mock::Scripted, Outcome},
            Memory, Notifier,
        },
        spec::service,
        task::Outbox,
    };

    use super::DispatchNotifications;

    #[derive(Debug, Display)]
    #[display("unreachable")]
    struct Unreachable;

    /// Notifier failing every other delivery.
    #[derive(Clone, Debug, Default)]
    struct Flaky(Arc<Mutex<Vec<&'static str>>>);

    impl Notifier<Notify<Notification>> for Flaky {
        type Ok = ();
        type Err = Unreachable;

        async fn execute(
            &self,
            Notify(n): Notify<Notification>,
        ) -> Result<(), Unreachable> {
            let mut seen = self.0.lock().unwrap();
            seen.push(n.kind());
            if seen.len() % 2 == 1 {
                return Err(Unreachable);
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn keeps_dispatching_after_failures() {
        let (svc, _) = service(Memory::new(), Scripted::new(Outcome::Success));
        let (outbox, inbox) = Outbox::new();
        let notifier = Flaky::default();
        let mut failed = pending();
        failed.fail("Declined".into(), None, None).unwrap();

        for _ in 0..3 {
            outbox.push(Notification::payment_settled(&failed).unwrap());
        }
        drop(outbox);

        svc.execute(Start(DispatchNotifications::new(notifier.clone(), inbox)))
            .await
            .unwrap();

        assert_eq!(notifier.0.lock().unwrap().len(), 3);
    }
}
