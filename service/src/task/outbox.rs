//! [`Outbox`] of [`Notification`]s.

use tokio::sync::mpsc;
use tracing as log;

use crate::domain::Notification;

/// Queue of [`Notification`]s to be delivered in background.
///
/// [`Notification`]s are pushed only after the state they describe is
/// committed, so a slow or failing delivery never affects it.
#[derive(Clone, Debug)]
pub struct Outbox(mpsc::UnboundedSender<Notification>);

impl Outbox {
    /// Creates a new [`Outbox`] along with the [`Inbox`] draining it.
    #[must_use]
    pub fn new() -> (Self, Inbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), Inbox(rx))
    }

    /// Pushes the provided [`Notification`] for delivery.
    ///
    /// Never fails: if nothing drains this [`Outbox`] anymore, the
    /// [`Notification`] is logged and dropped.
    pub fn push(&self, notification: Notification) {
        if let Err(mpsc::error::SendError(n)) = self.0.send(notification) {
            log::warn!(
                "`Outbox` is closed, dropping `{}` notification",
                n.kind(),
            );
        }
    }
}

/// Receiving end of an [`Outbox`].
#[derive(Debug)]
pub struct Inbox(mpsc::UnboundedReceiver<Notification>);

impl Inbox {
    /// Receives the next [`Notification`].
    ///
    /// [`None`] is returned once all the [`Outbox`]es are dropped.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.0.recv().await
    }

    /// Returns the underlying [`mpsc::UnboundedReceiver`].
    #[must_use]
    pub fn into_inner(self) -> mpsc::UnboundedReceiver<Notification> {
        self.0
    }
}
