//! [`Notifier`] implementations.

#[cfg(feature = "paystack")]
pub mod webhook;

use std::convert::Infallible;

use common::operations::Notify;
use derive_more::{Display, Error as StdError, From};
use tracerr::Traced;
use tracing as log;

use crate::domain::Notification;

#[cfg(feature = "paystack")]
pub use self::webhook::Webhook;

/// Notification delivery operation.
pub use common::Handler as Notifier;

/// [`Notifier`] logging every [`Notification`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Log;

impl Notifier<Notify<Notification>> for Log {
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Notify(notification): Notify<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        log::info!(
            kind = notification.kind(),
            "notification: {}",
            serde_json::to_string(&notification)
                .unwrap_or_else(|e| format!("<unserializable: {e}>")),
        );
        Ok(())
    }
}

/// Any [`Notifier`] configured at runtime.
#[derive(Clone, Debug)]
pub enum Dynamic {
    /// [`Log`] notifier.
    Log(Log),

    /// [`Webhook`] notifier.
    #[cfg(feature = "paystack")]
    Webhook(Webhook),
}

impl Notifier<Notify<Notification>> for Dynamic {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        notify: Notify<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        match self {
            Self::Log(n) => match n.execute(notify).await {
                Ok(()) => Ok(()),
                Err(e) => match e {},
            },
            #[cfg(feature = "paystack")]
            Self::Webhook(n) => {
                n.execute(notify).await.map_err(tracerr::wrap!())
            }
        }
    }
}

/// [`Notifier`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// HTTP request failed.
    #[cfg(feature = "paystack")]
    #[display("HTTP request failed: {_0}")]
    Request(reqwest::Error),

    /// Receiver rejected the [`Notification`].
    #[display("`Notification` is rejected with HTTP {_0}")]
    #[from(ignore)]
    Rejected(#[error(not(source))] u16),
}
