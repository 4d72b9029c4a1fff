//! [`Webhook`] [`Notifier`] implementation.

use std::time::Duration;

use common::operations::Notify;
use tracerr::Traced;

use crate::{
    domain::Notification,
    infra::notifier::{self, Notifier},
};

/// [`Notifier`] POSTing every [`Notification`] as JSON to an admin URL.
#[derive(Clone, Debug)]
pub struct Webhook {
    /// HTTP client.
    client: reqwest::Client,

    /// URL to POST [`Notification`]s to.
    url: String,
}

impl Webhook {
    /// Creates a new [`Webhook`] notifier POSTing to the provided `url`.
    ///
    /// # Errors
    ///
    /// If failed to build an HTTP client.
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, Traced<notifier::Error>> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(tracerr::from_and_wrap!(=> notifier::Error))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl Notifier<Notify<Notification>> for Webhook {
    type Ok = ();
    type Err = Traced<notifier::Error>;

    async fn execute(
        &self,
        Notify(notification): Notify<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        let status = self
            .client
            .post(&self.url)
            .json(&notification)
            .send()
            .await
            .map_err(tracerr::from_and_wrap!(=> notifier::Error))?
            .status();
        if !status.is_success() {
            return Err(tracerr::new!(notifier::Error::Rejected(
                status.as_u16()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::operations::Notify;
    use mockito::Matcher;
    use serde_json::json;

    use crate::{
        domain::{transaction::spec::pending, Notification},
        infra::notifier::{self, Notifier as _},
    };

    use super::Webhook;

    #[tokio::test]
    async fn posts_notification_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hooks")
            .match_body(Matcher::PartialJson(json!({
                "kind": "payment_failed",
                "payload": {"reason": "Declined"},
            })))
            .with_status(204)
            .create_async()
            .await;
        let mut tx = pending();
        tx.fail("Declined".into(), None, None).unwrap();
        let notification = Notification::payment_settled(&tx).unwrap();

        Webhook::new(format!("{}/hooks", server.url()), Duration::from_secs(5))
            .unwrap()
            .execute(Notify(notification))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn reports_rejection() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/hooks")
            .with_status(500)
            .create_async()
            .await;
        let mut tx = pending();
        tx.fail("Declined".into(), None, None).unwrap();

        let url = format!("{}/hooks", server.url());
        let err = Webhook::new(url, Duration::from_secs(5))
            .unwrap()
            .execute(Notify(Notification::payment_settled(&tx).unwrap()))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), notifier::Error::Rejected(500)));
    }
}
