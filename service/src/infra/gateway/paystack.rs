//! [Paystack] payment [`Gateway`] implementation.
//!
//! [Paystack]: https://paystack.com/docs/api/transaction

use std::{str::FromStr as _, sync::Arc, time::Duration};

use common::{
    money::Currency,
    operations::{Initialize, Verify},
    Money,
};
use secrecy::{ExposeSecret as _, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracerr::Traced;

use crate::{
    domain::transaction,
    infra::gateway::{
        self, Checkout, Gateway, Initialized, Outcome, Verification,
    },
};

/// [`Paystack`] configuration.
#[derive(Debug)]
pub struct Config {
    /// Base URL of the [Paystack] API.
    ///
    /// [Paystack]: https://paystack.com
    pub base_url: String,

    /// Secret API key.
    pub secret_key: SecretString,

    /// URL the customer is redirected to after paying, if any.
    pub callback_url: Option<String>,

    /// Timeout of a single HTTP request.
    pub timeout: Duration,
}

/// [Paystack] payment [`Gateway`].
///
/// [Paystack]: https://paystack.com
#[derive(Clone, Debug)]
pub struct Paystack {
    /// HTTP client.
    client: reqwest::Client,

    /// [`Config`] of this [`Paystack`] client.
    config: Arc<Config>,
}

impl Paystack {
    /// Creates a new [`Paystack`] client with the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If failed to build an HTTP client.
    pub fn new(config: Config) -> Result<Self, Traced<gateway::Error>> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(tracerr::from_and_wrap!(=> gateway::Error))?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    /// Returns the full URL of the provided API `path`.
    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Sends the provided `request` and decodes the `data` of its [`Envelope`]
    /// response along with the raw JSON.
    async fn send<T>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(T, serde_json::Value), Traced<gateway::Error>>
    where
        T: DeserializeOwned,
    {
        let response = request
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await
            .map_err(tracerr::from_and_wrap!(=> gateway::Error))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(tracerr::from_and_wrap!(=> gateway::Error))?;

        let raw = serde_json::from_str::<serde_json::Value>(&body)
            .map_err(|e| {
                if status.is_success() {
                    gateway::Error::Malformed(e.to_string())
                } else {
                    gateway::Error::Rejected(format!("HTTP {status}"))
                }
            })
            .map_err(tracerr::wrap!())?;
        let envelope = Envelope::<T>::deserialize(&raw).map_err(|e| {
            tracerr::new!(gateway::Error::Malformed(e.to_string()))
        });

        let message = |env: &Result<Envelope<T>, _>| {
            env.as_ref()
                .ok()
                .map(|e| e.message.clone())
                .or_else(|| {
                    raw.get("message")
                        .and_then(serde_json::Value::as_str)
                        .map(ToOwned::to_owned)
                })
                .unwrap_or_else(|| format!("HTTP {status}"))
        };
        if !status.is_success() {
            return Err(tracerr::new!(gateway::Error::Rejected(message(
                &envelope
            ))));
        }
        let envelope = envelope?;
        if !envelope.status {
            return Err(tracerr::new!(gateway::Error::Rejected(
                envelope.message
            )));
        }
        let data = envelope.data.ok_or_else(|| {
            tracerr::new!(gateway::Error::Malformed("missing `data`".into()))
        })?;
        Ok((data, raw))
    }
}

impl Gateway<Initialize<Checkout>> for Paystack {
    type Ok = Initialized;
    type Err = Traced<gateway::Error>;

    async fn execute(
        &self,
        Initialize(checkout): Initialize<Checkout>,
    ) -> Result<Self::Ok, Self::Err> {
        let Checkout {
            reference,
            email,
            amount,
            metadata,
        } = checkout;
        let minor_units = amount.minor_units().ok_or_else(|| {
            tracerr::new!(gateway::Error::InvalidAmount(amount))
        })?;

        let body = InitializeRequest {
            email: email.as_ref(),
            amount: minor_units,
            currency: amount.currency.code(),
            reference: reference.as_ref(),
            callback_url: self.config.callback_url.as_deref(),
            metadata,
        };
        let (data, _): (InitializeData, _) = self
            .send(
                self.client
                    .post(self.url("transaction/initialize"))
                    .json(&body),
            )
            .await
            .map_err(tracerr::wrap!())?;

        Ok(Initialized {
            authorization_url: data.authorization_url,
            access_code: data.access_code,
            reference: transaction::Reference::new(data.reference)
                .unwrap_or(reference),
        })
    }
}

impl Gateway<Verify<transaction::Reference>> for Paystack {
    type Ok = Verification;
    type Err = Traced<gateway::Error>;

    async fn execute(
        &self,
        Verify(reference): Verify<transaction::Reference>,
    ) -> Result<Self::Ok, Self::Err> {
        let path = format!("transaction/verify/{reference}");
        let (data, raw): (VerifyData, _) = self
            .send(self.client.get(self.url(&path)))
            .await
            .map_err(tracerr::wrap!())?;

        let outcome = match data.status.as_str() {
            "success" => Outcome::Success,
            "failed" | "abandoned" | "reversed" => Outcome::Failed(
                data.gateway_response
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| format!("Payment {}", data.status)),
            ),
            _ => Outcome::Pending,
        };
        let amount = data
            .amount
            .zip(data.currency.and_then(|c| Currency::from_str(&c).ok()))
            .map(|(units, currency)| Money::from_minor_units(units, currency));

        Ok(Verification {
            outcome,
            gateway_status: data.status,
            amount,
            raw,
        })
    }
}

/// Common envelope of [Paystack] API responses.
///
/// [Paystack]: https://paystack.com
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    /// Indicator whether the request succeeded.
    status: bool,

    /// Human-readable message.
    message: String,

    /// Payload of the response.
    data: Option<T>,
}

/// Body of a `POST /transaction/initialize` request.
#[derive(Debug, Serialize)]
struct InitializeRequest<'a> {
    /// Email of the customer.
    email: &'a str,

    /// Amount in minor units.
    amount: i64,

    /// ISO 4217 currency code.
    currency: &'static str,

    /// Unique reference of the transaction.
    reference: &'a str,

    /// Redirect URL after paying.
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_url: Option<&'a str>,

    /// Arbitrary metadata.
    metadata: serde_json::Value,
}

/// Payload of a `POST /transaction/initialize` response.
#[derive(Debug, Deserialize)]
struct InitializeData {
    /// Checkout URL.
    authorization_url: String,

    /// Checkout access code.
    access_code: String,

    /// Reference of the transaction.
    reference: String,
}

/// Payload of a `GET /transaction/verify/{reference}` response.
#[derive(Debug, Deserialize)]
struct VerifyData {
    /// Status of the transaction.
    status: String,

    /// Amount paid in minor units.
    amount: Option<i64>,

    /// ISO 4217 currency code.
    currency: Option<String>,

    /// Message of the processor.
    gateway_response: Option<String>,
}

#[cfg(test)]
mod spec {
    use std::{str::FromStr as _, time::Duration};

    use common::{
        operations::{Initialize, Verify},
        Money,
    };
    use mockito::Matcher;
    use serde_json::json;

    use crate::{
        domain::{booking::guest, transaction},
        infra::gateway::{self, Checkout, Gateway as _, Outcome},
    };

    use super::{Config, Paystack};

    fn paystack(server: &mockito::Server) -> Paystack {
        Paystack::new(Config {
            base_url: server.url(),
            secret_key: "sk_test_secret".to_owned().into(),
            callback_url: Some("https://shortlet.test/paid".into()),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn reference() -> transaction::Reference {
        transaction::Reference::new("BK-abc123").unwrap()
    }

    #[tokio::test]
    async fn initializes_checkout() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/transaction/initialize")
            .match_header("authorization", "Bearer sk_test_secret")
            .match_body(Matcher::PartialJson(json!({
                "email": "ada@example.com",
                "amount": 9_000_000,
                "currency": "NGN",
                "reference": "BK-abc123",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "status": true,
                    "message": "Authorization URL created",
                    "data": {
                        "authorization_url": "https://checkout.test/xyz",
                        "access_code": "xyz",
                        "reference": "BK-abc123",
                    },
                })
                .to_string(),
            )
            .create_async()
            .await;

        let initialized = paystack(&server)
            .execute(Initialize(Checkout {
                reference: reference(),
                email: guest::Email::new("ada@example.com").unwrap(),
                amount: Money::from_str("90000NGN").unwrap(),
                metadata: json!({}),
            }))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(initialized.authorization_url, "https://checkout.test/xyz");
        assert_eq!(initialized.access_code, "xyz");
        assert_eq!(initialized.reference, reference());
    }

    #[tokio::test]
    async fn surfaces_provider_message_on_rejection() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/transaction/initialize")
            .with_status(400)
            .with_body(
                json!({"status": false, "message": "Invalid key"}).to_string(),
            )
            .create_async()
            .await;

        let err = paystack(&server)
            .execute(Initialize(Checkout {
                reference: reference(),
                email: guest::Email::new("ada@example.com").unwrap(),
                amount: Money::from_str("100NGN").unwrap(),
                metadata: json!({}),
            }))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            gateway::Error::Rejected(m) if m == "Invalid key",
        ));
    }

    #[tokio::test]
    async fn verifies_successful_payment() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/transaction/verify/BK-abc123")
            .with_status(200)
            .with_body(
                json!({
                    "status": true,
                    "message": "Verification successful",
                    "data": {
                        "status": "success",
                        "reference": "BK-abc123",
                        "amount": 9_000_000,
                        "currency": "NGN",
                        "gateway_response": "Approved",
                    },
                })
                .to_string(),
            )
            .create_async()
            .await;

        let verification = paystack(&server)
            .execute(Verify(reference()))
            .await
            .unwrap();

        assert_eq!(verification.outcome, Outcome::Success);
        assert_eq!(verification.gateway_status, "success");
        assert_eq!(
            verification.amount,
            Some(Money::from_str("90000NGN").unwrap()),
        );
        assert_eq!(verification.raw["data"]["reference"], "BK-abc123");
    }

    #[tokio::test]
    async fn maps_abandoned_and_ongoing_payments() {
        let mut server = mockito::Server::new_async().await;
        let _abandoned = server
            .mock("GET", "/transaction/verify/BK-abc123")
            .with_status(200)
            .with_body(
                json!({
                    "status": true,
                    "message": "Verification successful",
                    "data": {"status": "abandoned", "gateway_response": ""},
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _ongoing = server
            .mock("GET", "/transaction/verify/BK-ongoing")
            .with_status(200)
            .with_body(
                json!({
                    "status": true,
                    "message": "Verification successful",
                    "data": {"status": "ongoing"},
                })
                .to_string(),
            )
            .create_async()
            .await;
        let gateway = paystack(&server);

        let abandoned = gateway.execute(Verify(reference())).await.unwrap();
        assert_eq!(
            abandoned.outcome,
            Outcome::Failed("Payment abandoned".into()),
        );

        let ongoing = gateway
            .execute(Verify(transaction::Reference::new("BK-ongoing").unwrap()))
            .await
            .unwrap();
        assert_eq!(ongoing.outcome, Outcome::Pending);
    }

    #[tokio::test]
    async fn rejects_malformed_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/transaction/verify/BK-abc123")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let err = paystack(&server)
            .execute(Verify(reference()))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), gateway::Error::Malformed(_)));
    }
}
