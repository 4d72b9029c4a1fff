//! [`Config`]-related definitions.

use std::time;

use common::{date::UtcOffset, money::Currency, Percent};
use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use derive_more::{Display, Error};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Deserialize;
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Service configuration.
    pub service: Service,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Paystack configuration.
    pub paystack: Paystack,

    /// Notifications configuration.
    pub notifications: Notifications,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Service configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// [`Currency`] properties are priced in.
    #[default(Currency::Ngn)]
    pub currency: Currency,

    /// Percentage of the total charged when paying a deposit.
    #[default(50)]
    pub deposit_percent: u8,

    /// Offset of the business time zone from UTC, in minutes.
    ///
    /// Decides which calendar day is today when rejecting past check-ins.
    #[default(60)]
    pub utc_offset_minutes: i16,

    /// Service tasks configuration.
    pub tasks: Tasks,
}

impl TryFrom<Service> for service::Config {
    type Error = InvalidService;

    fn try_from(value: Service) -> Result<Self, Self::Error> {
        let Service {
            currency,
            deposit_percent,
            utc_offset_minutes,
            tasks: Tasks {
                reconcile_pending_payments,
            },
        } = value;

        Ok(Self {
            currency,
            deposit: Percent::new(Decimal::from(deposit_percent))
                .ok_or(InvalidService::Deposit(deposit_percent))?,
            utc_offset: UtcOffset::from_whole_seconds(
                i32::from(utc_offset_minutes) * 60,
            )
            .map_err(|_| InvalidService::UtcOffset(utc_offset_minutes))?,
            reconcile_pending_payments: reconcile_pending_payments.into(),
        })
    }
}

/// Error of an invalid [`Service`] configuration.
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum InvalidService {
    /// Deposit percentage is out of `0..=100` range.
    #[display("`service.deposit_percent` must be within 0..=100, got {_0}")]
    Deposit(#[error(not(source))] u8),

    /// UTC offset exceeds 26 hours.
    #[display("`service.utc_offset_minutes` is out of range: {_0}")]
    UtcOffset(#[error(not(source))] i16),
}

/// Service tasks configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Tasks {
    /// `ReconcilePendingPayments` task configuration.
    pub reconcile_pending_payments: Task,
}

/// Service task configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Task {
    /// Task execution interval.
    #[default(time::Duration::from_secs(5 * 60))]
    #[serde(with = "humantime_serde")]
    pub interval: time::Duration,

    /// Timeout after which the entities will be considered stale.
    #[default(time::Duration::from_secs(30 * 60))]
    #[serde(with = "humantime_serde")]
    pub timeout: time::Duration,

    /// Maximum number of entities processed in a single run.
    #[default(50)]
    pub batch: u16,
}

impl From<Task> for service::task::reconcile_pending_payments::Config {
    fn from(value: Task) -> Self {
        let Task {
            interval,
            timeout,
            batch,
        } = value;
        Self {
            interval,
            timeout,
            batch,
        }
    }
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// [Paystack] configuration.
///
/// [Paystack]: https://paystack.com
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Paystack {
    /// Base URL of the API.
    #[default("https://api.paystack.co".to_owned())]
    pub base_url: String,

    /// Secret API key.
    #[default(SecretString::from(String::new()))]
    pub secret_key: SecretString,

    /// URL the guest is redirected to after paying.
    pub callback_url: Option<String>,

    /// Timeout of a single request.
    #[default(time::Duration::from_secs(30))]
    #[serde(with = "humantime_serde")]
    pub timeout: time::Duration,
}

impl From<Paystack> for service::infra::gateway::paystack::Config {
    fn from(value: Paystack) -> Self {
        let Paystack {
            base_url,
            secret_key,
            callback_url,
            timeout,
        } = value;

        Self {
            base_url,
            secret_key,
            callback_url,
            timeout,
        }
    }
}

/// Notifications configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Notifications {
    /// URL to POST notifications to.
    ///
    /// Notifications are only logged if [`None`].
    pub webhook_url: Option<String>,

    /// Timeout of a single delivery.
    #[default(time::Duration::from_secs(10))]
    #[serde(with = "humantime_serde")]
    pub timeout: time::Duration,
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::money::Currency;
    use rust_decimal::Decimal;

    use super::{InvalidService, Service, Task, Tasks};

    #[test]
    fn defaults_to_half_deposit() {
        let config = service::Config::try_from(Service::default()).unwrap();

        assert_eq!(config.currency, Currency::Ngn);
        assert_eq!(config.deposit.value(), Decimal::from(50));
        assert_eq!(config.reconcile_pending_payments.batch, 50);
        assert_eq!(config.utc_offset.whole_minutes(), 60);
    }

    #[test]
    fn rejects_out_of_range_deposit() {
        let err = service::Config::try_from(Service {
            deposit_percent: 120,
            ..Service::default()
        })
        .unwrap_err();

        assert!(matches!(err, InvalidService::Deposit(120)));
    }

    #[test]
    fn converts_utc_offset() {
        let config = service::Config::try_from(Service {
            utc_offset_minutes: -330,
            ..Service::default()
        })
        .unwrap();
        assert_eq!(config.utc_offset.whole_hours(), -5);
        assert_eq!(config.utc_offset.minutes_past_hour(), -30);

        let err = service::Config::try_from(Service {
            utc_offset_minutes: 2000,
            ..Service::default()
        })
        .unwrap_err();
        assert!(matches!(err, InvalidService::UtcOffset(2000)));
    }

    #[test]
    fn passes_task_timings_through() {
        let config = service::Config::try_from(Service {
            tasks: Tasks {
                reconcile_pending_payments: Task {
                    interval: Duration::from_secs(10),
                    timeout: Duration::from_secs(20),
                    batch: 3,
                },
            },
            ..Service::default()
        })
        .unwrap();

        let task = config.reconcile_pending_payments;
        assert_eq!(task.interval, Duration::from_secs(10));
        assert_eq!(task.timeout, Duration::from_secs(20));
        assert_eq!(task.batch, 3);
    }
}
