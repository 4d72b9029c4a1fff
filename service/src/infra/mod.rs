//! Infrastructure layer.

pub mod database;
pub mod gateway;
pub mod notifier;

#[cfg(any(test, feature = "memory"))]
pub use self::database::{memory, Memory};
pub use self::{database::Database, gateway::Gateway, notifier::Notifier};
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
#[cfg(feature = "paystack")]
pub use self::gateway::Paystack;
