//! [`Database`]-related implementations.

#[cfg(any(test, feature = "memory"))]
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

#[cfg(any(test, feature = "memory"))]
pub use self::memory::Memory;
#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
pub use common::Handler as Database;

/// Name of the unique constraint on the idempotency key of a
/// [`Tenant`](crate::domain::Tenant).
pub const TENANT_KEY_CONSTRAINT: &str = "tenants_key_idx";

/// Name of the unique constraint allowing a single successful
/// [`Transaction`](crate::domain::Transaction) per booking request.
pub const SINGLE_SUCCESS_CONSTRAINT: &str = "transactions_single_success_idx";

/// Name of the unique constraint on a
/// [`Transaction`](crate::domain::Transaction) reference.
pub const REFERENCE_CONSTRAINT: &str = "transactions_reference_idx";

/// Name of the unique constraint on a single usage of a discount code by a
/// user.
pub const DISCOUNT_USAGE_CONSTRAINT: &str = "discount_code_usages_pkey";

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),

    #[cfg(any(test, feature = "memory"))]
    /// [`Memory`] error.
    Memory(memory::Error),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint
    /// (or any one, if [`None`]).
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_unique_violation(constraint),
            #[cfg(any(test, feature = "memory"))]
            Self::Memory(e) => e.is_unique_violation(constraint),
        }
    }
}
