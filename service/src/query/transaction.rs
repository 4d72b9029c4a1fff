//! [`Query`] collection related to [`Transaction`]s.

use common::operations::By;

use crate::domain::{booking, transaction, Transaction};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`Transaction`] by its [`transaction::Reference`].
pub type ByReference =
    DatabaseQuery<By<Option<Transaction>, transaction::Reference>>;

/// Queries all the [`Transaction`]s of a [`BookingRequest`].
///
/// [`BookingRequest`]: crate::domain::BookingRequest
pub type OfBooking = DatabaseQuery<By<Vec<Transaction>, booking::Id>>;
