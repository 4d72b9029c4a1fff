//! [`Query`] collection related to a single [`BookingRequest`].

use common::operations::By;

use crate::domain::{booking, BookingRequest};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`BookingRequest`] by its [`booking::Id`].
pub type ById = DatabaseQuery<By<Option<BookingRequest>, booking::Id>>;
