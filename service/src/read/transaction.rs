//! [`Transaction`]-related read definitions.

#[cfg(doc)]
use crate::domain::Transaction;
use crate::domain::transaction;

/// Selector of [`transaction::Status::Pending`] [`Transaction`]s created
/// before some moment.
///
/// Never [`Checked`] ones go first, then the ones [`Checked`] the longest ago.
#[derive(Clone, Copy, Debug)]
pub struct StalePending {
    /// Only [`Transaction`]s created before this moment are selected.
    pub created_before: transaction::CreationDateTime,

    /// Maximum number of [`Transaction`]s to select.
    pub limit: u16,
}

/// Record of a [`transaction::Status::Pending`] [`Transaction`] being
/// verified without getting settled.
#[derive(Clone, Debug)]
pub struct Checked {
    /// [`transaction::Reference`] of the checked [`Transaction`].
    pub reference: transaction::Reference,

    /// Moment of the check.
    pub at: transaction::CheckDateTime,
}
