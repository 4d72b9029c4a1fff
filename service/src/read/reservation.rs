//! [`Reservation`] read definitions.

use crate::domain::{booking, property, tenant, Stay};
#[cfg(doc)]
use crate::domain::{BookingRequest, Tenant};

/// [`Stay`] blocking a property's calendar.
///
/// Either a non-cancelled [`Tenant`] or a paid [`BookingRequest`] which isn't
/// converted into a [`Tenant`] yet.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Reservation {
    /// [`Source`] of this [`Reservation`].
    pub source: Source,

    /// Reserved [`Stay`].
    pub stay: Stay,
}

/// Entity a [`Reservation`] originates from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Source {
    /// [`Tenant`] occupying the property.
    Tenant(tenant::Id),

    /// Approved [`BookingRequest`].
    Booking(booking::Id),
}

/// Selector of the first [`Reservation`] of a property overlapping with a
/// [`Stay`].
#[derive(Clone, Debug)]
pub struct Overlapping {
    /// ID of the property to look [`Reservation`]s of.
    pub property_id: property::Id,

    /// [`Stay`] to check overlapping with.
    pub stay: Stay,
}
