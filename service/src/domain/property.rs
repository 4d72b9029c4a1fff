//! [`Property`] definitions.
//!
//! Listing data of properties (descriptions, galleries, prices) lives outside
//! of this service, so only their identity is modeled here.

use derive_more::{AsRef, Display};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::Serialize;

#[cfg(doc)]
use crate::domain::BookingRequest;

/// Marker type of a bookable property (an apartment listing).
#[derive(Clone, Copy, Debug)]
pub struct Property;

/// ID of a [`Property`] as referenced by [`BookingRequest`]s.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq, Serialize)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Id(String);

impl Id {
    /// Creates a new [`Id`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `id` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a new [`Id`] if the given `id` is valid.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        Self::check(&id).then_some(Self(id))
    }

    /// Checks whether the given `id` is a valid [`Id`]: a non-empty slug of
    /// ASCII alphanumerics, `-` and `_`, at most 64 characters long.
    fn check(id: impl AsRef<str>) -> bool {
        let id = id.as_ref();
        !id.is_empty()
            && id.len() <= 64
            && id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    }
}

impl std::str::FromStr for Id {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `property::Id`")
    }
}

#[cfg(test)]
mod spec {
    use super::Id;

    #[test]
    fn validates_slugs() {
        assert!(Id::new("lekki-2br_apartment").is_some());
        assert!(Id::new("64f1c2aa9e").is_some());
        assert!(Id::new("").is_none());
        assert!(Id::new("with space").is_none());
        assert!(Id::new("../etc").is_none());
        assert!(Id::new("a".repeat(65)).is_none());
    }
}
