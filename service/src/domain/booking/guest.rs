//! [`Guest`] definitions.

use std::{str::FromStr, sync::LazyLock};

use derive_more::{AsRef, Display};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use serde::Serialize;

#[cfg(doc)]
use crate::domain::BookingRequest;

/// Guest details snapshotted into a [`BookingRequest`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Guest {
    /// Full [`Name`] of this [`Guest`].
    pub name: Name,

    /// [`Email`] of this [`Guest`].
    pub email: Email,

    /// [`Phone`] of this [`Guest`].
    pub phone: Phone,

    /// National identification number of this [`Guest`].
    pub id_number: IdNumber,

    /// Reference to the uploaded identification document.
    pub id_document: IdDocument,

    /// Person to contact in case of emergency, if provided.
    pub emergency_contact: Option<EmergencyContact>,
}

/// Emergency contact of a [`Guest`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EmergencyContact {
    /// [`Name`] of the contact person.
    pub name: Name,

    /// [`Phone`] of the contact person.
    pub phone: Phone,
}

/// Name of a [`Guest`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `name` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= 256
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Email address of a [`Guest`].
///
/// Always stored in lower case, so it identifies the [`Guest`] regardless of
/// how it was typed.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq, Serialize)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Email(String);

impl Email {
    /// Creates a new [`Email`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `address` matches the format and
    /// is lower case.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Creates a new [`Email`] if the given `address` is valid.
    #[must_use]
    pub fn new(address: impl AsRef<str>) -> Option<Self> {
        let address = address.as_ref().trim().to_lowercase();
        Self::check(&address).then_some(Self(address))
    }

    /// Checks whether the given `address` is a valid [`Email`].
    fn check(address: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Email`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@.]+$").expect("valid regex")
        });

        let address = address.as_ref();
        address.len() <= 320 && REGEX.is_match(address)
    }
}

impl FromStr for Email {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Email`")
    }
}

/// Phone number of a [`Guest`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq, Serialize)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Phone(String);

impl Phone {
    /// Creates a new [`Phone`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `number` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// Creates a new [`Phone`] if the given `number` is valid.
    #[must_use]
    pub fn new(number: impl Into<String>) -> Option<Self> {
        let number = number.into();
        Self::check(&number).then_some(Self(number))
    }

    /// Checks whether the given `number` is a valid [`Phone`].
    fn check(number: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Phone`] format: an optional `+`,
        /// then 7 to 15 digits, optionally grouped by spaces or dashes.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^\+?\d(?:[\s-]?\d){6,14}$").expect("valid regex")
        });

        REGEX.is_match(number.as_ref())
    }
}

impl FromStr for Phone {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Phone`")
    }
}

/// National identification number of a [`Guest`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct IdNumber(String);

impl IdNumber {
    /// Creates a new [`IdNumber`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `number` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// Creates a new [`IdNumber`] if the given `number` is valid.
    #[must_use]
    pub fn new(number: impl Into<String>) -> Option<Self> {
        let number = number.into();
        Self::check(&number).then_some(Self(number))
    }

    /// Checks whether the given `number` is a valid [`IdNumber`].
    fn check(number: impl AsRef<str>) -> bool {
        let number = number.as_ref();
        (4..=32).contains(&number.len())
            && number.bytes().all(|b| b.is_ascii_alphanumeric())
    }
}

impl FromStr for IdNumber {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `IdNumber`")
    }
}

/// Reference (object storage key or URL) to an identification document of a
/// [`Guest`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct IdDocument(String);

impl IdDocument {
    /// Creates a new [`IdDocument`] if the given `reference` is valid.
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Option<Self> {
        let reference = reference.into();
        Self::check(&reference).then_some(Self(reference))
    }

    /// Checks whether the given `reference` is a valid [`IdDocument`].
    fn check(reference: impl AsRef<str>) -> bool {
        let reference = reference.as_ref();
        reference.trim() == reference
            && !reference.is_empty()
            && reference.len() <= 2048
    }
}

impl FromStr for IdDocument {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `IdDocument`")
    }
}

#[cfg(test)]
pub(crate) mod spec {
    use super::{Email, Guest, IdDocument, IdNumber, Name, Phone};

    pub(crate) fn guest(email: &str) -> Guest {
        Guest {
            name: Name::new("Ada Obi").unwrap(),
            email: Email::new(email).unwrap(),
            phone: Phone::new("+2348012345678").unwrap(),
            id_number: IdNumber::new("12345678901").unwrap(),
            id_document: IdDocument::new("uploads/ids/ada.png").unwrap(),
            emergency_contact: None,
        }
    }

    #[test]
    fn email_is_normalized() {
        let email = Email::new("  Ada.Obi@Example.COM ").unwrap();

        assert_eq!(AsRef::<str>::as_ref(&email), "ada.obi@example.com");
        assert!(Email::new("not-an-email").is_none());
        assert!(Email::new("a@b").is_none());
        assert!(Email::new("a b@c.com").is_none());
    }

    #[test]
    fn phone_formats() {
        assert!(Phone::new("+2348012345678").is_some());
        assert!(Phone::new("08012345678").is_some());
        assert!(Phone::new("0801-234-5678").is_some());
        assert!(Phone::new("12345").is_none());
        assert!(Phone::new("phone").is_none());
    }

    #[test]
    fn names_and_ids() {
        assert!(Name::new("Ada Obi").is_some());
        assert!(Name::new(" Ada").is_none());
        assert!(Name::new("").is_none());
        assert!(IdNumber::new("12345678901").is_some());
        assert!(IdNumber::new("A1B2").is_some());
        assert!(IdNumber::new("123").is_none());
        assert!(IdNumber::new("1234-5678").is_none());
    }
}
