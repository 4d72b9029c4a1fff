//! [`Stay`] definitions.

use common::Date;
use derive_more::{Display, Error};
use serde::Serialize;

/// Half-open interval of calendar dates `[check_in, check_out)` a guest
/// occupies a property for.
///
/// The check-out date itself is not occupied, so back-to-back stays (one
/// checking out the day another checks in) never overlap.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct Stay {
    /// First occupied night.
    check_in: Date,

    /// Day the property is vacated.
    check_out: Date,
}

impl Stay {
    /// Creates a new [`Stay`] out of the provided dates.
    ///
    /// # Errors
    ///
    /// If `check_out` doesn't come strictly after `check_in` (zero-night stays
    /// are not stays at all).
    pub fn new(check_in: Date, check_out: Date) -> Result<Self, InvalidStay> {
        if check_out <= check_in {
            return Err(InvalidStay { check_in, check_out });
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    /// Creates a new [`Stay`] without checking the dates.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `check_out` comes strictly after
    /// `check_in`.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(check_in: Date, check_out: Date) -> Self {
        Self {
            check_in,
            check_out,
        }
    }

    /// Returns the check-in [`Date`] of this [`Stay`].
    #[must_use]
    pub fn check_in(&self) -> Date {
        self.check_in
    }

    /// Returns the check-out [`Date`] of this [`Stay`].
    #[must_use]
    pub fn check_out(&self) -> Date {
        self.check_out
    }

    /// Returns the number of nights in this [`Stay`].
    #[must_use]
    pub fn nights(&self) -> u32 {
        // Always positive by construction.
        u32::try_from(self.check_in.days_until(self.check_out)).unwrap_or(0)
    }

    /// Indicates whether this [`Stay`] overlaps with the `other` one.
    ///
    /// Symmetric: `a.overlaps(&b) == b.overlaps(&a)`.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.check_in < other.check_out && self.check_out > other.check_in
    }
}

/// Error of constructing a [`Stay`] whose check-out doesn't follow check-in.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("check-out `{check_out}` must be after check-in `{check_in}`")]
pub struct InvalidStay {
    /// Provided check-in [`Date`].
    #[error(not(source))]
    pub check_in: Date,

    /// Provided check-out [`Date`].
    #[error(not(source))]
    pub check_out: Date,
}

#[cfg(test)]
pub(crate) mod spec {
    use common::Date;

    use super::Stay;

    pub(crate) fn stay(from: &str, to: &str) -> Stay {
        Stay::new(Date::parse(from).unwrap(), Date::parse(to).unwrap()).unwrap()
    }

    #[test]
    fn rejects_zero_and_negative_nights() {
        let d = Date::parse("2025-03-01").unwrap();
        let before = Date::parse("2025-02-28").unwrap();

        assert!(Stay::new(d, d).is_err());
        assert!(Stay::new(d, before).is_err());
        assert_eq!(stay("2025-03-01", "2025-03-05").nights(), 4);
    }

    #[test]
    fn overlapping_stays_conflict() {
        let existing = stay("2025-03-03", "2025-03-07");
        let requested = stay("2025-03-01", "2025-03-04");

        assert!(requested.overlaps(&existing));
        assert!(existing.overlaps(&requested));
    }

    #[test]
    fn back_to_back_stays_do_not_conflict() {
        let existing = stay("2025-03-03", "2025-03-07");
        let before = stay("2025-03-01", "2025-03-03");
        let after = stay("2025-03-07", "2025-03-09");

        assert!(!before.overlaps(&existing));
        assert!(!existing.overlaps(&before));
        assert!(!after.overlaps(&existing));
        assert!(!existing.overlaps(&after));
    }

    #[test]
    fn overlap_matches_interval_formula_symmetrically() {
        let days = [
            "2025-03-01",
            "2025-03-02",
            "2025-03-03",
            "2025-03-04",
            "2025-03-05",
        ];
        let stays = days
            .iter()
            .enumerate()
            .flat_map(|(i, from)| {
                days[i + 1..].iter().map(move |to| stay(from, to))
            })
            .collect::<Vec<_>>();

        for a in &stays {
            for b in &stays {
                let expected = a.check_in() < b.check_out()
                    && a.check_out() > b.check_in();
                assert_eq!(a.overlaps(b), expected, "{a:?} vs {b:?}");
                assert_eq!(a.overlaps(b), b.overlaps(a), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn contained_stays_conflict() {
        let outer = stay("2025-03-01", "2025-03-10");
        let inner = stay("2025-03-04", "2025-03-05");

        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
        assert!(outer.overlaps(&outer));
    }
}
