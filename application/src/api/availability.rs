//! Property availability API definitions.

use axum::Extension;
use common::Date;
use serde::{Deserialize, Serialize};
use service::{
    domain::{property, Stay},
    query,
    read::{reservation::Overlapping, Reservation},
    Query as _,
};

use crate::{
    api::{self, Json, Path},
    define_error, AsError, Error, Service,
};

define_error! {
    enum InvalidInput {
        #[code = "INVALID_PROPERTY_ID"]
        #[status = BAD_REQUEST]
        #[message = "Property ID is invalid"]
        PropertyId,

        #[code = "INVALID_CHECK_IN_DATE"]
        #[status = BAD_REQUEST]
        #[message = "Check-in date must be `YYYY-MM-DD`"]
        CheckInDate,

        #[code = "INVALID_CHECK_OUT_DATE"]
        #[status = BAD_REQUEST]
        #[message = "Check-out date must be `YYYY-MM-DD`"]
        CheckOutDate,

        #[code = "INVALID_STAY"]
        #[status = BAD_REQUEST]
        #[message = "Check-out date must be after check-in date"]
        Stay,
    }
}

/// Body of a `POST /apartments/{id}/check-availability` request.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    /// First night, `YYYY-MM-DD`.
    pub check_in_date: String,

    /// Day of leaving, `YYYY-MM-DD`.
    pub check_out_date: String,
}

impl CheckRequest {
    /// Converts this [`CheckRequest`] into an [`Overlapping`] selector for the
    /// provided property.
    ///
    /// # Errors
    ///
    /// If the dates are malformed or don't form a [`Stay`].
    pub fn into_selector(
        self,
        property_id: property::Id,
    ) -> Result<Overlapping, Error> {
        let check_in =
            api::date(&self.check_in_date, InvalidInput::CheckInDate)?;
        let check_out =
            api::date(&self.check_out_date, InvalidInput::CheckOutDate)?;

        Ok(Overlapping {
            property_id,
            stay: Stay::new(check_in, check_out)
                .map_err(|_| InvalidInput::Stay)?,
        })
    }
}

/// Range of dates a property is reserved for.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservedRange {
    /// First occupied night.
    pub start_date: Date,

    /// Day the property is vacated.
    pub end_date: Date,

    /// Always `booking`.
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl From<Reservation> for ReservedRange {
    fn from(r: Reservation) -> Self {
        Self {
            start_date: r.stay.check_in(),
            end_date: r.stay.check_out(),
            kind: "booking",
        }
    }
}

/// Response of an availability check.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    /// Whether the requested dates are free.
    pub available: bool,

    /// Reservation the requested dates conflict with, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict_details: Option<ReservedRange>,
}

/// Parses a property ID provided in a path.
fn property_id(input: String) -> Result<property::Id, InvalidInput> {
    property::Id::new(input).ok_or(InvalidInput::PropertyId)
}

/// Checks whether a property is free for the requested dates.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_*` - malformed input.
#[tracing::instrument(
    skip_all,
    fields(
        http.name = "checkAvailability",
        property.id = %id,
        stay.check_in = %req.check_in_date,
        stay.check_out = %req.check_out_date,
    ),
)]
pub async fn check(
    Extension(service): Extension<Service>,
    Path(id): Path<String>,
    Json(req): Json<CheckRequest>,
) -> Result<Json<Availability>, Error> {
    let selector = req.into_selector(property_id(id)?)?;

    let conflict = service
        .execute(query::availability::Check::by(selector))
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(Availability {
        available: conflict.is_none(),
        conflict_details: conflict.map(Into::into),
    }))
}

/// Lists the reserved date ranges of a property for calendar display.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_PROPERTY_ID` - malformed property ID.
#[tracing::instrument(
    skip_all,
    fields(http.name = "listReservations", property.id = %id),
)]
pub async fn list(
    Extension(service): Extension<Service>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ReservedRange>>, Error> {
    let reserved = service
        .execute(query::availability::Unavailable::by(property_id(id)?))
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(reserved.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod spec {
    use serde_json::json;
    use service::{
        domain::{booking, property},
        read::{reservation::Source, Reservation},
    };

    use super::{Availability, CheckRequest, ReservedRange};

    fn property() -> property::Id {
        property::Id::new("apt-1").unwrap()
    }

    fn check(from: &str, to: &str) -> CheckRequest {
        CheckRequest {
            check_in_date: from.into(),
            check_out_date: to.into(),
        }
    }

    #[test]
    fn reduces_date_times_to_local_dates() {
        let selector = check("2030-03-01T00:30:00+01:00", "2030-03-03")
            .into_selector(property())
            .unwrap();

        assert_eq!(selector.stay.check_in().to_string(), "2030-03-01");
        assert_eq!(selector.stay.nights(), 2);
    }

    #[test]
    fn rejects_zero_night_stays() {
        let err = check("2030-03-03", "2030-03-03")
            .into_selector(property())
            .unwrap_err();

        assert_eq!(err.code, "INVALID_STAY");
    }

    #[test]
    fn renders_conflict_details() {
        let stay = check("2030-03-03", "2030-03-07")
            .into_selector(property())
            .unwrap()
            .stay;
        let conflict = Reservation {
            source: Source::Booking(booking::Id::new()),
            stay,
        };

        let free = Availability {
            available: true,
            conflict_details: None,
        };
        let taken = Availability {
            available: false,
            conflict_details: Some(ReservedRange::from(conflict)),
        };

        assert_eq!(
            serde_json::to_value(free).unwrap(),
            json!({"available": true}),
        );
        assert_eq!(
            serde_json::to_value(taken).unwrap(),
            json!({
                "available": false,
                "conflictDetails": {
                    "startDate": "2030-03-03",
                    "endDate": "2030-03-07",
                    "type": "booking",
                },
            }),
        );
    }
}
