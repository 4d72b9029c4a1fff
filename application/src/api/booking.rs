//! [`BookingRequest`]-related API definitions.

use axum::Extension;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, create_booking_request},
    domain::{
        booking::{self, guest, Guests},
        discount, property, tenant, BookingRequest, Guest, Stay,
    },
    query, Command as _,
};

use crate::{
    api::{self, discount::rejection, Amount, Json, Path},
    define_error, AsError, Error, Service,
};

define_error! {
    enum InvalidInput {
        #[code = "INVALID_PROPERTY_ID"]
        #[status = BAD_REQUEST]
        #[message = "Property ID is invalid"]
        PropertyId,

        #[code = "INVALID_GUEST_NAME"]
        #[status = BAD_REQUEST]
        #[message = "Guest name is invalid"]
        GuestName,

        #[code = "INVALID_GUEST_EMAIL"]
        #[status = BAD_REQUEST]
        #[message = "Guest email is invalid"]
        GuestEmail,

        #[code = "INVALID_GUEST_PHONE"]
        #[status = BAD_REQUEST]
        #[message = "Guest phone number is invalid"]
        GuestPhone,

        #[code = "INVALID_ID_NUMBER"]
        #[status = BAD_REQUEST]
        #[message = "Identification number is invalid"]
        IdNumber,

        #[code = "INVALID_ID_DOCUMENT"]
        #[status = BAD_REQUEST]
        #[message = "Identification document reference is invalid"]
        IdDocument,

        #[code = "INVALID_EMERGENCY_CONTACT"]
        #[status = BAD_REQUEST]
        #[message = "Emergency contact name or phone number is invalid"]
        EmergencyContact,

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

        #[code = "INVALID_GUESTS"]
        #[status = BAD_REQUEST]
        #[message = "At least one guest must stay"]
        Guests,

        #[code = "INVALID_DISCOUNT_CODE"]
        #[status = BAD_REQUEST]
        #[message = "Discount code must be 6 letters or digits"]
        DiscountCode,

        #[code = "INVALID_BOOKING_ID"]
        #[status = BAD_REQUEST]
        #[message = "Booking request ID is invalid"]
        BookingId,
    }
}

define_error! {
    enum NotFound {
        #[code = "BOOKING_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "Booking request not found"]
        Booking,
    }
}

/// Body of a `POST /bookings` request.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    /// ID of the property to book.
    pub property_id: String,

    /// Guest details.
    pub guest: GuestInput,

    /// Stay details.
    pub stay: StayInput,

    /// Discount code to apply.
    #[serde(default)]
    pub discount_code: Option<String>,
}

/// Guest details of a [`CreateRequest`].
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestInput {
    /// Full name.
    pub name: String,

    /// Email address.
    pub email: String,

    /// Phone number.
    pub phone: String,

    /// Identification number.
    pub id_number: String,

    /// Reference to an uploaded identification document.
    pub id_document: String,

    /// Emergency contact person.
    #[serde(default)]
    pub emergency_contact: Option<EmergencyContactInput>,
}

/// Emergency contact of a [`GuestInput`].
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContactInput {
    /// Full name.
    pub name: String,

    /// Phone number.
    pub phone: String,
}

/// Stay details of a [`CreateRequest`].
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StayInput {
    /// First night, `YYYY-MM-DD`.
    pub check_in_date: String,

    /// Day of leaving, `YYYY-MM-DD`.
    pub check_out_date: String,

    /// Number of guests staying.
    pub guests: u16,

    /// Price of a single night.
    #[serde(with = "rust_decimal::serde::float")]
    pub price_per_night: Decimal,
}

impl TryFrom<GuestInput> for Guest {
    type Error = InvalidInput;

    fn try_from(input: GuestInput) -> Result<Self, Self::Error> {
        let GuestInput {
            name,
            email,
            phone,
            id_number,
            id_document,
            emergency_contact,
        } = input;

        Ok(Self {
            name: guest::Name::new(name).ok_or(InvalidInput::GuestName)?,
            email: guest::Email::new(email).ok_or(InvalidInput::GuestEmail)?,
            phone: guest::Phone::new(phone).ok_or(InvalidInput::GuestPhone)?,
            id_number: guest::IdNumber::new(id_number)
                .ok_or(InvalidInput::IdNumber)?,
            id_document: guest::IdDocument::new(id_document)
                .ok_or(InvalidInput::IdDocument)?,
            emergency_contact: emergency_contact
                .map(|c| {
                    guest::Name::new(c.name)
                        .zip(guest::Phone::new(c.phone))
                        .map(|(name, phone)| guest::EmergencyContact {
                            name,
                            phone,
                        })
                        .ok_or(InvalidInput::EmergencyContact)
                })
                .transpose()?,
        })
    }
}

impl TryFrom<CreateRequest> for command::CreateBookingRequest {
    type Error = Error;

    fn try_from(req: CreateRequest) -> Result<Self, Self::Error> {
        let CreateRequest {
            property_id,
            guest,
            stay:
                StayInput {
                    check_in_date,
                    check_out_date,
                    guests,
                    price_per_night,
                },
            discount_code,
        } = req;

        let check_in = api::date(&check_in_date, InvalidInput::CheckInDate)?;
        let check_out =
            api::date(&check_out_date, InvalidInput::CheckOutDate)?;

        Ok(Self {
            property_id: property::Id::new(property_id)
                .ok_or(InvalidInput::PropertyId)?,
            guest: guest.try_into()?,
            stay: Stay::new(check_in, check_out)
                .map_err(|_| InvalidInput::Stay)?,
            guests: Guests::new(guests).ok_or(InvalidInput::Guests)?,
            price_per_night,
            discount_code: discount_code
                .filter(|c| !c.trim().is_empty())
                .map(|c| {
                    discount::Code::new(c).ok_or(InvalidInput::DiscountCode)
                })
                .transpose()?,
        })
    }
}

/// [`BookingRequest`] as rendered in responses.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// ID of the [`BookingRequest`].
    pub id: booking::Id,

    /// ID of the booked property.
    pub property_id: property::Id,

    /// Guest contact details.
    pub guest: GuestContact,

    /// Priced stay.
    pub stay: BookedStay,

    /// Applied discount, if any.
    pub discount: Option<Discount>,

    /// Status of the [`BookingRequest`].
    pub status: booking::Status,

    /// ID of the tenancy the [`BookingRequest`] was converted to.
    pub converted_to_tenant: Option<tenant::Id>,

    /// Audit log.
    pub communications: Vec<Note>,

    /// RFC 3339 creation date and time.
    pub created_at: String,

    /// RFC 3339 last modification date and time.
    pub updated_at: String,
}

/// Contact details of a [`Guest`].
///
/// Identification details are never rendered back.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestContact {
    /// Full name.
    pub name: guest::Name,

    /// Email address.
    pub email: guest::Email,

    /// Phone number.
    pub phone: guest::Phone,
}

/// Priced [`Stay`] of a [`Booking`].
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedStay {
    /// First night.
    pub check_in_date: common::Date,

    /// Day of leaving.
    pub check_out_date: common::Date,

    /// Number of nights.
    pub nights: u32,

    /// Number of guests.
    pub guests: u16,

    /// Price of a single night.
    pub price_per_night: Amount,

    /// Price before discount.
    pub subtotal: Amount,

    /// Amount to pay.
    pub total_amount: Amount,
}

/// Entry of a [`Booking`] audit log.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Human-readable message.
    pub message: String,

    /// RFC 3339 date and time of the entry.
    pub created_at: String,
}

/// Discount applied to a [`Booking`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    /// Applied discount code.
    pub code: discount::Code,

    /// Subtracted amount.
    pub discount_amount: Amount,
}

impl From<BookingRequest> for Booking {
    fn from(req: BookingRequest) -> Self {
        let BookingRequest {
            id,
            property_id,
            guest,
            stay,
            discount,
            status,
            converted_to_tenant,
            communications,
            created_at,
            updated_at,
        } = req;

        Self {
            id,
            property_id,
            guest: GuestContact {
                name: guest.name,
                email: guest.email,
                phone: guest.phone,
            },
            stay: BookedStay {
                check_in_date: stay.stay.check_in(),
                check_out_date: stay.stay.check_out(),
                nights: stay.nights(),
                guests: stay.guests.into(),
                price_per_night: stay.price_per_night.into(),
                subtotal: stay.subtotal.into(),
                total_amount: stay.total.into(),
            },
            discount: discount.map(|d| Discount {
                code: d.code,
                discount_amount: d.amount.into(),
            }),
            status,
            converted_to_tenant,
            communications: communications
                .into_iter()
                .map(|c| Note {
                    message: c.message,
                    created_at: c.created_at.to_rfc3339(),
                })
                .collect(),
            created_at: created_at.to_rfc3339(),
            updated_at: updated_at.to_rfc3339(),
        }
    }
}

/// Response of a successfully created [`BookingRequest`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Created {
    /// Always `true`.
    pub success: bool,

    /// ID of the created [`BookingRequest`].
    pub booking_id: booking::Id,

    /// Created [`BookingRequest`].
    pub booking: Booking,
}

/// Response of a found [`BookingRequest`].
#[derive(Clone, Debug, Serialize)]
pub struct Found {
    /// Always `true`.
    pub success: bool,

    /// Found [`BookingRequest`].
    pub booking: Booking,
}

/// Submits a new [`BookingRequest`] awaiting payment.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_*` - malformed input;
/// - `CHECK_IN_IN_PAST` - check-in date is in the past;
/// - `INVALID_PRICE` - price per night is not positive;
/// - `DATES_UNAVAILABLE` - requested dates are already booked;
/// - `DISCOUNT_*` - provided discount code cannot be applied.
#[tracing::instrument(
    skip_all,
    fields(
        http.name = "createBooking",
        property.id = %req.property_id,
    ),
)]
pub async fn create(
    Extension(service): Extension<Service>,
    Json(req): Json<CreateRequest>,
) -> Result<Json<Created>, Error> {
    let booking = service
        .execute(command::CreateBookingRequest::try_from(req)?)
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(Created {
        success: true,
        booking_id: booking.id,
        booking: booking.into(),
    }))
}

/// Returns the [`BookingRequest`] with the provided ID.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_BOOKING_ID` - provided ID is not a valid one;
/// - `BOOKING_NOT_FOUND` - no such [`BookingRequest`] exists.
#[tracing::instrument(
    skip_all,
    fields(http.name = "getBooking", booking.id = %id),
)]
pub async fn get(
    Extension(service): Extension<Service>,
    Path(id): Path<String>,
) -> Result<Json<Found>, Error> {
    let id = id
        .parse::<booking::Id>()
        .map_err(|_| InvalidInput::BookingId)?;

    let booking = service
        .execute(query::booking::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .ok_or(NotFound::Booking)?;

    Ok(Json(Found {
        success: true,
        booking: booking.into(),
    }))
}

impl AsError for create_booking_request::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "INVALID_PRICE"]
                #[status = BAD_REQUEST]
                #[message = "Price per night must be positive"]
                InvalidPrice,

                #[code = "DATES_UNAVAILABLE"]
                #[status = CONFLICT]
                #[message = "Requested dates are already booked"]
                Conflict,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::CheckInInPast(date) => Some(crate::Error::new(
                "CHECK_IN_IN_PAST",
                http::StatusCode::BAD_REQUEST,
                format!("Check-in date `{date}` is in the past"),
            )),
            Self::InvalidPrice(_) => Some(Error::InvalidPrice.into()),
            Self::Conflict(_) => Some(Error::Conflict.into()),
            Self::Discount(r) => Some(rejection(*r)),
        }
    }
}

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use service::{command, domain::discount::Rejection};

    use crate::AsError as _;

    use super::CreateRequest;

    fn request(patch: impl FnOnce(&mut Value)) -> CreateRequest {
        let mut body = json!({
            "propertyId": "apt-1",
            "guest": {
                "name": "Ada Obi",
                "email": "Ada@Example.com",
                "phone": "+2348012345678",
                "idNumber": "A1234567",
                "idDocument": "uploads/ada-passport.pdf",
            },
            "stay": {
                "checkInDate": "2030-03-01",
                "checkOutDate": "2030-03-04T12:00:00+01:00",
                "guests": 2,
                "pricePerNight": 30000,
            },
            "discountCode": "save10",
        });
        patch(&mut body);
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn converts_into_command() {
        let cmd =
            command::CreateBookingRequest::try_from(request(|_| {})).unwrap();

        assert_eq!(cmd.property_id.to_string(), "apt-1");
        assert_eq!(cmd.guest.email.to_string(), "ada@example.com");
        assert_eq!(cmd.stay.nights(), 3);
        assert_eq!(u16::from(cmd.guests), 2);
        assert_eq!(cmd.price_per_night, Decimal::from(30000));
        assert_eq!(
            cmd.discount_code.map(|c| c.to_string()).as_deref(),
            Some("SAVE10"),
        );
        assert!(cmd.guest.emergency_contact.is_none());
    }

    #[test]
    fn converts_emergency_contact() {
        let cmd = command::CreateBookingRequest::try_from(request(|b| {
            b["guest"]["emergencyContact"] =
                json!({"name": "Chidi Obi", "phone": "+2348000000000"});
        }))
        .unwrap();

        let contact = cmd.guest.emergency_contact.unwrap();
        assert_eq!(contact.name.to_string(), "Chidi Obi");
        assert_eq!(contact.phone.to_string(), "+2348000000000");

        let err = command::CreateBookingRequest::try_from(request(|b| {
            b["guest"]["emergencyContact"] =
                json!({"name": "Chidi Obi", "phone": "call me"});
        }))
        .unwrap_err();
        assert_eq!(err.code, "INVALID_EMERGENCY_CONTACT");
    }

    #[test]
    fn ignores_blank_discount_code() {
        let cmd = command::CreateBookingRequest::try_from(request(|b| {
            b["discountCode"] = json!("  ");
        }))
        .unwrap();

        assert!(cmd.discount_code.is_none());
    }

    #[test]
    fn reports_invalid_field() {
        let cases: [(fn(&mut Value), &str); 5] = [
            (
                |b| b["stay"]["checkOutDate"] = json!("2030-03-01"),
                "INVALID_STAY",
            ),
            (
                |b| b["stay"]["checkInDate"] = json!("01/03/2030"),
                "INVALID_CHECK_IN_DATE",
            ),
            (|b| b["stay"]["guests"] = json!(0), "INVALID_GUESTS"),
            (
                |b| b["guest"]["email"] = json!("not-an-email"),
                "INVALID_GUEST_EMAIL",
            ),
            (
                |b| {
                    b["guest"]["emergencyContact"] =
                        json!({"name": "", "phone": "+2348000000000"});
                },
                "INVALID_EMERGENCY_CONTACT",
            ),
        ];

        for (patch, code) in cases {
            let err =
                command::CreateBookingRequest::try_from(request(patch))
                    .unwrap_err();
            assert_eq!(err.code, code);
            assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn maps_execution_errors() {
        use command::create_booking_request::ExecutionError as E;

        let past = E::CheckInInPast(common::Date::parse("2020-01-01").unwrap())
            .as_error();
        assert_eq!(past.code, "CHECK_IN_IN_PAST");
        assert_eq!(past.status_code, http::StatusCode::BAD_REQUEST);

        let rejected = E::Discount(Rejection::Expired).as_error();
        assert_eq!(rejected.code, "DISCOUNT_EXPIRED");
        assert_eq!(rejected.message, "Discount code has expired");
    }
}
