//! [`Command`] for creating a new [`BookingRequest`].

use common::{
    operations::{By, Insert, Select},
    Date, DateTime, Money,
};
use derive_more::{Display, Error, From};
use rust_decimal::Decimal;
use tracerr::Traced;

use crate::{
    domain::{
        booking::{self, AppliedDiscount, Guests, StayDetails},
        discount, property, BookingRequest, DiscountCode, Guest, Notification,
        Stay,
    },
    infra::{database, Database},
    read::{reservation::Overlapping, Reservation},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`BookingRequest`].
#[derive(Clone, Debug)]
pub struct CreateBookingRequest {
    /// ID of the property to book.
    pub property_id: property::Id,

    /// [`Guest`] booking the property.
    pub guest: Guest,

    /// Requested [`Stay`].
    pub stay: Stay,

    /// Number of [`Guests`] staying.
    pub guests: Guests,

    /// Price of a single night, in the configured currency.
    pub price_per_night: Decimal,

    /// [`discount::Code`] to apply, if any.
    pub discount_code: Option<discount::Code>,
}

impl<Db, Gw> Command<CreateBookingRequest> for Service<Db, Gw>
where
    Db: Database<
            Select<By<Option<Reservation>, Overlapping>>,
            Ok = Option<Reservation>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<DiscountCode>, discount::Code>>,
            Ok = Option<DiscountCode>,
            Err = Traced<database::Error>,
        > + Database<Insert<BookingRequest>, Err = Traced<database::Error>>,
{
    type Ok = BookingRequest;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateBookingRequest,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateBookingRequest {
            property_id,
            guest,
            stay,
            guests,
            price_per_night,
            discount_code,
        } = cmd;

        if stay.check_in() < Date::today_at(self.config().utc_offset) {
            return Err(tracerr::new!(E::CheckInInPast(stay.check_in())));
        }
        if price_per_night <= Decimal::ZERO {
            return Err(tracerr::new!(E::InvalidPrice(price_per_night)));
        }

        let conflict = self
            .database()
            .execute(Select(By::new(Overlapping {
                property_id: property_id.clone(),
                stay,
            })))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if let Some(r) = conflict {
            return Err(tracerr::new!(E::Conflict(r)));
        }

        let price_per_night = Money {
            amount: price_per_night,
            currency: self.config().currency,
        };
        let mut details = StayDetails::new(stay, guests, price_per_night);

        let discount = if let Some(code) = discount_code {
            let Some(found) = self
                .database()
                .execute(Select(By::new(code)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
            else {
                return Err(tracerr::new!(E::Discount(
                    discount::Rejection::NotFound
                )));
            };
            let applied = found
                .evaluate(
                    details.subtotal,
                    details.nights(),
                    &(&guest.email).into(),
                    DateTime::now(),
                )
                .map_err(tracerr::from_and_wrap!(=> E))?;
            details = details.discounted(applied.discount);
            Some(AppliedDiscount {
                code: applied.code,
                amount: applied.discount,
            })
        } else {
            None
        };

        let now = DateTime::now();
        let mut booking = BookingRequest {
            id: booking::Id::new(),
            property_id,
            guest,
            stay: details,
            discount,
            status: booking::Status::Pending,
            converted_to_tenant: None,
            communications: vec![],
            created_at: now.coerce(),
            updated_at: now.coerce(),
        };
        booking.note("Booking request submitted");

        self.database()
            .execute(Insert(booking.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        self.outbox().push(Notification::booking_requested(&booking));

        Ok(booking)
    }
}

/// Error of [`CreateBookingRequest`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Check-in [`Date`] has already passed.
    #[display("Check-in date `{_0}` is in the past")]
    #[from(ignore)]
    CheckInInPast(#[error(not(source))] Date),

    /// Price per night is not positive.
    #[display("Price per night must be positive, got `{_0}`")]
    #[from(ignore)]
    InvalidPrice(#[error(not(source))] Decimal),

    /// Requested [`Stay`] overlaps with an existing [`Reservation`].
    #[display("Requested dates are already booked")]
    #[from(ignore)]
    Conflict(#[error(not(source))] Reservation),

    /// Provided [`discount::Code`] is not applicable.
    #[display("{_0}")]
    Discount(discount::Rejection),
}

#[cfg(test)]
pub(crate) mod spec {
    use std::str::FromStr as _;

    use common::{date::UtcOffset, Date, Money};
    use rust_decimal::Decimal;

    use crate::{
        command::{Command as _, VerifyPayment},
        domain::{
            booking::{self, guest::spec::guest, Guests},
            discount::{self, spec::save10, Rejection},
            property,
            stay::spec::stay,
            BookingRequest, Notification,
        },
        infra::{
            gateway::{mock::Scripted, Outcome},
            Memory,
        },
        spec::{drain, service, TestService},
    };

    use super::{CreateBookingRequest, ExecutionError};

    pub(crate) fn request(
        property: &str,
        from: &str,
        to: &str,
    ) -> CreateBookingRequest {
        CreateBookingRequest {
            property_id: property::Id::new(property).unwrap(),
            guest: guest("ada@example.com"),
            stay: stay(from, to),
            guests: Guests::new(2).unwrap(),
            price_per_night: Decimal::from(30_000),
            discount_code: None,
        }
    }

    /// Creates a [`BookingRequest`] and pays for it in full.
    pub(crate) async fn paid(
        svc: &TestService,
        cmd: CreateBookingRequest,
    ) -> BookingRequest {
        use crate::{command::InitializePayment, domain::transaction};

        let booking = svc.execute(cmd).await.unwrap();
        let (tx, _) = svc
            .execute(InitializePayment {
                booking_request_id: booking.id,
                kind: transaction::Kind::Full,
            })
            .await
            .unwrap();
        _ = svc
            .execute(VerifyPayment {
                reference: tx.reference,
            })
            .await
            .unwrap();
        booking
    }

    fn ngn(s: &str) -> Money {
        Money::from_str(&format!("{s}NGN")).unwrap()
    }

    #[tokio::test]
    async fn creates_pending_request() {
        let (svc, mut inbox) =
            service(Memory::new(), Scripted::new(Outcome::Success));

        let booking = svc
            .execute(request("apt-1", "2030-03-01", "2030-03-04"))
            .await
            .unwrap();

        assert_eq!(booking.status, booking::Status::Pending);
        assert_eq!(booking.stay.nights(), 3);
        assert_eq!(booking.stay.subtotal, ngn("90000"));
        assert_eq!(booking.stay.total, ngn("90000"));
        assert_eq!(booking.communications.len(), 1);
        assert!(matches!(
            drain(&mut inbox).as_slice(),
            [Notification::BookingRequested { .. }],
        ));
    }

    #[tokio::test]
    async fn applies_discount_code() {
        let db = Memory::new();
        db.insert_discount_code(save10()).await;
        let (svc, _) = service(db, Scripted::new(Outcome::Success));

        let booking = svc
            .execute(CreateBookingRequest {
                discount_code: discount::Code::new("save10"),
                ..request("apt-1", "2030-03-01", "2030-03-04")
            })
            .await
            .unwrap();

        assert_eq!(booking.stay.subtotal, ngn("90000"));
        assert_eq!(booking.stay.total, ngn("81000"));
        assert_eq!(booking.discount.map(|d| d.amount), Some(ngn("9000")));
    }

    #[tokio::test]
    async fn rejects_unknown_discount_code() {
        let (svc, mut inbox) =
            service(Memory::new(), Scripted::new(Outcome::Success));

        let err = svc
            .execute(CreateBookingRequest {
                discount_code: discount::Code::new("NOPE42"),
                ..request("apt-1", "2030-03-01", "2030-03-04")
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Discount(Rejection::NotFound),
        ));
        assert!(drain(&mut inbox).is_empty());
    }

    #[tokio::test]
    async fn rejects_too_short_stay_for_discount() {
        let db = Memory::new();
        db.insert_discount_code(save10()).await;
        let (svc, _) = service(db, Scripted::new(Outcome::Success));

        let err = svc
            .execute(CreateBookingRequest {
                discount_code: discount::Code::new("SAVE10"),
                ..request("apt-1", "2030-03-01", "2030-03-02")
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Discount(Rejection::MinimumStayNotMet {
                required: 3,
            }),
        ));
    }

    #[tokio::test]
    async fn rejects_past_check_in() {
        let (svc, _) = service(Memory::new(), Scripted::new(Outcome::Success));

        let err = svc
            .execute(request("apt-1", "2020-03-01", "2020-03-04"))
            .await
            .unwrap_err();

        let past = Date::parse("2020-03-01").unwrap();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::CheckInInPast(d) if *d == past,
        ));
    }

    #[tokio::test]
    async fn judges_past_check_in_in_business_time_zone() {
        let (mut svc, _) =
            service(Memory::new(), Scripted::new(Outcome::Success));
        let utc_today = Date::today();
        let cmd =
            || request("apt-1", &utc_today.to_string(), "2099-12-31");

        svc.config.utc_offset = UtcOffset::from_hms(25, 0, 0).unwrap();
        let err = svc.execute(cmd()).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::CheckInInPast(d) if *d == utc_today,
        ));

        svc.config.utc_offset = UtcOffset::from_hms(-25, 0, 0).unwrap();
        let booking = svc.execute(cmd()).await.unwrap();
        assert_eq!(booking.stay.stay.check_in(), utc_today);
    }

    #[tokio::test]
    async fn rejects_non_positive_price() {
        let (svc, _) = service(Memory::new(), Scripted::new(Outcome::Success));

        let err = svc
            .execute(CreateBookingRequest {
                price_per_night: Decimal::ZERO,
                ..request("apt-1", "2030-03-01", "2030-03-04")
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::InvalidPrice(_)));
    }

    #[tokio::test]
    async fn rejects_overlapping_dates() {
        let (svc, _) = service(Memory::new(), Scripted::new(Outcome::Success));
        _ = paid(&svc, request("apt-1", "2030-03-01", "2030-03-05")).await;

        let err = svc
            .execute(request("apt-1", "2030-03-04", "2030-03-08"))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::Conflict(_)));

        // Back-to-back stays and other properties are fine.
        assert!(svc
            .execute(request("apt-1", "2030-03-05", "2030-03-08"))
            .await
            .is_ok());
        assert!(svc
            .execute(request("apt-2", "2030-03-01", "2030-03-05"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn pending_requests_do_not_hold_dates() {
        let (svc, _) = service(Memory::new(), Scripted::new(Outcome::Success));

        for _ in 0..2 {
            assert!(svc
                .execute(request("apt-1", "2030-03-01", "2030-03-05"))
                .await
                .is_ok());
        }
    }
}
