//! [`BookingRequest`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Select, Update},
    Money,
};
use postgres_types::Json;
use rust_decimal::Decimal;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        booking::{
            self,
            guest::{self, EmergencyContact},
            AppliedDiscount, Communication, StayDetails,
        },
        BookingRequest, Guest, Stay,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Select<By<Option<BookingRequest>, booking::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<BookingRequest>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<BookingRequest>, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: booking::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, property_id, \
                   guest_name, guest_email, guest_phone, \
                   guest_id_number, guest_id_document, \
                   emergency_contact_name, emergency_contact_phone, \
                   check_in, check_out, guests, \
                   currency, price_per_night, subtotal, total, \
                   discount_code, discount_amount, \
                   status, converted_to_tenant, communications, \
                   created_at, updated_at \
            FROM booking_requests \
            WHERE id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| booking_from_row(&row)))
    }
}

impl<C> Database<Insert<BookingRequest>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Update<BookingRequest>,
        Ok = (),
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(booking): Insert<BookingRequest>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(booking)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<BookingRequest>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(booking): Update<BookingRequest>,
    ) -> Result<Self::Ok, Self::Err> {
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
        } = booking;
        let Guest {
            name,
            email,
            phone,
            id_number,
            id_document,
            emergency_contact,
        } = guest;
        let (contact_name, contact_phone) = emergency_contact
            .map(|c| (c.name, c.phone))
            .unzip();
        let (discount_code, discount_amount) =
            discount.map(|d| (d.code, d.amount.amount)).unzip();
        let communications = Json(communications);

        const SQL: &str = "\
            INSERT INTO booking_requests (\
                id, property_id, \
                guest_name, guest_email, guest_phone, \
                guest_id_number, guest_id_document, \
                emergency_contact_name, emergency_contact_phone, \
                check_in, check_out, guests, \
                currency, price_per_night, subtotal, total, \
                discount_code, discount_amount, \
                status, converted_to_tenant, communications, \
                created_at, updated_at\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, \
                $3::VARCHAR, $4::VARCHAR, $5::VARCHAR, \
                $6::VARCHAR, $7::VARCHAR, \
                $8::VARCHAR, $9::VARCHAR, \
                $10::DATE, $11::DATE, $12::INT2, \
                $13::INT2, $14::NUMERIC, $15::NUMERIC, $16::NUMERIC, \
                $17::VARCHAR, $18::NUMERIC, \
                $19::INT2, $20::UUID, $21::JSONB, \
                $22::TIMESTAMPTZ, $23::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET status = EXCLUDED.status, \
                converted_to_tenant = EXCLUDED.converted_to_tenant, \
                communications = EXCLUDED.communications, \
                updated_at = EXCLUDED.updated_at";
        self.exec(
            SQL,
            &[
                &id,
                &property_id,
                &name,
                &email,
                &phone,
                &id_number,
                &id_document,
                &contact_name,
                &contact_phone,
                &stay.stay.check_in(),
                &stay.stay.check_out(),
                &stay.guests,
                &stay.total.currency,
                &stay.price_per_night.amount,
                &stay.subtotal.amount,
                &stay.total.amount,
                &discount_code,
                &discount_amount,
                &status,
                &converted_to_tenant,
                &communications,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

/// Reads a [`BookingRequest`] out of the provided [`Row`].
fn booking_from_row(row: &Row) -> BookingRequest {
    let currency = row.get("currency");
    let money = |amount: Decimal| Money { amount, currency };

    #[expect(unsafe_code, reason = "invariants are preserved")]
    let stay = unsafe {
        Stay::new_unchecked(row.get("check_in"), row.get("check_out"))
    };
    let emergency_contact = row
        .get::<_, Option<guest::Name>>("emergency_contact_name")
        .zip(row.get::<_, Option<guest::Phone>>("emergency_contact_phone"))
        .map(|(name, phone)| EmergencyContact { name, phone });
    let discount = row
        .get::<_, Option<_>>("discount_code")
        .zip(row.get::<_, Option<Decimal>>("discount_amount"))
        .map(|(code, amount)| AppliedDiscount {
            code,
            amount: money(amount),
        });

    BookingRequest {
        id: row.get("id"),
        property_id: row.get("property_id"),
        guest: Guest {
            name: row.get("guest_name"),
            email: row.get("guest_email"),
            phone: row.get("guest_phone"),
            id_number: row.get("guest_id_number"),
            id_document: row.get("guest_id_document"),
            emergency_contact,
        },
        stay: StayDetails {
            stay,
            guests: row.get("guests"),
            price_per_night: money(row.get("price_per_night")),
            subtotal: money(row.get("subtotal")),
            total: money(row.get("total")),
        },
        discount,
        status: row.get("status"),
        converted_to_tenant: row.get("converted_to_tenant"),
        communications: row
            .get::<_, Json<Vec<Communication>>>("communications")
            .0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
