//! [`Tenant`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Lock, Select},
    Money,
};
use rust_decimal::Decimal;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        booking::guest::{self, EmergencyContact},
        property,
        tenant::{self, Payment},
        Guest, Stay, Tenant,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Select<By<Option<Tenant>, tenant::Key>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Tenant>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Tenant>, tenant::Key>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let key: tenant::Key = by.into_inner();

        const SQL: &str = "\
            SELECT id, key, property_id, booking_request_id, \
                   guest_name, guest_email, guest_phone, \
                   guest_id_number, guest_id_document, \
                   emergency_contact_name, emergency_contact_phone, \
                   check_in, check_out, guests, \
                   payment_status, currency, amount_paid, total, \
                   transaction_reference, \
                   status, created_at \
            FROM tenants \
            WHERE key = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&key])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| tenant_from_row(&row)))
    }
}

impl<C> Database<Insert<Tenant>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(tenant): Insert<Tenant>,
    ) -> Result<Self::Ok, Self::Err> {
        let Tenant {
            id,
            key,
            property_id,
            booking_request_id,
            guest,
            stay,
            guests,
            payment,
            status,
            created_at,
        } = tenant;
        let (contact_name, contact_phone) = guest
            .emergency_contact
            .map(|c| (c.name, c.phone))
            .unzip();

        const SQL: &str = "\
            INSERT INTO tenants (\
                id, key, property_id, booking_request_id, \
                guest_name, guest_email, guest_phone, \
                guest_id_number, guest_id_document, \
                emergency_contact_name, emergency_contact_phone, \
                check_in, check_out, guests, \
                payment_status, currency, amount_paid, total, \
                transaction_reference, \
                status, created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::VARCHAR, $4::UUID, \
                $5::VARCHAR, $6::VARCHAR, $7::VARCHAR, \
                $8::VARCHAR, $9::VARCHAR, \
                $10::VARCHAR, $11::VARCHAR, \
                $12::DATE, $13::DATE, $14::INT2, \
                $15::INT2, $16::INT2, $17::NUMERIC, $18::NUMERIC, \
                $19::VARCHAR, \
                $20::INT2, $21::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &key,
                &property_id,
                &booking_request_id,
                &guest.name,
                &guest.email,
                &guest.phone,
                &guest.id_number,
                &guest.id_document,
                &contact_name,
                &contact_phone,
                &stay.check_in(),
                &stay.check_out(),
                &guests,
                &payment.status,
                &payment.total.currency,
                &payment.amount_paid.amount,
                &payment.total.amount,
                &payment.transaction_reference,
                &status,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Tenant, property::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Tenant, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let property_id: property::Id = by.into_inner();

        // Released on the transaction end.
        const SQL: &str = "\
            SELECT pg_advisory_xact_lock(\
                hashtextextended($1::VARCHAR, 0)\
            )";
        self.query(SQL, &[&property_id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

/// Reads a [`Tenant`] out of the provided [`Row`].
fn tenant_from_row(row: &Row) -> Tenant {
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

    Tenant {
        id: row.get("id"),
        key: row.get("key"),
        property_id: row.get("property_id"),
        booking_request_id: row.get("booking_request_id"),
        guest: Guest {
            name: row.get("guest_name"),
            email: row.get("guest_email"),
            phone: row.get("guest_phone"),
            id_number: row.get("guest_id_number"),
            id_document: row.get("guest_id_document"),
            emergency_contact,
        },
        stay,
        guests: row.get("guests"),
        payment: Payment {
            status: row.get("payment_status"),
            amount_paid: money(row.get("amount_paid")),
            total: money(row.get("total")),
            transaction_reference: row.get("transaction_reference"),
        },
        status: row.get("status"),
        created_at: row.get("created_at"),
    }
}
