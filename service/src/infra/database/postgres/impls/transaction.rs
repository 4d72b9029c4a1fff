//! [`Transaction`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Lock, Select, Update},
    Money,
};
use postgres_types::Json;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        booking,
        transaction::{self, Customer},
        Transaction,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns of the `transactions` table read into a [`Transaction`].
const COLUMNS: &str = "\
    id, reference, gateway_reference, access_code, booking_request_id, \
    kind, currency, amount, \
    customer_email, customer_name, customer_phone, \
    status, gateway_status, failure_reason, gateway_response, \
    created_at, settled_at";

impl<C> Database<Select<By<Option<Transaction>, transaction::Reference>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Transaction>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Transaction>, transaction::Reference>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let reference: transaction::Reference = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM transactions \
             WHERE reference = $1::VARCHAR",
        );
        Ok(self
            .query_opt(sql.as_str(), &[&reference])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| transaction_from_row(&row)))
    }
}

impl<C> Database<Select<By<Vec<Transaction>, booking::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Transaction>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Transaction>, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: booking::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM transactions \
             WHERE booking_request_id = $1::UUID \
             ORDER BY created_at ASC",
        );
        Ok(self
            .query(sql.as_str(), &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(transaction_from_row)
            .collect())
    }
}

impl<C>
    Database<
        Select<
            By<Vec<transaction::Reference>, read::transaction::StalePending>,
        >,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<transaction::Reference>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<transaction::Reference>, read::transaction::StalePending>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::transaction::StalePending {
            created_before,
            limit,
        } = by.into_inner();
        let limit = i32::from(limit);

        const SQL: &str = "\
            SELECT reference \
            FROM transactions \
            WHERE status = $1::INT2 \
                  AND created_at < $2::TIMESTAMPTZ \
            ORDER BY checked_at ASC NULLS FIRST, created_at ASC \
            LIMIT $3::INT4";
        Ok(self
            .query(
                SQL,
                &[&transaction::Status::Pending, &created_before, &limit],
            )
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| row.get("reference"))
            .collect())
    }
}

impl<C> Database<Insert<Transaction>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(tx): Insert<Transaction>,
    ) -> Result<Self::Ok, Self::Err> {
        let Transaction {
            id,
            reference,
            gateway_reference,
            access_code,
            booking_request_id,
            kind,
            amount,
            customer,
            status,
            gateway_status,
            failure_reason,
            gateway_response,
            created_at,
            settled_at,
        } = tx;
        let gateway_response = gateway_response.map(Json);

        const SQL: &str = "\
            INSERT INTO transactions (\
                id, reference, gateway_reference, access_code, \
                booking_request_id, \
                kind, currency, amount, \
                customer_email, customer_name, customer_phone, \
                status, gateway_status, failure_reason, gateway_response, \
                created_at, settled_at\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, $3::VARCHAR, $4::VARCHAR, \
                $5::UUID, \
                $6::INT2, $7::INT2, $8::NUMERIC, \
                $9::VARCHAR, $10::VARCHAR, $11::VARCHAR, \
                $12::INT2, $13::VARCHAR, $14::TEXT, $15::JSONB, \
                $16::TIMESTAMPTZ, $17::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &reference,
                &gateway_reference,
                &access_code,
                &booking_request_id,
                &kind,
                &amount.currency,
                &amount.amount,
                &customer.email,
                &customer.name,
                &customer.phone,
                &status,
                &gateway_status,
                &failure_reason,
                &gateway_response,
                &created_at,
                &settled_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<Transaction>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(tx): Update<Transaction>,
    ) -> Result<Self::Ok, Self::Err> {
        let gateway_response = tx.gateway_response.map(Json);

        const SQL: &str = "\
            UPDATE transactions \
            SET status = $2::INT2, \
                gateway_status = $3::VARCHAR, \
                failure_reason = $4::TEXT, \
                gateway_response = $5::JSONB, \
                settled_at = $6::TIMESTAMPTZ \
            WHERE id = $1::UUID";
        self.exec(
            SQL,
            &[
                &tx.id,
                &tx.status,
                &tx.gateway_status,
                &tx.failure_reason,
                &gateway_response,
                &tx.settled_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<read::transaction::Checked>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(checked): Update<read::transaction::Checked>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::transaction::Checked { reference, at } = checked;

        const SQL: &str = "\
            UPDATE transactions \
            SET checked_at = $3::TIMESTAMPTZ \
            WHERE reference = $1::VARCHAR \
                  AND status = $2::INT2";
        self.exec(SQL, &[&reference, &transaction::Status::Pending, &at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<Transaction, transaction::Reference>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Transaction, transaction::Reference>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let reference: transaction::Reference = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM transactions \
            WHERE reference = $1::VARCHAR \
            FOR UPDATE";
        self.query(SQL, &[&reference])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

/// Reads a [`Transaction`] out of the provided [`Row`].
fn transaction_from_row(row: &Row) -> Transaction {
    Transaction {
        id: row.get("id"),
        reference: row.get("reference"),
        gateway_reference: row.get("gateway_reference"),
        access_code: row.get("access_code"),
        booking_request_id: row.get("booking_request_id"),
        kind: row.get("kind"),
        amount: Money {
            amount: row.get("amount"),
            currency: row.get("currency"),
        },
        customer: Customer {
            email: row.get("customer_email"),
            name: row.get("customer_name"),
            phone: row.get("customer_phone"),
        },
        status: row.get("status"),
        gateway_status: row.get("gateway_status"),
        failure_reason: row.get("failure_reason"),
        gateway_response: row
            .get::<_, Option<Json<serde_json::Value>>>("gateway_response")
            .map(|j| j.0),
        created_at: row.get("created_at"),
        settled_at: row.get("settled_at"),
    }
}
