//! [`Reservation`]-related [`Database`] implementations.

use common::operations::{By, Select};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{booking, property, tenant, Stay},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::{
        reservation::{Overlapping, Source},
        Reservation,
    },
};

/// Subquery of all the [`Reservation`]s, parametrized by the property ID
/// (`$1`), the cancelled [`tenant::Status`] (`$2`) and the approved
/// [`booking::Status`] (`$3`).
const RESERVATIONS: &str = "\
    SELECT id, TRUE AS is_tenant, check_in, check_out \
    FROM tenants \
    WHERE property_id = $1::VARCHAR \
          AND status <> $2::INT2 \
    UNION ALL \
    SELECT id, FALSE AS is_tenant, check_in, check_out \
    FROM booking_requests \
    WHERE property_id = $1::VARCHAR \
          AND status = $3::INT2";

impl<C> Database<Select<By<Vec<Reservation>, property::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Reservation>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let property_id: property::Id = by.into_inner();

        let sql = format!(
            "SELECT * FROM ({RESERVATIONS}) AS r \
             ORDER BY check_in ASC",
        );
        Ok(self
            .query(
                sql.as_str(),
                &[
                    &property_id,
                    &tenant::Status::Cancelled,
                    &booking::Status::Approved,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(reservation_from_row)
            .collect())
    }
}

impl<C> Database<Select<By<Option<Reservation>, Overlapping>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reservation>, Overlapping>>,
    ) -> Result<Self::Ok, Self::Err> {
        let Overlapping { property_id, stay } = by.into_inner();

        let sql = format!(
            "SELECT * FROM ({RESERVATIONS}) AS r \
             WHERE r.check_in < $5::DATE \
                   AND r.check_out > $4::DATE \
             ORDER BY check_in ASC \
             LIMIT 1",
        );
        Ok(self
            .query_opt(
                sql.as_str(),
                &[
                    &property_id,
                    &tenant::Status::Cancelled,
                    &booking::Status::Approved,
                    &stay.check_in(),
                    &stay.check_out(),
                ],
            )
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| reservation_from_row(&row)))
    }
}

/// Reads a [`Reservation`] out of the provided [`Row`].
fn reservation_from_row(row: &Row) -> Reservation {
    let source = if row.get("is_tenant") {
        Source::Tenant(tenant::Id::from(row.get::<_, uuid::Uuid>("id")))
    } else {
        Source::Booking(booking::Id::from(row.get::<_, uuid::Uuid>("id")))
    };

    #[expect(unsafe_code, reason = "invariants are preserved")]
    let stay = unsafe {
        Stay::new_unchecked(row.get("check_in"), row.get("check_out"))
    };

    Reservation { source, stay }
}
