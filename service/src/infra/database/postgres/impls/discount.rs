//! [`DiscountCode`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select};
use rust_decimal::Decimal;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        discount::{self, Usage, Value},
        DiscountCode,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Select<By<Option<DiscountCode>, discount::Code>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<DiscountCode>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<DiscountCode>, discount::Code>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let code: discount::Code = by.into_inner();

        const SQL: &str = "\
            SELECT code, kind, value, max_discount, minimum_stay_days, \
                   is_active, expires_at, usage_limit, created_at \
            FROM discount_codes \
            WHERE code = $1::VARCHAR";
        let Some(row) = self
            .query_opt(SQL, &[&code])
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };

        let (kind, number) = (row.get("kind"), row.get::<_, Decimal>("value"));
        let Some(value) = Value::from_parts(kind, number) else {
            log::error!(
                "`DiscountCode({code})` has invalid `{kind}` value: {number}",
            );
            return Ok(None);
        };

        const USAGES_SQL: &str = "\
            SELECT user_id, order_id, used_at \
            FROM discount_code_usages \
            WHERE code = $1::VARCHAR \
            ORDER BY used_at ASC";
        let usages = self
            .query(USAGES_SQL, &[&code])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| Usage {
                user_id: row.get("user_id"),
                order_id: row.get("order_id"),
                used_at: row.get("used_at"),
            })
            .collect();

        Ok(Some(DiscountCode {
            code: row.get("code"),
            value,
            max_discount: row.get("max_discount"),
            minimum_stay_days: u32::try_from(
                row.get::<_, i32>("minimum_stay_days"),
            )
            .unwrap_or(0),
            is_active: row.get("is_active"),
            expires_at: row.get("expires_at"),
            usage_limit: row
                .get::<_, Option<i32>>("usage_limit")
                .map(|l| u32::try_from(l).unwrap_or(0)),
            usages,
            created_at: row.get("created_at"),
        }))
    }
}

impl<C> Database<Insert<(discount::Code, Usage)>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert((code, usage)): Insert<(discount::Code, Usage)>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            INSERT INTO discount_code_usages (\
                code, user_id, order_id, used_at\
            ) \
            VALUES (\
                $1::VARCHAR, $2::VARCHAR, $3::VARCHAR, $4::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[&code, &usage.user_id, &usage.order_id, &usage.used_at],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<DiscountCode, discount::Code>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<DiscountCode, discount::Code>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let code: discount::Code = by.into_inner();

        const SQL: &str = "\
            SELECT code \
            FROM discount_codes \
            WHERE code = $1::VARCHAR \
            FOR UPDATE";
        self.query(SQL, &[&code])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
