//! [`Command`] for recording a usage of a [`DiscountCode`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        discount::{self, Rejection, Usage},
        DiscountCode,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for recording a usage of a [`DiscountCode`].
#[derive(Clone, Debug)]
pub struct UseDiscountCode {
    /// [`discount::Code`] of the used [`DiscountCode`].
    pub code: discount::Code,

    /// [`discount::UserId`] of the user using the [`DiscountCode`].
    pub user_id: discount::UserId,

    /// [`discount::OrderId`] the [`DiscountCode`] is used for.
    pub order_id: discount::OrderId,
}

impl<Db, Gw> Command<UseDiscountCode> for Service<Db, Gw>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<DiscountCode, discount::Code>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<DiscountCode>, discount::Code>>,
            Ok = Option<DiscountCode>,
            Err = Traced<database::Error>,
        > + Database<
            Insert<(discount::Code, Usage)>,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Usage;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UseDiscountCode,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UseDiscountCode {
            code,
            user_id,
            order_id,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Serialize concurrent usages of the same `DiscountCode`.
        tx.execute(Lock(By::new(code.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let Some(mut discount) = tx
            .execute(Select(By::new(code.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        else {
            return Err(tracerr::new!(E::Rejected(Rejection::NotFound)));
        };
        discount
            .redeem(user_id, order_id)
            .map_err(tracerr::from_and_wrap!(=> E))?;
        let Some(usage) = discount.usages.pop() else {
            return Err(tracerr::new!(E::Rejected(Rejection::NotFound)));
        };

        tx.execute(Insert((code, usage.clone())))
            .await
            .map_err(|e| {
                if e.as_ref().is_unique_violation(Some(
                    database::DISCOUNT_USAGE_CONSTRAINT,
                )) {
                    tracerr::new!(E::Rejected(Rejection::AlreadyUsed))
                } else {
                    tracerr::map_from(e)
                }
            })
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(usage)
    }
}

/// Error of [`UseDiscountCode`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`DiscountCode`] cannot be used.
    #[display("{_0}")]
    Rejected(Rejection),
}
