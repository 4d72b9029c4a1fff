//! [`Query`] for validating a [`DiscountCode`].

use common::{
    operations::{By, Select},
    DateTime, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        discount::{self, Application, Rejection},
        DiscountCode,
    },
    infra::{database, Database},
    Service,
};

use super::Query;

/// [`Query`] evaluating a [`DiscountCode`] against an order without
/// recording anything.
#[derive(Clone, Debug)]
pub struct Validate {
    /// [`discount::Code`] to validate.
    pub code: discount::Code,

    /// Total amount of the order.
    pub total: Money,

    /// Number of nights of the ordered stay.
    pub nights: u32,

    /// [`discount::UserId`] of the user applying the [`DiscountCode`].
    pub user_id: discount::UserId,
}

impl<Db, Gw> Query<Validate> for Service<Db, Gw>
where
    Db: Database<
        Select<By<Option<DiscountCode>, discount::Code>>,
        Ok = Option<DiscountCode>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Application;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, query: Validate) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let Validate {
            code,
            total,
            nights,
            user_id,
        } = query;

        self.database()
            .execute(Select(By::new(code)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| tracerr::new!(E::Rejected(Rejection::NotFound)))?
            .evaluate(total, nights, &user_id, DateTime::now())
            .map_err(tracerr::from_and_wrap!(=> E))
    }
}

/// Error of [`Validate`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`DiscountCode`] is not applicable.
    #[display("{_0}")]
    Rejected(Rejection),
}

#[cfg(test)]
mod spec {
    use std::{str::FromStr as _, time::Duration};

    use common::{DateTime, Money};

    use crate::{
        command::{Command as _, UseDiscountCode},
        domain::discount::{self, spec::save10, Rejection},
        infra::{
            gateway::{mock::Scripted, Outcome},
            Memory,
        },
        spec::service,
    };

    use super::{ExecutionError, Validate};

    fn validate(code: &str, nights: u32, user: &str) -> Validate {
        Validate {
            code: discount::Code::new(code).unwrap(),
            total: Money::from_str("100000NGN").unwrap(),
            nights,
            user_id: discount::UserId::new(user).unwrap(),
        }
    }

    #[tokio::test]
    async fn evaluates_without_recording() {
        let db = Memory::new();
        db.insert_discount_code(save10()).await;
        let (svc, _) = service(db, Scripted::new(Outcome::Success));

        for _ in 0..2 {
            let applied = svc
                .execute(validate("save10", 4, "ada@example.com"))
                .await
                .unwrap();
            assert_eq!(applied.discount, Money::from_str("10000NGN").unwrap());
        }
    }

    #[tokio::test]
    async fn reports_rejection_reasons() {
        let db = Memory::new();
        db.insert_discount_code(save10()).await;
        db.insert_discount_code(discount::DiscountCode {
            code: discount::Code::new("OLD001").unwrap(),
            expires_at: Some(
                (DateTime::now() - Duration::from_secs(60)).coerce(),
            ),
            ..save10()
        })
        .await;
        let (svc, _) = service(db, Scripted::new(Outcome::Success));
        _ = svc
            .execute(UseDiscountCode {
                code: discount::Code::new("SAVE10").unwrap(),
                user_id: discount::UserId::new("obi@example.com").unwrap(),
                order_id: discount::OrderId::new("order-1").unwrap(),
            })
            .await
            .unwrap();

        for (v, expected) in [
            (validate("NOPE42", 4, "ada@example.com"), Rejection::NotFound),
            (validate("OLD001", 4, "ada@example.com"), Rejection::Expired),
            (
                validate("SAVE10", 2, "ada@example.com"),
                Rejection::MinimumStayNotMet { required: 3 },
            ),
            (validate("SAVE10", 4, "obi@example.com"), Rejection::AlreadyUsed),
        ] {
            let err = svc.execute(v).await.unwrap_err();
            assert!(
                matches!(
                    err.as_ref(),
                    ExecutionError::Rejected(r) if *r == expected,
                ),
                "expected `{expected}`, got `{err}`",
            );
        }
    }
}
