//! Postgres database clients.

use std::{mem, sync::Arc};

use tokio::sync::{Mutex, MutexGuard};
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{self, connection, Connection},
};

/// Non-transactional Postgres database client.
///
/// Every statement runs on a [`connection::NonTx`] taken from the pool for
/// the duration of that statement only.
#[derive(Clone, Debug)]
pub struct NonTx {
    /// [`connection::Pool`] to take [`Connection`]s from.
    pool: connection::Pool,
}

impl NonTx {
    /// Creates a new [`NonTx`] client from the provided [`connection::Pool`].
    #[must_use]
    pub(crate) fn from_pool(pool: connection::Pool) -> Self {
        Self { pool }
    }

    /// Takes a [`connection::NonTx`] from the pool.
    pub(crate) async fn connection(
        &self,
    ) -> Result<connection::NonTx, Traced<database::Error>> {
        self.pool
            .get()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

/// Transactional Postgres database client.
///
/// The transaction starts on the first statement and is rolled back if this
/// client is dropped before being [`Tx::commit`]ted.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`NonTx`] client to start the transaction with.
    non_tx: NonTx,

    /// [`State`] of the transaction.
    state: Arc<Mutex<State>>,
}

/// State of a [`Tx`] client transaction.
#[derive(Debug)]
enum State {
    /// No statements were issued yet.
    Idle,

    /// Transaction is in progress.
    Active(connection::Tx),

    /// Transaction is committed.
    Finished,
}

impl Tx {
    /// Creates a new [`Tx`] client out of the provided [`NonTx`] one.
    #[must_use]
    pub fn from_non_tx(non_tx: NonTx) -> Self {
        Self {
            non_tx,
            state: Arc::new(Mutex::new(State::Idle)),
        }
    }

    /// Commits this [`Tx`] client.
    ///
    /// Committing a [`Tx`] without any statements issued is a no-op.
    ///
    /// # Errors
    ///
    /// If failed to commit transaction of this [`Tx`] client.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let state =
            mem::replace(&mut *self.state.lock().await, State::Finished);
        match state {
            State::Active(tx) => tx.commit().await.map_err(tracerr::wrap!()),
            State::Idle | State::Finished => Ok(()),
        }
    }

    /// Locks the [`State`] of this [`Tx`] client, starting the transaction
    /// if it's not started yet.
    async fn begin(
        &self,
    ) -> Result<MutexGuard<'_, State>, Traced<database::Error>> {
        let mut state = self.state.lock().await;
        if matches!(*state, State::Idle) {
            let conn =
                self.non_tx.connection().await.map_err(tracerr::wrap!())?;
            *state = State::Active(
                connection::Tx::begin(conn).await.map_err(tracerr::wrap!())?,
            );
        }
        Ok(state)
    }
}

impl State {
    /// Returns the in-progress [`connection::Tx`].
    fn active(&self) -> Result<&connection::Tx, Traced<database::Error>> {
        match self {
            Self::Active(tx) => Ok(tx),
            Self::Idle | Self::Finished => {
                Err(tracerr::new!(postgres::Error::TxFinished))
                    .map_err(tracerr::map_from)
            }
        }
    }
}

impl Connection for NonTx {
    async fn query<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .query(stmt, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn query_opt<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .query_opt(stmt, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn exec<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .exec(stmt, params)
            .await
            .map_err(tracerr::wrap!())
    }
}

impl Connection for Tx {
    async fn query<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        self.begin()
            .await
            .map_err(tracerr::wrap!())?
            .active()
            .map_err(tracerr::wrap!())?
            .query(stmt, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn query_opt<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        self.begin()
            .await
            .map_err(tracerr::wrap!())?
            .active()
            .map_err(tracerr::wrap!())?
            .query_opt(stmt, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn exec<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        self.begin()
            .await
            .map_err(tracerr::wrap!())?
            .active()
            .map_err(tracerr::wrap!())?
            .exec(stmt, params)
            .await
            .map_err(tracerr::wrap!())
    }
}
