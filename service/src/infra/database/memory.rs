//! In-memory [`Database`] implementation.
//!
//! Transactions are serialized: a [`Tx`] holds the whole [`State`] locked
//! from [`Transact`] until it's committed or dropped, and works on a copy of
//! it, so dropping a [`Tx`] discards all its changes.

use std::{
    collections::{HashMap, HashSet},
    future::Future,
    sync::Arc,
};

use common::operations::{By, Commit, Insert, Lock, Select, Transact, Update};
use derive_more::{Display, Error as StdError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracerr::Traced;

use crate::{
    domain::{
        booking,
        discount::{self, Usage},
        property, tenant, transaction, BookingRequest, DiscountCode, Tenant,
        Transaction,
    },
    infra::{
        database::{
            self, DISCOUNT_USAGE_CONSTRAINT, REFERENCE_CONSTRAINT,
            SINGLE_SUCCESS_CONSTRAINT, TENANT_KEY_CONSTRAINT,
        },
        Database,
    },
    read::{
        self,
        reservation::{Overlapping, Source},
        Reservation,
    },
};

/// In-memory [`Database`] client.
#[derive(Clone, Debug, Default)]
pub struct Memory<T = NonTx>(T);

impl Memory {
    /// Creates a new empty [`Memory`] database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the provided [`DiscountCode`], replacing any existing one with
    /// the same [`discount::Code`].
    pub async fn insert_discount_code(&self, code: DiscountCode) {
        drop(
            self.0
                 .0
                .lock()
                .await
                .discount_codes
                .insert(code.code.clone(), code),
        );
    }

    /// Makes every following write into the provided [`Table`] fail.
    pub async fn inject_fault(&self, table: Table) {
        _ = self.0 .0.lock().await.faults.insert(table);
    }
}

/// Non-transactional [`Memory`] client.
#[derive(Clone, Debug, Default)]
pub struct NonTx(Arc<Mutex<State>>);

/// Transactional [`Memory`] client.
#[derive(Clone, Debug)]
pub struct Tx(Arc<Mutex<Option<Working>>>);

/// Locked [`State`] along with its working copy.
#[derive(Debug)]
struct Working {
    /// Lock of the shared [`State`], held until the [`Tx`] ends.
    lock: OwnedMutexGuard<State>,

    /// Copy of the [`State`] the [`Tx`] operates on.
    copy: State,
}

/// Stored data.
#[derive(Clone, Debug, Default)]
pub struct State {
    /// Stored [`BookingRequest`]s.
    bookings: HashMap<booking::Id, BookingRequest>,

    /// Stored [`Transaction`]s.
    transactions: HashMap<transaction::Reference, Transaction>,

    /// Last checks of pending [`Transaction`]s.
    checks: HashMap<transaction::Reference, transaction::CheckDateTime>,

    /// Stored [`Tenant`]s.
    tenants: HashMap<tenant::Id, Tenant>,

    /// Stored [`DiscountCode`]s along with their [`Usage`]s.
    discount_codes: HashMap<discount::Code, DiscountCode>,

    /// [`Table`]s failing on writes.
    faults: HashSet<Table>,
}

impl State {
    /// Checks whether the provided [`Table`] accepts writes.
    fn writable(&self, table: Table) -> Result<(), Error> {
        if self.faults.contains(&table) {
            return Err(Error::Fault(table));
        }
        Ok(())
    }
}

/// Table of the [`Memory`] database.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Table {
    /// [`BookingRequest`]s.
    #[display("booking_requests")]
    Bookings,

    /// [`Transaction`]s.
    #[display("transactions")]
    Transactions,

    /// [`Tenant`]s.
    #[display("tenants")]
    Tenants,

    /// [`DiscountCode`]s.
    #[display("discount_codes")]
    DiscountCodes,
}

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Unique constraint is violated.
    #[display("duplicate key value violates unique constraint `{_0}`")]
    UniqueViolation(#[error(not(source))] &'static str),

    /// Write into a faulty [`Table`].
    #[display("`{_0}` table is faulty")]
    Fault(#[error(not(source))] Table),

    /// Operation was issued on an already finished [`Tx`].
    #[display("`Tx` is already finished")]
    TxFinished,
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::UniqueViolation(c) => constraint.map_or(true, |x| x == *c),
            Self::Fault(_) | Self::TxFinished => false,
        }
    }
}

/// Access to the [`State`] of a [`Memory`] client.
pub trait Storage {
    /// Runs the provided function over the [`State`].
    ///
    /// # Errors
    ///
    /// If the function fails, or the [`State`] is inaccessible.
    fn with<R, F>(
        &self,
        f: F,
    ) -> impl Future<Output = Result<R, Traced<database::Error>>>
    where
        F: FnOnce(&mut State) -> Result<R, Error>;
}

impl Storage for NonTx {
    async fn with<R, F>(&self, f: F) -> Result<R, Traced<database::Error>>
    where
        F: FnOnce(&mut State) -> Result<R, Error>,
    {
        f(&mut *self.0.lock().await)
            .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

impl Storage for Tx {
    async fn with<R, F>(&self, f: F) -> Result<R, Traced<database::Error>>
    where
        F: FnOnce(&mut State) -> Result<R, Error>,
    {
        let mut guard = self.0.lock().await;
        let working = guard
            .as_mut()
            .ok_or(Error::TxFinished)
            .map_err(tracerr::from_and_wrap!(=> database::Error))?;
        f(&mut working.copy)
            .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

impl Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        let lock = Arc::clone(&self.0 .0).lock_owned().await;
        let copy = State::clone(&lock);
        Ok(Memory(Tx(Arc::new(Mutex::new(Some(Working { lock, copy }))))))
    }
}

impl Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        let Working { mut lock, copy } = self
            .0
             .0
            .lock()
            .await
            .take()
            .ok_or(Error::TxFinished)
            .map_err(tracerr::from_and_wrap!(=> database::Error))?;
        *lock = copy;
        Ok(())
    }
}

impl<S> Database<Select<By<Option<BookingRequest>, booking::Id>>> for Memory<S>
where
    S: Storage,
{
    type Ok = Option<BookingRequest>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<BookingRequest>, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0
            .with(|s| Ok(s.bookings.get(&id).cloned()))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S> Database<Insert<BookingRequest>> for Memory<S>
where
    S: Storage,
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

impl<S> Database<Update<BookingRequest>> for Memory<S>
where
    S: Storage,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(booking): Update<BookingRequest>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .with(|s| {
                s.writable(Table::Bookings)?;
                drop(s.bookings.insert(booking.id, booking));
                Ok(())
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S> Database<Select<By<Option<Transaction>, transaction::Reference>>>
    for Memory<S>
where
    S: Storage,
{
    type Ok = Option<Transaction>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Transaction>, transaction::Reference>>,
    ) -> Result<Self::Ok, Self::Err> {
        let reference = by.into_inner();
        self.0
            .with(|s| Ok(s.transactions.get(&reference).cloned()))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S> Database<Select<By<Vec<Transaction>, booking::Id>>> for Memory<S>
where
    S: Storage,
{
    type Ok = Vec<Transaction>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Transaction>, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0
            .with(|s| {
                let mut found = s
                    .transactions
                    .values()
                    .filter(|t| t.booking_request_id == id)
                    .cloned()
                    .collect::<Vec<_>>();
                found.sort_by_key(|t| t.created_at);
                Ok(found)
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S>
    Database<
        Select<
            By<Vec<transaction::Reference>, read::transaction::StalePending>,
        >,
    > for Memory<S>
where
    S: Storage,
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
        self.0
            .with(|s| {
                let mut stale = s
                    .transactions
                    .values()
                    .filter(|t| {
                        t.status == transaction::Status::Pending
                            && t.created_at < created_before
                    })
                    .collect::<Vec<_>>();
                stale.sort_by_key(|t| {
                    (s.checks.get(&t.reference).copied(), t.created_at)
                });
                Ok(stale
                    .into_iter()
                    .take(usize::from(limit))
                    .map(|t| t.reference.clone())
                    .collect())
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S> Database<Insert<Transaction>> for Memory<S>
where
    S: Storage,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(tx): Insert<Transaction>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .with(|s| {
                s.writable(Table::Transactions)?;
                if s.transactions.contains_key(&tx.reference) {
                    return Err(Error::UniqueViolation(REFERENCE_CONSTRAINT));
                }
                check_single_success(s, &tx)?;
                drop(s.transactions.insert(tx.reference.clone(), tx));
                Ok(())
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S> Database<Update<Transaction>> for Memory<S>
where
    S: Storage,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(tx): Update<Transaction>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .with(|s| {
                s.writable(Table::Transactions)?;
                check_single_success(s, &tx)?;
                if let Some(stored) = s.transactions.get_mut(&tx.reference) {
                    *stored = tx;
                }
                Ok(())
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S> Database<Update<read::transaction::Checked>> for Memory<S>
where
    S: Storage,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(checked): Update<read::transaction::Checked>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::transaction::Checked { reference, at } = checked;
        self.0
            .with(|s| {
                s.writable(Table::Transactions)?;
                let pending = s.transactions.get(&reference).is_some_and(|t| {
                    t.status == transaction::Status::Pending
                });
                if pending {
                    drop(s.checks.insert(reference, at));
                }
                Ok(())
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

/// Ensures no other successful [`Transaction`] exists for the booking
/// request of the provided one, if it's successful.
fn check_single_success(s: &State, tx: &Transaction) -> Result<(), Error> {
    let duplicated = tx.status == transaction::Status::Success
        && s.transactions.values().any(|t| {
            t.reference != tx.reference
                && t.booking_request_id == tx.booking_request_id
                && t.status == transaction::Status::Success
        });
    if duplicated {
        return Err(Error::UniqueViolation(SINGLE_SUCCESS_CONSTRAINT));
    }
    Ok(())
}

impl<S> Database<Lock<By<Transaction, transaction::Reference>>> for Memory<S>
where
    S: Storage,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Transaction, transaction::Reference>>,
    ) -> Result<Self::Ok, Self::Err> {
        // `Tx` already holds the whole `State` locked.
        Ok(())
    }
}

impl<S> Database<Select<By<Option<Tenant>, tenant::Key>>> for Memory<S>
where
    S: Storage,
{
    type Ok = Option<Tenant>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Tenant>, tenant::Key>>,
    ) -> Result<Self::Ok, Self::Err> {
        let key = by.into_inner();
        self.0
            .with(|s| Ok(s.tenants.values().find(|t| t.key == key).cloned()))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S> Database<Insert<Tenant>> for Memory<S>
where
    S: Storage,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(tenant): Insert<Tenant>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .with(|s| {
                s.writable(Table::Tenants)?;
                if s.tenants.values().any(|t| t.key == tenant.key) {
                    return Err(Error::UniqueViolation(TENANT_KEY_CONSTRAINT));
                }
                drop(s.tenants.insert(tenant.id, tenant));
                Ok(())
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S> Database<Lock<By<Tenant, property::Id>>> for Memory<S>
where
    S: Storage,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Tenant, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // `Tx` already holds the whole `State` locked.
        Ok(())
    }
}

impl<S> Database<Select<By<Vec<Reservation>, property::Id>>> for Memory<S>
where
    S: Storage,
{
    type Ok = Vec<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Reservation>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let property_id = by.into_inner();
        self.0
            .with(|s| Ok(reservations(s, &property_id)))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S> Database<Select<By<Option<Reservation>, Overlapping>>> for Memory<S>
where
    S: Storage,
{
    type Ok = Option<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reservation>, Overlapping>>,
    ) -> Result<Self::Ok, Self::Err> {
        let Overlapping { property_id, stay } = by.into_inner();
        self.0
            .with(|s| {
                Ok(reservations(s, &property_id)
                    .into_iter()
                    .find(|r| r.stay.overlaps(&stay)))
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

/// Collects all the [`Reservation`]s of the provided property, ordered by
/// their check-in.
fn reservations(s: &State, property_id: &property::Id) -> Vec<Reservation> {
    let tenants = s
        .tenants
        .values()
        .filter(|t| {
            &t.property_id == property_id
                && t.status != tenant::Status::Cancelled
        })
        .map(|t| Reservation {
            source: Source::Tenant(t.id),
            stay: t.stay,
        });
    let bookings = s
        .bookings
        .values()
        .filter(|b| {
            &b.property_id == property_id
                && b.status == booking::Status::Approved
        })
        .map(|b| Reservation {
            source: Source::Booking(b.id),
            stay: b.stay.stay,
        });

    let mut all = tenants.chain(bookings).collect::<Vec<_>>();
    all.sort_by_key(|r| r.stay.check_in());
    all
}

impl<S> Database<Select<By<Option<DiscountCode>, discount::Code>>> for Memory<S>
where
    S: Storage,
{
    type Ok = Option<DiscountCode>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<DiscountCode>, discount::Code>>,
    ) -> Result<Self::Ok, Self::Err> {
        let code = by.into_inner();
        self.0
            .with(|s| Ok(s.discount_codes.get(&code).cloned()))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S> Database<Insert<(discount::Code, Usage)>> for Memory<S>
where
    S: Storage,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert((code, usage)): Insert<(discount::Code, Usage)>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .with(|s| {
                s.writable(Table::DiscountCodes)?;
                if let Some(stored) = s.discount_codes.get_mut(&code) {
                    if stored.is_used_by(&usage.user_id) {
                        return Err(Error::UniqueViolation(
                            DISCOUNT_USAGE_CONSTRAINT,
                        ));
                    }
                    stored.usages.push(usage);
                }
                Ok(())
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S> Database<Lock<By<DiscountCode, discount::Code>>> for Memory<S>
where
    S: Storage,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<DiscountCode, discount::Code>>,
    ) -> Result<Self::Ok, Self::Err> {
        // `Tx` already holds the whole `State` locked.
        Ok(())
    }
}
