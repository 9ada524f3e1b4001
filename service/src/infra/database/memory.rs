//! In-memory [`Database`] implementation.
//!
//! Keeps the same semantics as the [`Postgres`] one: transactions apply
//! all-or-nothing on [`Commit`] and at most one running shift is allowed per
//! worker. Transactions are fully serialized, so a [`Lock`] never waits.
//!
//! [`Postgres`]: super::Postgres

use std::{
    collections::{HashMap, HashSet},
    future::Future,
    sync::Arc,
};

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Update},
    Date,
};
use derive_more::{Display, Error as StdError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracerr::Traced;

use crate::{
    domain::{attendance, user, Attendance},
    infra::{database, Database},
    read::attendance::{list, Active},
};

/// Name of the constraint allowing at most one running [`Break`] per shift.
///
/// [`Break`]: attendance::Break
const ONE_OPEN_PER_ATTENDANCE: &str =
    "attendance_breaks_one_open_per_attendance";

/// In-memory [`Database`].
#[derive(Clone, Debug, Default)]
pub struct Memory<T = NonTx>(T);

impl Memory {
    /// Creates a new empty [`Memory`] database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Stored data.
#[derive(Clone, Debug, Default)]
pub struct State {
    /// [`Attendance`]s without their [`Break`]s.
    ///
    /// [`Break`]: attendance::Break
    attendances: HashMap<attendance::Id, Attendance>,

    /// [`Break`]s of all the [`Attendance`]s.
    ///
    /// [`Break`]: attendance::Break
    breaks: HashMap<attendance::breaks::Id, attendance::Break>,

    /// Workers ever locked.
    locks: HashSet<user::Id>,
}

impl State {
    /// Returns the stored [`Attendance`] along with its [`Break`]s ordered by
    /// their start.
    ///
    /// [`Break`]: attendance::Break
    fn assemble(&self, attendance: &Attendance) -> Attendance {
        let mut attendance = attendance.clone();
        attendance.breaks = self
            .breaks
            .values()
            .filter(|b| b.attendance_id == attendance.id)
            .cloned()
            .collect();
        attendance.breaks.sort_by_key(|b| b.start_time);
        attendance
    }

    /// Stores the provided [`Attendance`] row, ignoring its [`Break`]s.
    ///
    /// [`Break`]: attendance::Break
    fn put_attendance(&mut self, attendance: &Attendance) -> Result<(), Error> {
        let conflicts = attendance.is_active()
            && self.attendances.values().any(|a| {
                a.user_id == attendance.user_id
                    && a.id != attendance.id
                    && a.is_active()
            });
        if conflicts {
            return Err(Error::UniqueViolation(database::ONE_ACTIVE_PER_USER));
        }

        let mut row = attendance.clone();
        row.breaks = Vec::new();
        drop(self.attendances.insert(row.id, row));
        Ok(())
    }

    /// Stores the provided [`Break`].
    ///
    /// [`Break`]: attendance::Break
    fn put_break(&mut self, b: &attendance::Break) -> Result<(), Error> {
        let conflicts = b.is_open()
            && self.breaks.values().any(|other| {
                other.attendance_id == b.attendance_id
                    && other.id != b.id
                    && other.is_open()
            });
        if conflicts {
            return Err(Error::UniqueViolation(ONE_OPEN_PER_ATTENDANCE));
        }

        drop(self.breaks.insert(b.id, b.clone()));
        Ok(())
    }
}

/// Non-transactional access to a [`Memory`] database.
#[derive(Clone, Debug, Default)]
pub struct NonTx(Arc<Mutex<State>>);

/// Transactional access to a [`Memory`] database.
///
/// Holds the whole database exclusively until committed or dropped, and
/// works on a copy of it meanwhile.
#[derive(Clone, Debug)]
pub struct Tx(Arc<Mutex<Option<Working>>>);

/// Working copy of a [`Tx`].
#[derive(Debug)]
struct Working {
    /// Exclusive access to the [`State`] to be replaced on commit.
    guard: OwnedMutexGuard<State>,

    /// Modified copy of the [`State`].
    state: State,
}

/// Access to the [`State`] of a [`Memory`] database.
pub trait Access {
    /// Reads the [`State`] with the provided function.
    ///
    /// # Errors
    ///
    /// If the [`State`] is not accessible anymore.
    fn read<R>(
        &self,
        f: impl FnOnce(&State) -> R,
    ) -> impl Future<Output = Result<R, Traced<database::Error>>>;

    /// Modifies the [`State`] with the provided function.
    ///
    /// Nothing is modified if the function fails.
    ///
    /// # Errors
    ///
    /// If the function fails, or the [`State`] is not accessible anymore.
    fn write<R>(
        &self,
        f: impl FnOnce(&mut State) -> Result<R, Error>,
    ) -> impl Future<Output = Result<R, Traced<database::Error>>>;
}

impl Access for NonTx {
    async fn read<R>(
        &self,
        f: impl FnOnce(&State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        Ok(f(&*self.0.lock().await))
    }

    async fn write<R>(
        &self,
        f: impl FnOnce(&mut State) -> Result<R, Error>,
    ) -> Result<R, Traced<database::Error>> {
        let mut state = self.0.lock().await;
        let mut next = state.clone();
        let out = f(&mut next)
            .map_err(tracerr::from_and_wrap!(=> database::Error))?;
        *state = next;
        Ok(out)
    }
}

impl Access for Tx {
    async fn read<R>(
        &self,
        f: impl FnOnce(&State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        let working = self.0.lock().await;
        let working = working
            .as_ref()
            .ok_or_else(|| tracerr::new!(Error::TxFinished))
            .map_err(tracerr::map_from)?;
        Ok(f(&working.state))
    }

    async fn write<R>(
        &self,
        f: impl FnOnce(&mut State) -> Result<R, Error>,
    ) -> Result<R, Traced<database::Error>> {
        let mut working = self.0.lock().await;
        let working = working
            .as_mut()
            .ok_or_else(|| tracerr::new!(Error::TxFinished))
            .map_err(tracerr::map_from)?;
        let mut next = working.state.clone();
        let out = f(&mut next)
            .map_err(tracerr::from_and_wrap!(=> database::Error))?;
        working.state = next;
        Ok(out)
    }
}

/// [`Memory`] database [`Error`].
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Unique constraint is violated.
    #[display("Unique constraint `{_0}` is violated")]
    UniqueViolation(#[error(not(source))] &'static str),

    /// [`Tx`] is already committed.
    #[display("Transaction is already committed")]
    TxFinished,
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::UniqueViolation(c) => constraint.map_or(true, |x| x == *c),
            Self::TxFinished => false,
        }
    }
}

impl Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        let Memory(NonTx(shared)) = self;
        let guard = Arc::clone(shared).lock_owned().await;
        let state = guard.clone();
        Ok(Memory(Tx(Arc::new(Mutex::new(Some(Working { guard, state }))))))
    }
}

impl Database<Transact> for Memory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        let Memory(Tx(working)) = self;
        let Working { mut guard, state } = working
            .lock()
            .await
            .take()
            .ok_or_else(|| tracerr::new!(Error::TxFinished))
            .map_err(tracerr::map_from)?;
        *guard = state;
        Ok(())
    }
}

impl<C: Access> Database<Select<By<Option<Attendance>, attendance::Id>>>
    for Memory<C>
{
    type Ok = Option<Attendance>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Attendance>, attendance::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0
            .read(|s| s.attendances.get(&id).map(|a| s.assemble(a)))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Select<By<Option<Active<Attendance>>, user::Id>>>
    for Memory<C>
{
    type Ok = Option<Active<Attendance>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Active<Attendance>>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let user_id = by.into_inner();
        self.0
            .read(|s| {
                s.attendances
                    .values()
                    .filter(|a| a.user_id == user_id && a.is_active())
                    .max_by_key(|a| a.created_at)
                    .map(|a| Active(s.assemble(a)))
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Select<By<Option<Attendance>, (user::Id, Date)>>>
    for Memory<C>
{
    type Ok = Option<Attendance>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Attendance>, (user::Id, Date)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (user_id, date) = by.into_inner();
        self.0
            .read(|s| {
                s.attendances
                    .values()
                    .filter(|a| a.user_id == user_id && a.date == date)
                    .max_by_key(|a| a.created_at)
                    .map(|a| s.assemble(a))
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Select<By<Vec<Attendance>, list::Selector>>>
    for Memory<C>
{
    type Ok = Vec<Attendance>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Attendance>, list::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let list::Selector { filter, limit } = by.into_inner();
        self.0
            .read(|s| {
                let mut found = s
                    .attendances
                    .values()
                    .filter(|a| filter.matches(a.user_id, a.date))
                    .collect::<Vec<_>>();
                found.sort_by(|a, b| {
                    (b.date, b.clock_in).cmp(&(a.date, a.clock_in))
                });
                found
                    .into_iter()
                    .take(limit.get())
                    .map(|a| s.assemble(a))
                    .collect()
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Insert<Attendance>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(attendance): Insert<Attendance>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .write(|s| {
                s.put_attendance(&attendance)?;
                attendance.breaks.iter().try_for_each(|b| s.put_break(b))
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Update<Attendance>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(attendance): Update<Attendance>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .write(|s| s.put_attendance(&attendance))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Insert<attendance::Break>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(b): Insert<attendance::Break>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .write(|s| s.put_break(&b))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Update<attendance::Break>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(b): Update<attendance::Break>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .write(|s| s.put_break(&b))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Lock<By<Attendance, user::Id>>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Attendance, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let user_id = by.into_inner();
        self.0
            .write(|s| {
                _ = s.locks.insert(user_id);
                Ok(())
            })
            .await
            .map_err(tracerr::wrap!())
    }
}

#[cfg(test)]
mod spec {
    use common::{
        operations::{By, Commit, Insert, Select, Transact},
        DateTime, TimeZone,
    };

    use crate::{
        domain::{attendance, user, Attendance},
        infra::{database, Database},
        read::attendance::Active,
    };

    use super::Memory;

    fn shift(user_id: user::Id) -> Attendance {
        Attendance::clock_in(user_id, TimeZone::utc(), DateTime::now())
    }

    #[tokio::test]
    async fn uncommitted_tx_changes_nothing() {
        let db = Memory::new();
        let a = shift(user::Id::new());

        {
            let tx = db.execute(Transact).await.unwrap();
            tx.execute(Insert(a.clone())).await.unwrap();
            let seen = tx
                .execute(Select(By::<Option<Attendance>, _>::new(a.id)))
                .await
                .unwrap();
            assert_eq!(seen.map(|a| a.id), Some(a.id));
        }

        let found = db
            .execute(Select(By::<Option<Attendance>, _>::new(a.id)))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn committed_tx_applies() {
        let db = Memory::new();
        let a = shift(user::Id::new());

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Insert(a.clone())).await.unwrap();
        tx.execute(Commit).await.unwrap();
        assert!(tx.execute(Commit).await.is_err());

        let Active(found) = db
            .execute(Select(By::<Option<Active<Attendance>>, _>::new(
                a.user_id,
            )))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, a);
    }

    #[tokio::test]
    async fn one_active_per_user() {
        let db = Memory::new();
        let user = user::Id::new();

        db.execute(Insert(shift(user))).await.unwrap();
        let err = db.execute(Insert(shift(user))).await.unwrap_err();

        assert!(err
            .as_ref()
            .is_unique_violation(Some(database::ONE_ACTIVE_PER_USER)));
        assert!(db.execute(Insert(shift(user::Id::new()))).await.is_ok());
    }

    #[tokio::test]
    async fn one_open_break_per_shift() {
        let db = Memory::new();
        let now = DateTime::now();
        let a = shift(user::Id::new());

        let first = attendance::Break::start(a.id, Default::default(), now);
        let second = attendance::Break::start(a.id, Default::default(), now);
        db.execute(Insert(a)).await.unwrap();
        db.execute(Insert(first)).await.unwrap();

        assert!(db.execute(Insert(second)).await.is_err());
    }
}
