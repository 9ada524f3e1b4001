//! [`Query`] collection related to [`Attendance`]s.

use common::{
    operations::{By, Select},
    Date, TimeZone,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{user, user::Session, Attendance},
    infra::{database, Database},
    read::{
        self,
        attendance::{list, Active, Snapshot},
    },
    Service,
};

use super::Query;

/// Queries the current [`Snapshot`] of a worker: the running shift, or the
/// latest shift of the worker's local today.
#[derive(Clone, Copy, Debug)]
pub struct Current {
    /// ID of the worker.
    pub user_id: user::Id,

    /// [`TimeZone`] of the worker, defining the local today.
    pub time_zone: TimeZone,
}

impl<Db> Query<Current> for Service<Db>
where
    Db: Database<
            Select<By<Option<Active<Attendance>>, user::Id>>,
            Ok = Option<Active<Attendance>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Attendance>, (user::Id, Date)>>,
            Ok = Option<Attendance>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Snapshot;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Current { user_id, time_zone }: Current,
    ) -> Result<Self::Ok, Self::Err> {
        let now = self.clock().now();

        let active = self
            .database()
            .execute(Select(By::<Option<Active<Attendance>>, _>::new(user_id)))
            .await
            .map_err(tracerr::wrap!())?;
        let attendance = if let Some(Active(a)) = active {
            Some(a)
        } else {
            let today = now.local_date(&time_zone);
            self.database()
                .execute(Select(By::<Option<Attendance>, _>::new((
                    user_id, today,
                ))))
                .await
                .map_err(tracerr::wrap!())?
        };

        Ok(Snapshot::new(attendance, now, time_zone))
    }
}

/// Queries the attendance [`read::attendance::History`] visible to the
/// initiator.
#[derive(Clone, Copy, Debug)]
pub struct History {
    /// [`Session`] of the initiator of this [`Query`].
    pub initiator: Session,

    /// Worker to list the history of.
    ///
    /// [`None`] means the initiator for a non-privileged initiator, and all
    /// the workers for a privileged one.
    pub user_id: Option<user::Id>,

    /// Earliest [`Date`] to include.
    pub from: Option<Date>,

    /// Latest [`Date`] to include.
    pub to: Option<Date>,

    /// Maximum number of [`Attendance`]s to return.
    pub limit: list::Limit,
}

impl History {
    /// Resolves the [`list::Selector`] of this [`History`] query.
    ///
    /// # Errors
    ///
    /// If the initiator is not allowed to see the requested history.
    fn selector(&self) -> Result<list::Selector, ExecutionError> {
        let Session {
            user_id: initiator,
            role,
            ..
        } = self.initiator;

        let user_id = match self.user_id {
            Some(id) if id != initiator && !role.is_privileged() => {
                return Err(ExecutionError::PermissionDenied(id));
            }
            Some(id) => Some(id),
            None if role.is_privileged() => None,
            None => Some(initiator),
        };
        Ok(list::Selector {
            filter: list::Filter {
                user_id,
                from: self.from,
                to: self.to,
            },
            limit: self.limit,
        })
    }
}

impl<Db> Query<History> for Service<Db>
where
    Db: Database<
        Select<By<Vec<Attendance>, list::Selector>>,
        Ok = Vec<Attendance>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = read::attendance::History;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, query: History) -> Result<Self::Ok, Self::Err> {
        let selector = query.selector().map_err(tracerr::wrap!())?;

        Ok(self
            .database()
            .execute(Select(By::new(selector)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> ExecutionError))?
            .into())
    }
}

/// Error of [`History`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Initiator is not allowed to see the history of the worker.
    #[display("Not allowed to see the attendance of `User(id: {_0})`")]
    #[from(ignore)]
    PermissionDenied(#[error(not(source))] user::Id),
}
