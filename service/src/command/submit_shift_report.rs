//! [`Command`] for submitting a [`ShiftReport`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    TimeZone,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        attendance::{self, ShiftReport},
        user, Attendance,
    },
    infra::{database, Database},
    read::attendance::Snapshot,
    Service,
};

use super::Command;

/// [`Command`] for attaching a [`ShiftReport`] to an [`Attendance`] of its
/// owner.
///
/// A previously submitted [`ShiftReport`] is overwritten.
#[derive(Clone, Debug)]
pub struct SubmitShiftReport {
    /// ID of the worker submitting the [`ShiftReport`].
    pub user_id: user::Id,

    /// ID of the [`Attendance`] to attach the [`ShiftReport`] to.
    pub attendance_id: attendance::Id,

    /// [`ShiftReport`] to attach.
    pub report: ShiftReport,

    /// [`TimeZone`] of the worker.
    pub time_zone: TimeZone,
}

impl<Db> Command<SubmitShiftReport> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Attendance, user::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Attendance>, attendance::Id>>,
            Ok = Option<Attendance>,
            Err = Traced<database::Error>,
        > + Database<Update<Attendance>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Snapshot;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: SubmitShiftReport,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SubmitShiftReport {
            user_id,
            attendance_id,
            report,
            time_zone,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut attendance = tx
            .execute(Select(By::<Option<Attendance>, _>::new(attendance_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::AttendanceNotExists(attendance_id))
            .map_err(tracerr::wrap!())?;
        if attendance.user_id != user_id {
            return Err(tracerr::new!(E::NotOwner(attendance_id)));
        }

        let now = self.clock().now();
        attendance.submit_report(report, now);
        tx.execute(Update(attendance.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tracing::debug!(
            %user_id,
            %attendance_id,
            "shift report submitted",
        );

        Ok(Snapshot::new(Some(attendance), now, time_zone))
    }
}

/// Error of [`SubmitShiftReport`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Attendance`] doesn't exist.
    #[display("`Attendance(id: {_0})` does not exist")]
    #[from(ignore)]
    AttendanceNotExists(#[error(not(source))] attendance::Id),

    /// [`Attendance`] belongs to another worker.
    #[display("`Attendance(id: {_0})` belongs to another worker")]
    #[from(ignore)]
    NotOwner(#[error(not(source))] attendance::Id),
}

#[cfg(all(test, feature = "memory"))]
mod spec {
    use std::time::Duration;

    use common::{DateTime, TimeZone};

    use crate::{
        command::PerformAttendanceAction,
        domain::{
            attendance::{self, Action, ShiftReport},
            user,
        },
        infra::Memory,
        Clock, Command as _, Config, Service,
    };

    use super::{ExecutionError, SubmitShiftReport};

    fn service() -> (Service<Memory>, Clock) {
        let clock = Clock::manual(
            DateTime::from_rfc3339("2024-12-04T01:00:00Z").unwrap(),
        );
        let config = Config {
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(b"test"),
        };
        let service =
            Service::new(config, Memory::new()).with_clock(clock.clone());
        (service, clock)
    }

    async fn finished_shift(
        service: &Service<Memory>,
        clock: &Clock,
        user_id: user::Id,
    ) -> attendance::Id {
        let tz = TimeZone::utc();
        let id = service
            .execute(PerformAttendanceAction {
                user_id,
                action: Action::ClockIn,
                time_zone: tz,
            })
            .await
            .unwrap()
            .attendance
            .unwrap()
            .id;
        clock.advance(Duration::from_secs(8 * 3600));
        drop(
            service
                .execute(PerformAttendanceAction {
                    user_id,
                    action: Action::ClockOut(false.into()),
                    time_zone: tz,
                })
                .await
                .unwrap(),
        );
        id
    }

    fn report(
        user_id: user::Id,
        attendance_id: attendance::Id,
        text: &str,
    ) -> SubmitShiftReport {
        SubmitShiftReport {
            user_id,
            attendance_id,
            report: ShiftReport::new(text).unwrap(),
            time_zone: TimeZone::utc(),
        }
    }

    #[tokio::test]
    async fn overwrites_previous_report() {
        let (service, clock) = service();
        let user = user::Id::new();
        let id = finished_shift(&service, &clock, user).await;

        let first = service
            .execute(report(user, id, "Closed 3 tickets"))
            .await
            .unwrap()
            .attendance
            .unwrap();
        clock.advance(Duration::from_secs(60));
        let second = service
            .execute(report(user, id, "Closed 4 tickets"))
            .await
            .unwrap()
            .attendance
            .unwrap();

        assert_eq!(
            second.shift_report.as_ref().map(AsRef::as_ref),
            Some("Closed 4 tickets"),
        );
        assert!(second.reported_at > first.reported_at);
        assert_eq!(second.status, first.status);
        assert_eq!(second.total_hours, first.total_hours);
    }

    #[tokio::test]
    async fn rejects_foreign_shift() {
        let (service, clock) = service();
        let id = finished_shift(&service, &clock, user::Id::new()).await;

        let err = service
            .execute(report(user::Id::new(), id, "Not mine"))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotOwner(x) if *x == id));
    }

    #[tokio::test]
    async fn rejects_unknown_shift() {
        let (service, _) = service();

        let err = service
            .execute(report(user::Id::new(), attendance::Id::new(), "Lost"))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::AttendanceNotExists(_),
        ));
    }
}
