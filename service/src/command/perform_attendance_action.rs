//! [`Command`] for performing an attendance [`Action`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted, Update},
    TimeZone,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        attendance::{self, Action, Transition, TransitionError},
        user, Attendance,
    },
    infra::{database, Database},
    read::attendance::{Active, Snapshot},
    Service,
};

use super::Command;

/// [`Command`] for performing an attendance [`Action`] on behalf of a worker.
///
/// Every [`Action`] runs in its own transaction holding the worker's lock,
/// so it either applies completely or not at all.
#[derive(Clone, Debug)]
pub struct PerformAttendanceAction {
    /// ID of the worker performing the [`Action`].
    pub user_id: user::Id,

    /// [`Action`] to perform.
    pub action: Action,

    /// [`TimeZone`] of the worker at the moment of the [`Action`].
    pub time_zone: TimeZone,
}

impl<Db> Command<PerformAttendanceAction> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Attendance, user::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Active<Attendance>>, user::Id>>,
            Ok = Option<Active<Attendance>>,
            Err = Traced<database::Error>,
        > + Database<Insert<Attendance>, Ok = (), Err = Traced<database::Error>>
        + Database<Update<Attendance>, Ok = (), Err = Traced<database::Error>>
        + Database<
            Insert<attendance::Break>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Update<attendance::Break>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Snapshot;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: PerformAttendanceAction,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let PerformAttendanceAction {
            user_id,
            action,
            time_zone,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions of the same worker.
        tx.execute(Lock(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let current = tx
            .execute(Select(By::<Option<Active<Attendance>>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .map(|Active(a)| a);

        let now = self.clock().now();
        let Transition {
            attendance,
            opened_break,
            closed_break,
        } = action
            .apply(current, user_id, time_zone, now)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        if let Action::ClockIn = action {
            check_inserted(tx.execute(Insert(attendance.clone())).await)
                .map_err(tracerr::wrap!())?;
        } else {
            if let Some(b) = opened_break {
                tx.execute(Insert(b))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
            }
            if let Some(b) = closed_break {
                tx.execute(Update(b))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
            }
            tx.execute(Update(attendance.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tracing::debug!(
            %user_id,
            attendance_id = %attendance.id,
            action = action.name(),
            status = %attendance.status,
            "attendance transition applied",
        );

        Ok(Snapshot::new(Some(attendance), now, time_zone))
    }
}

/// Error of [`PerformAttendanceAction`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Action`] is not allowed in the current state.
    #[display("Attendance action is not allowed: {_0}")]
    Transition(TransitionError),
}

/// Checks the result of inserting a new running [`Attendance`].
///
/// A violated one-running-shift constraint means another clock-in won the
/// race on the store side.
fn check_inserted(
    res: Result<(), Traced<database::Error>>,
) -> Result<(), Traced<ExecutionError>> {
    match res {
        Err(e)
            if e.as_ref()
                .is_unique_violation(Some(database::ONE_ACTIVE_PER_USER)) =>
        {
            Err(tracerr::new!(ExecutionError::Transition(
                TransitionError::AlreadyActive
            )))
        }
        res => res.map_err(tracerr::map_from_and_wrap!(=> ExecutionError)),
    }
}

#[cfg(all(test, feature = "memory"))]
mod spec {
    use std::time::Duration;

    use common::{
        operations::{By, Insert, Select},
        Date, DateTime, Hours, Minutes, TimeZone,
    };

    use crate::{
        domain::{
            attendance::{breaks, Action, DayAssignment, Status, TransitionError},
            user, Attendance,
        },
        infra::{database, memory, Database as _, Memory},
        read::attendance::list,
        Clock, Command as _, Config, Service,
    };

    use super::{check_inserted, ExecutionError, PerformAttendanceAction};

    const HOUR: Duration = Duration::from_secs(3600);
    const MINUTE: Duration = Duration::from_secs(60);

    fn service(at: &str) -> (Service<Memory>, Clock) {
        let clock = Clock::manual(DateTime::from_rfc3339(at).unwrap());
        let config = Config {
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(b"test"),
        };
        let service =
            Service::new(config, Memory::new()).with_clock(clock.clone());
        (service, clock)
    }

    fn perform(
        user_id: user::Id,
        action: Action,
        time_zone: TimeZone,
    ) -> PerformAttendanceAction {
        PerformAttendanceAction {
            user_id,
            action,
            time_zone,
        }
    }

    fn transition_error(err: &ExecutionError) -> Option<TransitionError> {
        match err {
            ExecutionError::Transition(e) => Some(*e),
            ExecutionError::Db(_) => None,
        }
    }

    #[tokio::test]
    async fn runs_whole_shift() {
        let (service, clock) = service("2024-12-04T01:00:00Z");
        let user = user::Id::new();
        let tz = TimeZone::utc();

        let snap = service
            .execute(perform(user, Action::ClockIn, tz))
            .await
            .unwrap();
        let a = snap.attendance.unwrap();
        assert_eq!(a.status, Status::ClockedIn);
        assert!(snap.active_break.is_none());

        clock.advance(2 * HOUR);
        let snap = service
            .execute(perform(
                user,
                Action::StartBreak(breaks::Kind::Lunch),
                tz,
            ))
            .await
            .unwrap();
        assert_eq!(snap.attendance.unwrap().status, Status::OnBreak);
        assert_eq!(snap.active_break.unwrap().kind, breaks::Kind::Lunch);

        clock.advance(30 * MINUTE);
        let snap = service
            .execute(perform(user, Action::EndBreak, tz))
            .await
            .unwrap();
        let a = snap.attendance.unwrap();
        assert_eq!(a.status, Status::ClockedIn);
        assert_eq!(a.total_break, Minutes::new(30));
        assert_eq!(a.breaks[0].duration, Some(Minutes::new(30)));

        clock.advance(6 * HOUR + 30 * MINUTE);
        let snap = service
            .execute(perform(
                user,
                Action::ClockOut(DayAssignment::ClockInDay),
                tz,
            ))
            .await
            .unwrap();
        let a = snap.attendance.unwrap();
        assert_eq!(a.status, Status::ClockedOut);
        assert_eq!(a.duration, Some(Minutes::new(540)));
        assert_eq!(a.total_hours, Some(Hours::from_minutes(Minutes::new(510))));
    }

    #[tokio::test]
    async fn clocks_in_again_after_clock_out() {
        let (service, clock) = service("2024-12-04T01:00:00Z");
        let user = user::Id::new();
        let tz = TimeZone::utc();

        let first = service
            .execute(perform(user, Action::ClockIn, tz))
            .await
            .unwrap()
            .attendance
            .unwrap();
        clock.advance(HOUR);
        drop(
            service
                .execute(perform(user, Action::ClockOut(false.into()), tz))
                .await
                .unwrap(),
        );

        let err = service
            .execute(perform(user, Action::StartBreak(breaks::Kind::Short), tz))
            .await
            .unwrap_err();
        assert_eq!(
            transition_error(err.as_ref()),
            Some(TransitionError::NotClockedIn),
        );

        let second = service
            .execute(perform(user, Action::ClockIn, tz))
            .await
            .unwrap()
            .attendance
            .unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(second.date, first.date);
        assert_eq!(second.status, Status::ClockedIn);
    }

    #[tokio::test]
    async fn rejects_second_clock_in() {
        let (service, clock) = service("2024-12-04T01:00:00Z");
        let user = user::Id::new();
        let tz = TimeZone::utc();

        let first = service
            .execute(perform(user, Action::ClockIn, tz))
            .await
            .unwrap()
            .attendance
            .unwrap();
        clock.advance(MINUTE);

        let err = service
            .execute(perform(user, Action::ClockIn, tz))
            .await
            .unwrap_err();
        assert_eq!(
            transition_error(err.as_ref()),
            Some(TransitionError::AlreadyActive),
        );

        let err = service
            .execute(perform(user, Action::EndBreak, tz))
            .await
            .unwrap_err();
        assert_eq!(
            transition_error(err.as_ref()),
            Some(TransitionError::NotOnBreak),
        );

        // The first shift is untouched.
        clock.advance(MINUTE);
        let snap = service
            .execute(perform(user, Action::StartBreak(Default::default()), tz))
            .await
            .unwrap();
        let a = snap.attendance.unwrap();
        assert_eq!(a.id, first.id);
        assert_eq!(a.clock_in, first.clock_in);
    }

    #[tokio::test]
    async fn clock_out_ends_running_break() {
        let (service, clock) = service("2024-12-04T01:00:00Z");
        let user = user::Id::new();
        let tz = TimeZone::utc();

        drop(
            service
                .execute(perform(user, Action::ClockIn, tz))
                .await
                .unwrap(),
        );
        clock.advance(HOUR);
        drop(
            service
                .execute(perform(
                    user,
                    Action::StartBreak(breaks::Kind::Personal),
                    tz,
                ))
                .await
                .unwrap(),
        );
        clock.advance(15 * MINUTE);

        let snap = service
            .execute(perform(user, Action::ClockOut(false.into()), tz))
            .await
            .unwrap();
        let a = snap.attendance.unwrap();
        assert!(snap.active_break.is_none());
        assert_eq!(a.status, Status::ClockedOut);
        assert_eq!(a.total_break, Minutes::new(15));
        assert!(a.breaks.iter().all(|b| !b.is_open()));
    }

    #[tokio::test]
    async fn buckets_overnight_shift() {
        let tz = TimeZone::by_name("Asia/Manila").unwrap();
        let user = user::Id::new();

        // Day shift at 16:00 local on 2024-12-03.
        let (service, clock) = service("2024-12-03T08:00:00Z");
        drop(
            service
                .execute(perform(user, Action::ClockIn, tz))
                .await
                .unwrap(),
        );
        clock.advance(HOUR);
        drop(
            service
                .execute(perform(user, Action::ClockOut(false.into()), tz))
                .await
                .unwrap(),
        );

        // 23:50 local on 2024-12-03 till 00:10 local on 2024-12-04.
        clock.set(DateTime::from_rfc3339("2024-12-03T15:50:00Z").unwrap());
        drop(
            service
                .execute(perform(user, Action::ClockIn, tz))
                .await
                .unwrap(),
        );
        clock.advance(20 * MINUTE);
        let kept = service
            .execute(perform(user, Action::ClockOut(false.into()), tz))
            .await
            .unwrap()
            .attendance
            .unwrap();
        assert_eq!(kept.date, Date::from_ymd(2024, 12, 3).unwrap());

        // 23:50 local on 2024-12-04 till 00:10 local on 2024-12-05.
        clock.set(DateTime::from_rfc3339("2024-12-04T15:50:00Z").unwrap());
        drop(
            service
                .execute(perform(user, Action::ClockIn, tz))
                .await
                .unwrap(),
        );
        clock.advance(20 * MINUTE);
        let moved = service
            .execute(perform(user, Action::ClockOut(true.into()), tz))
            .await
            .unwrap()
            .attendance
            .unwrap();
        assert_eq!(moved.date, Date::from_ymd(2024, 12, 5).unwrap());
    }

    #[tokio::test]
    async fn lets_one_of_racing_clock_ins_win() {
        let (service, _) = service("2024-12-04T01:00:00Z");
        let user = user::Id::new();
        let tz = TimeZone::utc();

        let (a, b) = tokio::join!(
            service.execute(perform(user, Action::ClockIn, tz)),
            service.execute(perform(user, Action::ClockIn, tz)),
        );

        let (won, lost) = match (a, b) {
            (Ok(won), Err(lost)) | (Err(lost), Ok(won)) => (won, lost),
            (a, b) => panic!("exactly one clock-in must win: {a:?}, {b:?}"),
        };
        assert_eq!(won.attendance.unwrap().status, Status::ClockedIn);
        assert_eq!(
            transition_error(lost.as_ref()),
            Some(TransitionError::AlreadyActive),
        );

        let stored = service
            .database()
            .execute(Select(By::<Vec<Attendance>, _>::new(list::Selector {
                filter: list::Filter {
                    user_id: Some(user),
                    from: None,
                    to: None,
                },
                limit: list::Limit::default(),
            })))
            .await
            .unwrap();
        assert_eq!(stored.iter().filter(|a| a.is_active()).count(), 1);
    }

    #[tokio::test]
    async fn treats_store_conflict_on_clock_in_as_already_active() {
        let db = Memory::new();
        let user = user::Id::new();
        let now = DateTime::from_rfc3339("2024-12-04T01:00:00Z").unwrap();
        let shift = || Attendance::clock_in(user, TimeZone::utc(), now);
        db.execute(Insert(shift())).await.unwrap();

        let err = check_inserted(db.execute(Insert(shift())).await)
            .unwrap_err();
        assert_eq!(
            transition_error(err.as_ref()),
            Some(TransitionError::AlreadyActive),
        );

        let err = check_inserted(Err(tracerr::new!(
            database::Error::from(memory::Error::TxFinished)
        )))
        .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::Db(_)));
    }
}
