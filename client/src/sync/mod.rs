//! [`Synchronizer`] of the local attendance [`View`] with the server.

mod resync;
#[cfg(test)]
mod fake;

use std::sync::{Mutex, PoisonError};

use common::{
    operations::{By, Perform, Select, Update},
    Date, TimeZone,
};
use derive_more::{Display, Error as StdError, From};
use service::{
    domain::{
        attendance::{self, breaks, Action, DayAssignment, ShiftReport, Status},
        user, Attendance,
    },
    read::attendance::{list, History, Snapshot},
    Clock,
};
use tracerr::Traced;
use tracing as log;

use crate::{backend, Backend, Cache, Config, Gate};

pub use self::resync::Resync;

/// Worker's intent to change their attendance.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Intent {
    /// Start a new shift.
    ClockIn,

    /// Start a break of the provided [`breaks::Kind`].
    StartBreak(breaks::Kind),

    /// End the running break.
    EndBreak,

    /// End the running shift.
    ///
    /// [`None`] means the worker has not chosen the [`DayAssignment`] yet,
    /// so it's asked for if the clock-in day already has a finished shift.
    ClockOut(Option<DayAssignment>),
}

/// Outcome of an [`Intent`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The [`Intent`] is done, and the reconciled [`Snapshot`] is returned.
    Done(Snapshot),

    /// Nothing is done: the clock-in [`Date`] of the running shift already
    /// has a finished shift, so the worker must choose the
    /// [`DayAssignment`] by repeating the [`Intent::ClockOut`] with it.
    ChooseDay(Date),
}

/// Local attendance view.
#[derive(Clone, Debug, Default)]
pub struct View {
    /// Last [`Snapshot`] confirmed by the server.
    confirmed: Option<Snapshot>,

    /// [`Action`] awaiting the server response.
    pending: Option<Pending>,
}

/// [`Action`] awaiting the server response.
#[derive(Clone, Debug)]
pub struct Pending {
    /// Awaited [`Action`].
    pub action: Action,

    /// [`Attendance`] as expected after the [`Action`].
    ///
    /// [`None`] if the [`Action`] is expected to be rejected, so nothing is
    /// speculated.
    pub speculative: Option<Attendance>,
}

impl View {
    /// Returns the last [`Snapshot`] confirmed by the server.
    #[must_use]
    pub fn confirmed(&self) -> Option<&Snapshot> {
        self.confirmed.as_ref()
    }

    /// Returns the [`Action`] awaiting the server response, if any.
    #[must_use]
    pub fn pending(&self) -> Option<&Pending> {
        self.pending.as_ref()
    }

    /// Returns the [`Attendance`] to display: the speculative one while an
    /// [`Action`] is pending, otherwise the confirmed one.
    #[must_use]
    pub fn attendance(&self) -> Option<&Attendance> {
        self.pending
            .as_ref()
            .and_then(|p| p.speculative.as_ref())
            .or_else(|| self.confirmed_attendance())
    }

    /// Returns the [`Attendance`] of the confirmed [`Snapshot`].
    fn confirmed_attendance(&self) -> Option<&Attendance> {
        self.confirmed.as_ref().and_then(|s| s.attendance.as_ref())
    }
}

/// Keeper of a worker's local attendance [`View`], in sync with the server.
///
/// At most one state-changing request is in flight at a time.
#[derive(Debug)]
pub struct Synchronizer<B> {
    /// [`Backend`] of the server.
    backend: B,

    /// [`Config`] of this [`Synchronizer`].
    config: Config,

    /// ID of the worker.
    user_id: user::Id,

    /// [`TimeZone`] of the worker.
    time_zone: TimeZone,

    /// [`Clock`] used for speculating.
    clock: Clock,

    /// [`Cache`] of the server responses.
    cache: Cache,

    /// Local [`View`].
    view: Mutex<View>,

    /// Guard of the in-flight state-changing request.
    in_flight: tokio::sync::Mutex<()>,
}

impl<B> Synchronizer<B> {
    /// Creates a new [`Synchronizer`] of the provided worker's attendance.
    #[must_use]
    pub fn new(
        backend: B,
        config: Config,
        user_id: user::Id,
        time_zone: TimeZone,
    ) -> Self {
        Self {
            backend,
            cache: Cache::new(config.freshness),
            config,
            user_id,
            time_zone,
            clock: Clock::System,
            view: Mutex::default(),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    /// Replaces the [`Clock`] of this [`Synchronizer`].
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Returns a copy of the current local [`View`].
    #[must_use]
    pub fn view(&self) -> View {
        self.lock_view().clone()
    }

    /// Evaluates the shift report [`Gate`] over the confirmed [`View`].
    #[must_use]
    pub fn gate(&self) -> Gate {
        Gate::evaluate(
            self.lock_view().confirmed_attendance(),
            self.clock.now(),
            &self.time_zone,
        )
    }

    /// Locks the [`View`] of this [`Synchronizer`].
    fn lock_view(&self) -> std::sync::MutexGuard<'_, View> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the confirmed [`Snapshot`], dropping any speculation.
    async fn confirm(&self, snapshot: Snapshot) {
        self.cache.put_current(self.time_zone, snapshot.clone()).await;
        let mut view = self.lock_view();
        view.confirmed = Some(snapshot);
        view.pending = None;
    }

    /// Speculatively applies the provided [`Action`] to the [`View`].
    fn speculate(&self, action: Action) {
        let mut view = self.lock_view();
        let speculative = action
            .apply(
                view.confirmed_attendance().cloned(),
                self.user_id,
                self.time_zone,
                self.clock.now(),
            )
            .map(|t| t.attendance)
            .ok();
        view.pending = Some(Pending {
            action,
            speculative,
        });
    }

    /// Drops the speculation, returning to the confirmed [`Snapshot`].
    fn rollback(&self) {
        self.lock_view().pending = None;
    }

    /// Merges the reported [`Attendance`] into the confirmed [`Snapshot`],
    /// if it's the one shown there.
    async fn merge_report(&self, reported: Snapshot) {
        let merged = {
            let mut view = self.lock_view();
            let Some(confirmed) = view.confirmed.as_mut() else {
                return;
            };
            let shown = confirmed.attendance.as_ref().map(|a| a.id);
            let Some(attendance) = reported.attendance else {
                return;
            };
            if shown != Some(attendance.id) {
                return;
            }
            *confirmed = Snapshot::new(
                Some(attendance),
                reported.server_time,
                confirmed.time_zone,
            );
            confirmed.clone()
        };
        self.cache.put_current(self.time_zone, merged).await;
    }
}

impl<B> Synchronizer<B>
where
    B: Backend<
            Select<By<Snapshot, TimeZone>>,
            Ok = Snapshot,
            Err = Traced<backend::Error>,
        > + Backend<
            Select<By<History, list::Selector>>,
            Ok = History,
            Err = Traced<backend::Error>,
        > + Backend<
            Perform<By<Snapshot, (Action, TimeZone)>>,
            Ok = Snapshot,
            Err = Traced<backend::Error>,
        > + Backend<
            Update<By<Snapshot, (attendance::Id, ShiftReport, TimeZone)>>,
            Ok = Snapshot,
            Err = Traced<backend::Error>,
        >,
{
    /// Returns the current [`Snapshot`], fetching it from the server unless
    /// a fresh one is cached.
    ///
    /// # Errors
    ///
    /// If the server cannot be reached within the retry limit.
    pub async fn current(&self) -> Result<Snapshot, Traced<Error>> {
        if let Some(snapshot) = self.cache.current(self.time_zone).await {
            return Ok(snapshot);
        }
        self.refresh().await
    }

    /// Fetches the current [`Snapshot`] from the server, replacing the
    /// confirmed one.
    ///
    /// # Errors
    ///
    /// If the server cannot be reached within the retry limit.
    pub async fn refresh(&self) -> Result<Snapshot, Traced<Error>> {
        let snapshot = self
            .read(|| Select(By::<Snapshot, _>::new(self.time_zone)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> Error))?;
        {
            // Speculation in progress is resolved by its own response.
            let mut view = self.lock_view();
            view.confirmed = Some(snapshot.clone());
        }
        self.cache.put_current(self.time_zone, snapshot.clone()).await;
        Ok(snapshot)
    }

    /// Returns the [`History`] selected by the provided [`list::Selector`],
    /// fetching it from the server unless a fresh one is cached.
    ///
    /// # Errors
    ///
    /// If the server rejects the request, or cannot be reached within the
    /// retry limit.
    pub async fn history(
        &self,
        selector: list::Selector,
    ) -> Result<History, Traced<Error>> {
        if let Some(history) = self.cache.history(selector).await {
            return Ok(history);
        }
        let history = self
            .read(|| Select(By::<History, _>::new(selector)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> Error))?;
        self.cache.put_history(selector, history.clone()).await;
        Ok(history)
    }

    /// Acts on the provided [`Intent`] of the worker.
    ///
    /// The [`View`] changes speculatively until the server responds. Then
    /// it's reconciled with the server on success, or rolled back to the
    /// last confirmed [`Snapshot`] on failure.
    ///
    /// # Errors
    ///
    /// - [`Error::InFlight`] if another request is in flight.
    /// - [`Error::Backend`] if the server rejects the [`Action`] or cannot
    ///   be reached.
    pub async fn act(&self, intent: Intent) -> Result<Outcome, Traced<Error>> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| tracerr::new!(Error::InFlight))?;

        let action = match intent {
            Intent::ClockIn => Action::ClockIn,
            Intent::StartBreak(kind) => Action::StartBreak(kind),
            Intent::EndBreak => Action::EndBreak,
            Intent::ClockOut(Some(day)) => Action::ClockOut(day),
            Intent::ClockOut(None) => {
                if let Some(date) = self
                    .shared_clock_in_day()
                    .await
                    .map_err(tracerr::wrap!())?
                {
                    return Ok(Outcome::ChooseDay(date));
                }
                Action::ClockOut(DayAssignment::ClockInDay)
            }
        };

        self.speculate(action);
        let performed = self
            .backend
            .execute(Perform(By::<Snapshot, _>::new((action, self.time_zone))))
            .await;
        let performed = match performed {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.rollback();
                // The rejection may stem from changes made elsewhere.
                self.cache.invalidate_current().await;
                log::warn!(
                    "`{}` failed, rolled back to the last server snapshot: {e}",
                    action.name(),
                );
                return Err(e).map_err(tracerr::map_from_and_wrap!(=> Error));
            }
        };

        self.cache.invalidate_history(self.user_id).await;
        let reconciled = match self.refresh().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::error!(
                    "failed to reconcile after `{}`: {e}",
                    action.name(),
                );
                performed
            }
        };
        self.confirm(reconciled.clone()).await;
        Ok(Outcome::Done(reconciled))
    }

    /// Submits the provided shift report of the [`Attendance`] with the
    /// provided ID.
    ///
    /// The [`Gate`] is re-evaluated against the updated [`View`].
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidReport`] if the `text` is blank or too long.
    /// - [`Error::InFlight`] if another request is in flight.
    /// - [`Error::Backend`] if the server rejects the report or cannot be
    ///   reached.
    pub async fn submit_report(
        &self,
        attendance_id: attendance::Id,
        text: impl Into<String>,
    ) -> Result<Snapshot, Traced<Error>> {
        let report = ShiftReport::new(text)
            .ok_or_else(|| tracerr::new!(Error::InvalidReport))?;
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| tracerr::new!(Error::InFlight))?;

        let reported = self
            .backend
            .execute(Update(By::<Snapshot, _>::new((
                attendance_id,
                report,
                self.time_zone,
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> Error))?;

        self.cache.invalidate_history(self.user_id).await;
        self.merge_report(reported.clone()).await;
        Ok(reported)
    }

    /// Looks for another finished shift of the worker on the clock-in
    /// [`Date`] of the running one.
    ///
    /// Decides on the server state only, as the local [`View`] may be
    /// missing or outdated (e.g. after a reload, or an action in another
    /// tab).
    async fn shared_clock_in_day(&self) -> Result<Option<Date>, Traced<Error>> {
        let running = self
            .refresh()
            .await
            .map_err(tracerr::wrap!())?
            .attendance
            .filter(Attendance::is_active)
            .map(|a| (a.id, a.date));
        let Some((running_id, date)) = running else {
            return Ok(None);
        };

        self.cache.invalidate_history(self.user_id).await;
        let shifts = self
            .history(list::Selector {
                filter: list::Filter {
                    user_id: Some(self.user_id),
                    from: Some(date),
                    to: Some(date),
                },
                limit: list::Limit::default(),
            })
            .await
            .map_err(tracerr::wrap!())?;
        let shared = shifts
            .attendance
            .iter()
            .any(|a| a.id != running_id && a.status == Status::ClockedOut);
        Ok(shared.then_some(date))
    }

    /// Executes the read-only operation made by `op`, retrying transient
    /// failures within the [`Config::read_retries`] limit.
    async fn read<Op, T>(
        &self,
        op: impl Fn() -> Op,
    ) -> Result<T, Traced<backend::Error>>
    where
        B: Backend<Op, Ok = T, Err = Traced<backend::Error>>,
    {
        let mut retries = self.config.read_retries;
        loop {
            match self.backend.execute(op()).await {
                Ok(ok) => return Ok(ok),
                Err(e) if retries > 0 && e.as_ref().is_transient() => {
                    retries -= 1;
                    log::warn!("retrying failed read: {e}");
                }
                Err(e) => return Err(e).map_err(tracerr::wrap!()),
            }
        }
    }
}

/// Error of a [`Synchronizer`] operation.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// [`Backend`] error.
    #[display("Server request failed: {_0}")]
    Backend(backend::Error),

    /// Another state-changing request is in flight.
    #[display("Another request is in flight")]
    InFlight,

    /// Shift report text is blank or too long.
    #[display("Shift report must be non-blank and at most 10000 characters")]
    InvalidReport,
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{Date, DateTime, TimeZone};
    use service::{
        domain::{
            attendance::{breaks, DayAssignment, Status},
            user,
        },
        Clock,
    };

    use service::read::attendance::list;

    use super::{fake::Fake, Error, Intent, Outcome, Synchronizer};
    use crate::{Config, Gate};

    const HOUR: Duration = Duration::from_secs(3600);

    fn synchronizer(at: &str, tz: &str) -> (Synchronizer<Fake>, Fake, Clock) {
        let clock = Clock::manual(DateTime::from_rfc3339(at).unwrap());
        let fake = Fake::new(clock.clone());
        let sync = Synchronizer::new(
            fake.clone(),
            Config::default(),
            fake.user_id(),
            tz.parse::<TimeZone>().unwrap(),
        )
        .with_clock(clock.clone());
        (sync, fake, clock)
    }

    fn done(outcome: Outcome) -> service::read::attendance::Snapshot {
        match outcome {
            Outcome::Done(s) => s,
            Outcome::ChooseDay(d) => panic!("unexpected day choice: {d}"),
        }
    }

    #[tokio::test]
    async fn reconciles_after_success() {
        let (sync, fake, _) = synchronizer("2024-12-04T01:00:00Z", "UTC");

        let snap = done(sync.act(Intent::ClockIn).await.unwrap());

        assert_eq!(snap.attendance.as_ref().unwrap().status, Status::ClockedIn);
        assert_eq!(sync.view().confirmed(), Some(&snap));
        assert!(sync.view().pending().is_none());
        // One perform, then one reconciling fetch.
        assert_eq!(fake.performs(), 1);
        assert_eq!(fake.fetches(), 1);
    }

    #[tokio::test]
    async fn speculates_while_in_flight() {
        let (sync, fake, _) = synchronizer("2024-12-04T01:00:00Z", "UTC");
        drop(sync.act(Intent::ClockIn).await.unwrap());
        let hold = fake.hold_performs();

        let acting = sync.act(Intent::StartBreak(breaks::Kind::Lunch));
        let observing = async {
            hold.reached().await;
            let view = sync.view();
            assert_eq!(view.attendance().unwrap().status, Status::OnBreak);
            assert_eq!(
                view.confirmed().unwrap().attendance.as_ref().unwrap().status,
                Status::ClockedIn,
            );

            let err = sync.act(Intent::EndBreak).await.unwrap_err();
            assert!(matches!(err.as_ref(), Error::InFlight));

            hold.release();
        };
        let (acted, ()) = tokio::join!(acting, observing);

        let snap = done(acted.unwrap());
        assert_eq!(snap.attendance.unwrap().status, Status::OnBreak);
        assert_eq!(snap.active_break.unwrap().kind, breaks::Kind::Lunch);
    }

    #[tokio::test]
    async fn rolls_back_on_rejection() {
        let (sync, fake, _) = synchronizer("2024-12-04T01:00:00Z", "UTC");
        drop(sync.act(Intent::ClockIn).await.unwrap());
        let before = sync.view().confirmed().cloned();

        // Another tab has already clocked out.
        fake.clock_out_elsewhere().await;
        let err = sync
            .act(Intent::StartBreak(breaks::Kind::Short))
            .await
            .unwrap_err();

        assert_eq!(
            match err.as_ref() {
                Error::Backend(e) => e.code(),
                Error::InFlight | Error::InvalidReport => None,
            },
            Some("NOT_CLOCKED_IN"),
        );
        let view = sync.view();
        assert!(view.pending().is_none());
        assert_eq!(view.confirmed().cloned(), before);
        assert_eq!(view.attendance().unwrap().status, Status::ClockedIn);

        // Next read goes to the server instead of the cache.
        let fetches = fake.fetches();
        let current = sync.current().await.unwrap();
        assert_eq!(fake.fetches(), fetches + 1);
        assert_eq!(current.attendance.unwrap().status, Status::ClockedOut);
    }

    #[tokio::test]
    async fn sends_actions_expected_to_fail() {
        let (sync, fake, _) = synchronizer("2024-12-04T01:00:00Z", "UTC");
        let hold = fake.hold_performs();

        let acting = sync.act(Intent::EndBreak);
        let observing = async {
            hold.reached().await;
            let view = sync.view();
            let pending = view.pending().unwrap();
            assert!(pending.speculative.is_none());
            assert!(view.attendance().is_none());
            hold.release();
        };
        let (acted, ()) = tokio::join!(acting, observing);

        assert!(acted.is_err());
        assert_eq!(fake.performs(), 1);
    }

    #[tokio::test]
    async fn retries_transient_reads() {
        let (sync, fake, _) = synchronizer("2024-12-04T01:00:00Z", "UTC");

        fake.fail_next_reads(2);
        assert!(sync.refresh().await.is_ok());
        assert_eq!(fake.fetches(), 3);

        fake.fail_next_reads(3);
        assert!(sync.refresh().await.is_err());
        assert_eq!(fake.fetches(), 6);
    }

    #[tokio::test]
    async fn never_retries_actions() {
        let (sync, fake, _) = synchronizer("2024-12-04T01:00:00Z", "UTC");

        fake.fail_next_performs(1);
        assert!(sync.act(Intent::ClockIn).await.is_err());
        assert_eq!(fake.performs(), 1);
        assert!(sync.view().attendance().is_none());
    }

    #[tokio::test]
    async fn serves_fresh_snapshot_from_cache() {
        let (sync, fake, _) = synchronizer("2024-12-04T01:00:00Z", "UTC");

        let first = sync.current().await.unwrap();
        let second = sync.current().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(fake.fetches(), 1);
    }

    #[tokio::test]
    async fn asks_for_day_when_clock_in_day_is_taken() {
        let (sync, fake, clock) =
            synchronizer("2024-12-04T07:00:00Z", "Asia/Manila");
        drop(sync.act(Intent::ClockIn).await.unwrap());
        clock.advance(HOUR);
        drop(sync.act(Intent::ClockOut(None)).await.unwrap());
        // 23:50 in Manila on Dec 4, clocking out after midnight.
        clock.set(DateTime::from_rfc3339("2024-12-04T15:50:00Z").unwrap());
        drop(sync.act(Intent::ClockIn).await.unwrap());
        clock.advance(HOUR / 3);
        let performs = fake.performs();

        let outcome = sync.act(Intent::ClockOut(None)).await.unwrap();

        let dec4 = Date::from_ymd(2024, 12, 4).unwrap();
        assert_eq!(outcome, Outcome::ChooseDay(dec4));
        assert_eq!(fake.performs(), performs);
        assert_eq!(
            sync.view().attendance().unwrap().status,
            Status::ClockedIn,
        );

        let snap = done(
            sync.act(Intent::ClockOut(Some(DayAssignment::NextDay)))
                .await
                .unwrap(),
        );
        let a = snap.attendance.unwrap();
        assert_eq!(a.status, Status::ClockedOut);
        assert_eq!(a.date, dec4.next());
    }

    #[tokio::test]
    async fn asks_for_day_despite_outdated_view() {
        let (sync, fake, clock) = synchronizer("2024-12-04T01:00:00Z", "UTC");
        drop(sync.act(Intent::ClockIn).await.unwrap());
        clock.advance(8 * HOUR);
        drop(sync.act(Intent::ClockOut(None)).await.unwrap());

        // Another tab saw the first shift finished.
        let other = Synchronizer::new(
            fake.clone(),
            Config::default(),
            fake.user_id(),
            TimeZone::utc(),
        )
        .with_clock(clock.clone());
        drop(other.refresh().await.unwrap());
        let dec4 = Date::from_ymd(2024, 12, 4).unwrap();
        drop(
            other
                .history(list::Selector {
                    filter: list::Filter {
                        user_id: Some(fake.user_id()),
                        from: Some(dec4),
                        to: Some(dec4),
                    },
                    limit: list::Limit::default(),
                })
                .await
                .unwrap(),
        );

        clock.advance(HOUR);
        drop(sync.act(Intent::ClockIn).await.unwrap());
        clock.advance(HOUR);
        let performs = fake.performs();

        // Reloaded tab without any fetched state.
        let reloaded = Synchronizer::new(
            fake.clone(),
            Config::default(),
            fake.user_id(),
            TimeZone::utc(),
        )
        .with_clock(clock.clone());
        assert_eq!(
            reloaded.act(Intent::ClockOut(None)).await.unwrap(),
            Outcome::ChooseDay(dec4),
        );
        assert_eq!(
            other.act(Intent::ClockOut(None)).await.unwrap(),
            Outcome::ChooseDay(dec4),
        );
        assert_eq!(fake.performs(), performs);
        assert_eq!(
            other.view().attendance().unwrap().status,
            Status::ClockedIn,
        );
    }

    #[tokio::test]
    async fn clocks_out_directly_on_free_day() {
        let (sync, _, clock) = synchronizer("2024-12-04T01:00:00Z", "UTC");
        drop(sync.act(Intent::ClockIn).await.unwrap());
        clock.advance(8 * HOUR);

        let snap = done(sync.act(Intent::ClockOut(None)).await.unwrap());

        let a = snap.attendance.unwrap();
        assert_eq!(a.status, Status::ClockedOut);
        assert_eq!(a.date, Date::from_ymd(2024, 12, 4).unwrap());
    }

    #[tokio::test]
    async fn gates_until_report_is_submitted() {
        let (sync, _, clock) = synchronizer("2024-12-04T01:00:00Z", "UTC");
        drop(sync.act(Intent::ClockIn).await.unwrap());
        clock.advance(8 * HOUR);
        drop(sync.act(Intent::ClockOut(None)).await.unwrap());

        let Gate::Blocked(id) = sync.gate() else {
            panic!("gate must block after clock-out");
        };

        let err = sync.submit_report(id, "  ").await.unwrap_err();
        assert!(matches!(err.as_ref(), Error::InvalidReport));
        assert!(sync.gate().is_blocked());

        drop(sync.submit_report(id, "Closed 12 tickets").await.unwrap());
        assert_eq!(sync.gate(), Gate::Open);
        let view = sync.view();
        let report = view.attendance().unwrap().shift_report.as_ref();
        assert_eq!(report.unwrap().to_string(), "Closed 12 tickets");

        // Re-surfaces after a reload while a report is pending.
        clock.advance(HOUR);
        drop(sync.act(Intent::ClockIn).await.unwrap());
        clock.advance(HOUR);
        drop(
            sync.act(Intent::ClockOut(Some(DayAssignment::ClockInDay)))
                .await
                .unwrap(),
        );
        let reloaded = Synchronizer::new(
            sync.backend.clone(),
            Config::default(),
            sync.user_id,
            TimeZone::utc(),
        )
        .with_clock(clock.clone());
        assert_eq!(reloaded.gate(), Gate::Open);
        drop(reloaded.refresh().await.unwrap());
        assert!(reloaded.gate().is_blocked());
    }
}
