//! Scripted [`Backend`] running an in-memory attendance server.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, PoisonError,
};

use common::{
    operations::{By, Perform, Select, Update},
    DateTime, TimeZone,
};
use service::{
    command::{
        perform_attendance_action, submit_shift_report,
        PerformAttendanceAction, SubmitShiftReport,
    },
    domain::{
        attendance::{self, Action, DayAssignment, ShiftReport, TransitionError},
        user::{self, Role, Session},
    },
    infra::Memory,
    query,
    read::attendance::{list, History, Snapshot},
    Clock, Command as _, Config, Service,
};
use tokio::sync::Notify;
use tracerr::Traced;

use crate::{
    backend::{self, Rejection},
    Backend,
};

/// [`Backend`] serving a single worker from an in-memory [`Service`].
#[derive(Clone, Debug)]
pub(super) struct Fake {
    /// Underlying attendance [`Service`].
    service: Service<Memory>,

    /// ID of the served worker.
    user_id: user::Id,

    /// [`Script`] of this [`Fake`].
    script: Arc<Script>,
}

/// Scripted behavior and counters of a [`Fake`].
#[derive(Debug, Default)]
struct Script {
    /// Number of received read requests.
    fetches: AtomicUsize,

    /// Number of received actions.
    performs: AtomicUsize,

    /// Number of upcoming reads to fail.
    failing_reads: AtomicUsize,

    /// Number of upcoming actions to fail.
    failing_performs: AtomicUsize,

    /// [`Hold`] of the upcoming actions, if any.
    hold: Mutex<Option<Hold>>,
}

/// Hold of actions, pausing them until released.
#[derive(Clone, Debug, Default)]
pub(super) struct Hold {
    /// Notified once a held action is received.
    reached: Arc<Notify>,

    /// Notified to let a held action continue.
    released: Arc<Notify>,
}

impl Hold {
    /// Waits until a held action is received.
    pub(super) async fn reached(&self) {
        self.reached.notified().await;
    }

    /// Lets the held action continue.
    pub(super) fn release(&self) {
        self.released.notify_one();
    }
}

impl Fake {
    /// Creates a new [`Fake`] driven by the provided [`Clock`].
    pub(super) fn new(clock: Clock) -> Self {
        let config = Config {
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(b"fake"),
        };
        Self {
            service: Service::new(config, Memory::new()).with_clock(clock),
            user_id: user::Id::new(),
            script: Arc::default(),
        }
    }

    /// Returns the ID of the served worker.
    pub(super) fn user_id(&self) -> user::Id {
        self.user_id
    }

    /// Returns the number of received read requests.
    pub(super) fn fetches(&self) -> usize {
        self.script.fetches.load(Ordering::SeqCst)
    }

    /// Returns the number of received actions.
    pub(super) fn performs(&self) -> usize {
        self.script.performs.load(Ordering::SeqCst)
    }

    /// Fails the next `n` read requests as unavailable.
    pub(super) fn fail_next_reads(&self, n: usize) {
        self.script.failing_reads.store(n, Ordering::SeqCst);
    }

    /// Fails the next `n` actions as unavailable.
    pub(super) fn fail_next_performs(&self, n: usize) {
        self.script.failing_performs.store(n, Ordering::SeqCst);
    }

    /// Holds all the upcoming actions until released.
    pub(super) fn hold_performs(&self) -> Hold {
        let hold = Hold::default();
        *self
            .script
            .hold
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(hold.clone());
        hold
    }

    /// Clocks the worker out bypassing this [`Fake`], as another client
    /// would do.
    pub(super) async fn clock_out_elsewhere(&self) {
        drop(
            self.service
                .execute(PerformAttendanceAction {
                    user_id: self.user_id,
                    action: Action::ClockOut(DayAssignment::ClockInDay),
                    time_zone: TimeZone::utc(),
                })
                .await
                .unwrap(),
        );
    }

    /// Returns the [`Session`] of the served worker.
    fn session(&self) -> Session {
        Session {
            user_id: self.user_id,
            role: Role::Member,
            expires_at: DateTime::UNIX_EPOCH.coerce(),
        }
    }
}

/// Takes one scripted failure out of the provided counter, if any left.
fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Creates a new rejection [`backend::Error`].
fn rejected(status: u16, code: &str) -> Traced<backend::Error> {
    tracerr::new!(backend::Error::Rejected(Rejection::new(status, code, code)))
}

impl Backend<Select<By<Snapshot, TimeZone>>> for Fake {
    type Ok = Snapshot;
    type Err = Traced<backend::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Snapshot, TimeZone>>,
    ) -> Result<Self::Ok, Self::Err> {
        _ = self.script.fetches.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.script.failing_reads) {
            return Err(rejected(503, "UNAVAILABLE"));
        }
        self.service
            .execute(query::attendance::Current {
                user_id: self.user_id,
                time_zone: by.into_inner(),
            })
            .await
            .map_err(|_| rejected(500, "INTERNAL_SERVER_ERROR"))
    }
}

impl Backend<Select<By<History, list::Selector>>> for Fake {
    type Ok = History;
    type Err = Traced<backend::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<History, list::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        _ = self.script.fetches.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.script.failing_reads) {
            return Err(rejected(503, "UNAVAILABLE"));
        }
        let list::Selector { filter, limit } = by.into_inner();
        self.service
            .execute(query::attendance::History {
                initiator: self.session(),
                user_id: filter.user_id,
                from: filter.from,
                to: filter.to,
                limit,
            })
            .await
            .map_err(|e| match e.as_ref() {
                query::attendance::ExecutionError::PermissionDenied(_) => {
                    rejected(403, "PERMISSION_DENIED")
                }
                query::attendance::ExecutionError::Db(_) => {
                    rejected(500, "INTERNAL_SERVER_ERROR")
                }
            })
    }
}

impl Backend<Perform<By<Snapshot, (Action, TimeZone)>>> for Fake {
    type Ok = Snapshot;
    type Err = Traced<backend::Error>;

    async fn execute(
        &self,
        Perform(by): Perform<By<Snapshot, (Action, TimeZone)>>,
    ) -> Result<Self::Ok, Self::Err> {
        _ = self.script.performs.fetch_add(1, Ordering::SeqCst);
        let hold = self
            .script
            .hold
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(hold) = hold {
            hold.reached.notify_one();
            hold.released.notified().await;
        }
        if take_failure(&self.script.failing_performs) {
            return Err(rejected(503, "UNAVAILABLE"));
        }

        let (action, time_zone) = by.into_inner();
        self.service
            .execute(PerformAttendanceAction {
                user_id: self.user_id,
                action,
                time_zone,
            })
            .await
            .map_err(|e| match e.as_ref() {
                perform_attendance_action::ExecutionError::Transition(t) => {
                    rejected(409, transition_code(*t))
                }
                perform_attendance_action::ExecutionError::Db(_) => {
                    rejected(500, "INTERNAL_SERVER_ERROR")
                }
            })
    }
}

impl Backend<Update<By<Snapshot, (attendance::Id, ShiftReport, TimeZone)>>>
    for Fake
{
    type Ok = Snapshot;
    type Err = Traced<backend::Error>;

    async fn execute(
        &self,
        Update(by): Update<
            By<Snapshot, (attendance::Id, ShiftReport, TimeZone)>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let (attendance_id, report, time_zone) = by.into_inner();
        self.service
            .execute(SubmitShiftReport {
                user_id: self.user_id,
                attendance_id,
                report,
                time_zone,
            })
            .await
            .map_err(|e| match e.as_ref() {
                submit_shift_report::ExecutionError::AttendanceNotExists(_) => {
                    rejected(404, "NOT_FOUND")
                }
                submit_shift_report::ExecutionError::NotOwner(_) => {
                    rejected(403, "PERMISSION_DENIED")
                }
                submit_shift_report::ExecutionError::Db(_) => {
                    rejected(500, "INTERNAL_SERVER_ERROR")
                }
            })
    }
}

/// Returns the error code of the provided [`TransitionError`].
fn transition_code(e: TransitionError) -> &'static str {
    match e {
        TransitionError::AlreadyActive => "ALREADY_ACTIVE",
        TransitionError::NotClockedIn => "NOT_CLOCKED_IN",
        TransitionError::AlreadyOnBreak => "ALREADY_ON_BREAK",
        TransitionError::NotOnBreak => "NOT_ON_BREAK",
        TransitionError::ClockSkew => "CLOCK_SKEW",
    }
}
