//! [`Resync`] loop of a [`Synchronizer`].

use std::convert::Infallible;

use common::{
    operations::{By, Perform, Select, Start, Update},
    TimeZone,
};
use service::{
    domain::attendance::{self, Action, ShiftReport},
    read::attendance::{list, History, Snapshot},
};
use tokio::time::{interval, MissedTickBehavior};
use tracerr::Traced;
use tracing as log;

use crate::{backend, Backend};

use super::Synchronizer;

/// Periodic resynchronization of a [`Synchronizer`] with the server.
///
/// Backstops any missed reconciliation, and re-evaluates the shift report
/// [`Gate`] on every fetch.
///
/// [`Gate`]: crate::Gate
#[derive(Clone, Copy, Debug)]
pub struct Resync;

impl<B> Backend<Start<Resync>> for Synchronizer<B>
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
    type Ok = ();
    type Err = Infallible;

    async fn execute(&self, _: Start<Resync>) -> Result<Self::Ok, Self::Err> {
        let mut interval = interval(self.config.resync_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            _ = interval.tick().await;
            match self.refresh().await {
                Ok(_) => {
                    if self.gate().is_blocked() {
                        log::info!("shift report is pending");
                    }
                }
                Err(e) => log::error!("`Resync` failed: {e}"),
            }
        }
    }
}
