//! [`Cache`] of server responses.

use std::time::Duration;

use common::TimeZone;
use service::{
    domain::user,
    read::attendance::{list, History, Snapshot},
};

/// Cache of server responses, keyed by the requested resource and its
/// parameters.
///
/// Entries expire once they are no longer fresh, and are invalidated
/// explicitly by the mutations affecting them.
#[derive(Clone, Debug)]
pub struct Cache(moka::future::Cache<Key, Value>);

/// Key of a [`Cache`] entry.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
enum Key {
    /// Current [`Snapshot`] in a [`TimeZone`].
    Current(TimeZone),

    /// [`History`] selected by a [`list::Selector`].
    History(list::Selector),
}

/// Value of a [`Cache`] entry.
#[derive(Clone, Debug)]
enum Value {
    /// Current [`Snapshot`].
    Current(Snapshot),

    /// Selected [`History`].
    History(History),
}

impl Cache {
    /// Maximum number of entries kept in a [`Cache`].
    const CAPACITY: u64 = 1_000;

    /// Creates a new empty [`Cache`] keeping its entries for the provided
    /// `freshness` period.
    #[must_use]
    pub fn new(freshness: Duration) -> Self {
        Self(
            moka::future::Cache::builder()
                .max_capacity(Self::CAPACITY)
                .time_to_live(freshness)
                .build(),
        )
    }

    /// Returns the fresh current [`Snapshot`] in the provided [`TimeZone`],
    /// if any.
    pub async fn current(&self, time_zone: TimeZone) -> Option<Snapshot> {
        match self.0.get(&Key::Current(time_zone)).await? {
            Value::Current(snapshot) => Some(snapshot),
            Value::History(_) => None,
        }
    }

    /// Stores the current [`Snapshot`] taken in the provided [`TimeZone`].
    pub async fn put_current(&self, time_zone: TimeZone, snapshot: Snapshot) {
        self.0
            .insert(Key::Current(time_zone), Value::Current(snapshot))
            .await;
    }

    /// Returns the fresh [`History`] selected by the provided
    /// [`list::Selector`], if any.
    pub async fn history(&self, selector: list::Selector) -> Option<History> {
        match self.0.get(&Key::History(selector)).await? {
            Value::History(history) => Some(history),
            Value::Current(_) => None,
        }
    }

    /// Stores the [`History`] selected by the provided [`list::Selector`].
    pub async fn put_history(&self, selector: list::Selector, history: History) {
        self.0
            .insert(Key::History(selector), Value::History(history))
            .await;
    }

    /// Invalidates all the current [`Snapshot`]s.
    pub async fn invalidate_current(&self) {
        self.invalidate(|key| matches!(key, Key::Current(_))).await;
    }

    /// Invalidates every [`History`] which may contain records of the
    /// provided worker.
    pub async fn invalidate_history(&self, user_id: user::Id) {
        self.invalidate(|key| match key {
            Key::History(s) => s.filter.user_id.map_or(true, |id| id == user_id),
            Key::Current(_) => false,
        })
        .await;
    }

    /// Invalidates the entries whose [`Key`]s match the provided predicate.
    async fn invalidate(&self, matches: impl Fn(&Key) -> bool) {
        let keys = self
            .0
            .iter()
            .filter_map(|(key, _)| matches(&key).then_some(key))
            .collect::<Vec<_>>();
        for key in keys {
            self.0.invalidate(&*key).await;
        }
    }
}
