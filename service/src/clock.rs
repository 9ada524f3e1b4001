//! [`Clock`] definitions.

use std::{
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};

use common::DateTime;

/// Source of the current moment for a [`Service`].
///
/// [`Service`]: crate::Service
#[derive(Clone, Debug, Default)]
pub enum Clock {
    /// System clock.
    #[default]
    System,

    /// Manually driven clock, standing still until moved.
    Manual(Arc<RwLock<DateTime>>),
}

impl Clock {
    /// Creates a new [`Clock::Manual`] standing at the provided moment.
    #[must_use]
    pub fn manual(at: DateTime) -> Self {
        Self::Manual(Arc::new(RwLock::new(at)))
    }

    /// Returns the current moment of this [`Clock`].
    #[must_use]
    pub fn now(&self) -> DateTime {
        match self {
            Self::System => DateTime::now(),
            Self::Manual(at) => {
                *at.read().unwrap_or_else(PoisonError::into_inner)
            }
        }
    }

    /// Moves this [`Clock`] to the provided moment.
    ///
    /// Does nothing for the [`Clock::System`].
    pub fn set(&self, to: DateTime) {
        if let Self::Manual(at) = self {
            *at.write().unwrap_or_else(PoisonError::into_inner) = to;
        }
    }

    /// Moves this [`Clock`] forward by the provided [`Duration`].
    ///
    /// Does nothing for the [`Clock::System`].
    pub fn advance(&self, by: Duration) {
        if let Self::Manual(at) = self {
            let mut at = at.write().unwrap_or_else(PoisonError::into_inner);
            *at = *at + by;
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use super::Clock;

    #[test]
    fn manual_clock_moves_only_when_told() {
        let t0 = DateTime::from_rfc3339("2024-12-04T01:00:00Z").unwrap();
        let clock = Clock::manual(t0);
        let shared = clock.clone();

        assert_eq!(clock.now(), t0);

        shared.advance(Duration::from_secs(90));
        assert_eq!(clock.now(), t0 + Duration::from_secs(90));

        shared.set(t0);
        assert_eq!(clock.now(), t0);
    }
}
