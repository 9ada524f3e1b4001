//! [`Config`]-related definitions.

use std::time::Duration;

use common::TimeZone;
use serde::Deserialize;
use smart_default::SmartDefault;

/// Client configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Config {
    /// Base URL of the attendance server.
    #[default("http://127.0.0.1:8080".to_owned())]
    pub base_url: String,

    /// Timeout of a single request to the server.
    #[default(Duration::from_secs(10))]
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Time a cached server response is considered fresh.
    #[default(Duration::from_secs(30))]
    #[serde(with = "humantime_serde")]
    pub freshness: Duration,

    /// Interval of the background resynchronization with the server.
    #[default(Duration::from_secs(60))]
    #[serde(with = "humantime_serde")]
    pub resync_interval: Duration,

    /// Number of retries of a failed read-only request.
    ///
    /// State-changing requests are never retried.
    #[default(2)]
    pub read_retries: u8,

    /// [`TimeZone`] of the headquarters, used for display only.
    #[default(hq_time_zone())]
    pub hq_time_zone: TimeZone,
}

/// Returns the default [`Config::hq_time_zone`].
fn hq_time_zone() -> TimeZone {
    TimeZone::by_name("America/Los_Angeles").unwrap_or_default()
}
