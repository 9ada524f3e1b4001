//! Domain definitions.

pub mod attendance;
pub mod user;

pub use self::attendance::Attendance;
