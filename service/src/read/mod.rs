//! Read entities definitions.

pub mod attendance;
