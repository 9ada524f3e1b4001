//! Marker types tagging [`DateTimeOf`] instants of an attendance record.
//!
//! [`DateTimeOf`]: crate::DateTimeOf

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing an entity modification.
#[derive(Clone, Copy, Debug)]
pub struct Modification;

/// Marker type describing a start of a shift.
#[derive(Clone, Copy, Debug)]
pub struct ClockIn;

/// Marker type describing an end of a shift.
#[derive(Clone, Copy, Debug)]
pub struct ClockOut;

/// Marker type describing a start of something, e.g. a break.
#[derive(Clone, Copy, Debug)]
pub struct Start;

/// Marker type describing an end of something, e.g. a break.
#[derive(Clone, Copy, Debug)]
pub struct End;

/// Marker type describing a shift report submission.
#[derive(Clone, Copy, Debug)]
pub struct Report;

/// Marker type describing an expiration, e.g. of a session.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;
