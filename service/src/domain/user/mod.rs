//! [`User`]-related definitions.
//!
//! Users themselves are managed by an external identity provider, so only
//! the pieces attendance tracking relies on are defined here.

pub mod session;

use common::define_kind;
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use self::session::Session;

/// ID of a worker whose attendance is tracked.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    #[doc = "Role of a `User` within the organization."]
    enum Role {
        #[doc = "Owner of the organization."]
        Owner = 1,

        #[doc = "Administrator of the organization."]
        Admin = 2,

        #[doc = "Member of the HR team."]
        Hr = 3,

        #[doc = "Regular team member."]
        Member = 4,

        #[doc = "Read-only viewer."]
        Viewer = 5,
    }
}

impl Role {
    /// Indicates whether this [`Role`] may read attendance of other users.
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        matches!(self, Self::Owner | Self::Admin | Self::Hr)
    }
}

#[cfg(test)]
mod spec {
    use super::Role;

    #[test]
    fn privileged_roles() {
        assert!(Role::Owner.is_privileged());
        assert!(Role::Admin.is_privileged());
        assert!(Role::Hr.is_privileged());
        assert!(!Role::Member.is_privileged());
        assert!(!Role::Viewer.is_privileged());
    }

    #[test]
    fn parses_screaming_snake_case() {
        assert_eq!("HR".parse::<Role>().unwrap(), Role::Hr);
        assert_eq!(Role::Member.to_string(), "MEMBER");
        assert!("member".parse::<Role>().is_err());
    }
}
