//! Contract shared by every persisted entity.

use crate::model::validation::ValidationError;
use std::fmt::{Debug, Display};

/// Surrogate identifier assigned by storage.
///
/// Backed by a 64-bit integer so storage adapters can move it in and out of
/// integer primary keys without knowing the concrete entity.
pub trait EntityId: Copy + Eq + Ord + Debug + Display {
    fn from_raw(raw: i64) -> Self;
    fn raw(self) -> i64;
}

/// A persisted value with identity and an optimistic concurrency token.
pub trait Entity: Clone {
    type Id: EntityId;

    /// Lowercase entity name used in errors and log events.
    const NAME: &'static str;

    /// `None` until the entity has been created.
    fn id(&self) -> Option<Self::Id>;

    /// Version the caller last observed; `0` for new entities.
    fn version(&self) -> i64;

    /// Checks field-level invariants that do not need storage access.
    fn validate(&self) -> Result<(), ValidationError>;
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $crate::model::entity::EntityId for $name {
            fn from_raw(raw: i64) -> Self {
                Self(raw)
            }

            fn raw(self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

pub(crate) use entity_id;
