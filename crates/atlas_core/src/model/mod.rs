//! Entity model for the continent/country catalog.
//!
//! # Responsibility
//! - Define the persisted shapes of `Continent` and `Country`.
//! - Own field-level validation and the continent/country aggregate rules.
//!
//! # Invariants
//! - Identifiers are assigned by storage and never change afterwards.
//! - `version` starts at 0 and only grows, one step per successful edit.
//! - A `Country` is only persistable while it references a continent.
//! - Deletion is permanent; there are no tombstones.

pub mod aggregate;
pub mod continent;
pub mod country;
pub mod entity;
pub mod validation;
