//! Validation and constraint errors shared by all entities.

use crate::model::continent::ContinentId;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Reasons an entity value is rejected before it reaches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is empty or whitespace only.
    EmptyField(&'static str),
    /// Country flag is not exactly two ASCII letters.
    InvalidCountryFlag(String),
    /// Country has no continent reference.
    MissingContinent,
    /// Continent has not been persisted yet, so nothing can reference it.
    UnsavedContinent,
    /// Country already belongs to this other continent; move it with
    /// `transfer` instead.
    AttachedElsewhere(ContinentId),
    /// Country does not belong to the continent it is moved away from.
    NotAttachedTo(Option<ContinentId>),
    /// `create` received an entity that already carries an identifier.
    AssignedId(i64),
    /// `edit` received an entity without identifier.
    MissingId,
    /// Version token outside the allowed range for the operation.
    InvalidVersion(i64),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "`{field}` must not be empty"),
            Self::InvalidCountryFlag(value) => write!(
                f,
                "country flag must be exactly 2 alphabetic characters, got `{value}`"
            ),
            Self::MissingContinent => write!(f, "a country must belong to a continent"),
            Self::UnsavedContinent => {
                write!(f, "continent must be persisted before countries can reference it")
            }
            Self::AttachedElsewhere(current) => write!(
                f,
                "country already belongs to continent {current}; transfer it instead"
            ),
            Self::NotAttachedTo(Some(continent_id)) => {
                write!(f, "country is not attached to continent {continent_id}")
            }
            Self::NotAttachedTo(None) => {
                write!(f, "country cannot leave a continent that was never saved")
            }
            Self::AssignedId(id) => {
                write!(f, "new entity must not carry an identifier, got {id}")
            }
            Self::MissingId => write!(f, "entity identifier is required"),
            Self::InvalidVersion(version) => write!(f, "invalid version token {version}"),
        }
    }
}

impl Error for ValidationError {}

/// Uniqueness or relational rule rejected by storage or by the aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintViolation {
    /// A unique column already holds this value.
    Duplicate {
        entity: &'static str,
        field: String,
    },
    /// A foreign key points at a row that does not exist.
    MissingReference { entity: &'static str, detail: String },
    /// The row is still referenced by rows of another table.
    StillReferenced { entity: &'static str },
    /// Continent still has countries and the delete did not cascade.
    ContinentHasCountries {
        continent_id: ContinentId,
        countries: u64,
    },
    /// Any other storage-level constraint (NOT NULL, CHECK).
    Other(String),
}

impl Display for ConstraintViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Duplicate { entity, field } => {
                write!(f, "{entity} with the same `{field}` already exists")
            }
            Self::MissingReference { entity, detail } => {
                write!(f, "{entity} references a missing row: {detail}")
            }
            Self::StillReferenced { entity } => {
                write!(f, "{entity} is still referenced by other rows")
            }
            Self::ContinentHasCountries {
                continent_id,
                countries,
            } => write!(
                f,
                "continent {continent_id} still has {countries} attached countries"
            ),
            Self::Other(message) => write!(f, "constraint violated: {message}"),
        }
    }
}

impl Error for ConstraintViolation {}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}

pub(crate) fn require_version(version: i64) -> Result<(), ValidationError> {
    if version < 0 {
        return Err(ValidationError::InvalidVersion(version));
    }
    Ok(())
}
