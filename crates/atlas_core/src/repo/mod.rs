//! Repository contract and SQLite implementations.
//!
//! # Responsibility
//! - Define the generic CRUD + range + optimistic-concurrency contract.
//! - Isolate SQLite details from service and caller code.
//!
//! # Invariants
//! - Writes run `Entity::validate()` before any SQL mutation.
//! - `edit` is compare-and-swap on `version`; a stale version is rejected,
//!   never merged.
//! - "Not found" on reads is `Ok(None)`; on writes it is `RepoError::NotFound`.

use crate::db::DbError;
use crate::model::entity::Entity;
use crate::model::validation::{ConstraintViolation, ValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod continent_repo;
pub mod country_repo;
pub mod sqlite;

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors raised by repository operations.
///
/// Every error is scoped to the operation that produced it.
#[derive(Debug)]
pub enum RepoError {
    /// Entity failed field-level validation; caller must correct input.
    Validation(ValidationError),
    /// Uniqueness or relational constraint rejected the write.
    Constraint(ConstraintViolation),
    /// Submitted version does not match the stored one.
    Conflict {
        entity: &'static str,
        id: i64,
        expected: i64,
        actual: i64,
    },
    /// No stored entity with this identifier.
    NotFound { entity: &'static str, id: i64 },
    /// Underlying SQLite or bootstrap failure.
    Db(DbError),
    /// Persisted row cannot be converted back into an entity.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Column exists but its definition differs from `db::schema`.
    SchemaMismatch {
        table: &'static str,
        column: &'static str,
        detail: String,
    },
}

impl RepoError {
    pub(crate) fn not_found<E: Entity>(id: E::Id) -> Self {
        Self::NotFound {
            entity: E::NAME,
            id: crate::model::entity::EntityId::raw(id),
        }
    }

    /// Returns whether re-reading and retrying may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Constraint(err) => write!(f, "{err}"),
            Self::Conflict {
                entity,
                id,
                expected,
                actual,
            } => write!(
                f,
                "{entity} {id} was modified concurrently: submitted version {expected}, stored version {actual}"
            ),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "repository requires column `{column}` in table `{table}`"
            ),
            Self::SchemaMismatch {
                table,
                column,
                detail,
            } => write!(f, "column `{table}.{column}` does not match schema: {detail}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Constraint(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ConstraintViolation> for RepoError {
    fn from(value: ConstraintViolation) -> Self {
        Self::Constraint(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Typed CRUD contract over entity `E` keyed by `E::Id`.
///
/// Mutations assume they run inside a unit of work owned by the caller
/// (see `db::unit_of_work`); implementations never commit on their own.
pub trait Repository<E: Entity> {
    /// Persists a new entity and returns it with its assigned id and
    /// version 0.
    fn create(&self, entity: &E) -> RepoResult<E>;

    /// Persists changes if `entity.version()` matches the stored version,
    /// returning the stored entity with its version incremented by one.
    fn edit(&self, entity: &E) -> RepoResult<E>;

    fn find(&self, id: E::Id) -> RepoResult<Option<E>>;

    /// Entities ordered by identifier ascending.
    ///
    /// Negative `offset` counts as 0; `limit <= 0` yields an empty list.
    fn find_range(&self, offset: i64, limit: i64) -> RepoResult<Vec<E>>;

    /// Deletes the entity permanently.
    fn remove(&self, entity: &E) -> RepoResult<()>;

    fn count(&self) -> RepoResult<u64>;
}
