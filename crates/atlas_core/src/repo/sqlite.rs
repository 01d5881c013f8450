//! Generic SQLite repository driven by `db::schema` descriptions.
//!
//! # Responsibility
//! - Implement `Repository<E>` once for every entity that describes its
//!   storage mapping through `SqliteEntity`.
//! - Translate SQLite constraint failures into `ConstraintViolation`.
//!
//! # Invariants
//! - Range reads are ordered by identifier ascending.
//! - `edit` writes only updatable columns and bumps `version` in the same
//!   statement that checks it.
//! - Removal and its entity-specific preparation run in one savepoint.
//! - Construction fails unless every described column exists with the
//!   described type, nullability, uniqueness and foreign key.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::schema::{ColumnRole, ColumnSpec, EntitySchema};
use crate::db::with_savepoint;
use crate::model::aggregate::DeletePolicy;
use crate::model::entity::{Entity, EntityId};
use crate::model::validation::{ConstraintViolation, ValidationError};
use crate::repo::{RepoError, RepoResult, Repository};
use log::{debug, warn};
use rusqlite::types::Value;
use rusqlite::{ffi, params_from_iter, Connection, ErrorCode, OptionalExtension, Params, Row};
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;

/// Storage mapping for an entity persisted by `SqliteRepository`.
pub trait SqliteEntity: Entity + Sized {
    const SCHEMA: &'static EntitySchema;

    /// Value bound for a data column of `SCHEMA`.
    fn column_value(&self, column: &str) -> Value;

    /// Builds the entity from a row selected with `SCHEMA.select_sql()`.
    fn from_row(row: &Row<'_>) -> RepoResult<Self>;

    /// Loads derived state that lives in other tables.
    fn hydrate(&mut self, _conn: &Connection) -> RepoResult<()> {
        Ok(())
    }

    /// Runs before the row is deleted, inside the removal savepoint.
    fn before_remove(&self, _conn: &Connection, _policy: DeletePolicy) -> RepoResult<()> {
        Ok(())
    }
}

/// SQLite-backed repository for any `SqliteEntity`.
pub struct SqliteRepository<'conn, E> {
    conn: &'conn Connection,
    _entity: PhantomData<fn() -> E>,
}

impl<'conn, E: SqliteEntity> SqliteRepository<'conn, E> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, E::SCHEMA)?;
        Ok(Self {
            conn,
            _entity: PhantomData,
        })
    }

    /// Looks up an entity by its unique natural key column.
    pub fn find_by_natural_key(&self, key: &str) -> RepoResult<Option<E>> {
        let schema = E::SCHEMA;
        let sql = format!("{} WHERE {} = ?1;", schema.select_sql(), schema.natural_key);
        Ok(self.query_entities(&sql, [key])?.into_iter().next())
    }

    /// Deletes the entity, applying `policy` to rows that depend on it.
    pub fn remove_with(&self, entity: &E, policy: DeletePolicy) -> RepoResult<()> {
        let id = entity.id().ok_or(ValidationError::MissingId)?;
        let schema = E::SCHEMA;

        with_savepoint(self.conn, "atlas_remove", || -> RepoResult<()> {
            entity.before_remove(self.conn, policy)?;
            let changed = self
                .conn
                .execute(&schema.delete_sql(), [id.raw()])
                .map_err(|err| match map_write_error(schema, err) {
                    // On delete a foreign-key failure means dependents remain.
                    RepoError::Constraint(ConstraintViolation::MissingReference {
                        entity, ..
                    }) => ConstraintViolation::StillReferenced { entity }.into(),
                    other => other,
                })?;
            if changed == 0 {
                return Err(RepoError::not_found::<E>(id));
            }
            Ok(())
        })?;

        debug!(
            "event=entity_remove module=repo status=ok entity={} id={} policy={:?}",
            E::NAME,
            id,
            policy
        );
        Ok(())
    }

    pub(crate) fn query_entities<P: Params>(&self, sql: &str, params: P) -> RepoResult<Vec<E>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(E::from_row(row)?);
        }
        drop(rows);

        for entity in &mut entities {
            entity.hydrate(self.conn)?;
        }
        Ok(entities)
    }

    fn load_required(&self, id: E::Id) -> RepoResult<E> {
        self.find(id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("{} {id} missing in read-back", E::NAME))
        })
    }

    fn stored_version(&self, id: E::Id) -> RepoResult<Option<i64>> {
        let schema = E::SCHEMA;
        let version = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE {} = ?1;",
                    schema.version_column(),
                    schema.table,
                    schema.id_column()
                ),
                [id.raw()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(version)
    }
}

impl<E: SqliteEntity> Repository<E> for SqliteRepository<'_, E> {
    fn create(&self, entity: &E) -> RepoResult<E> {
        if let Some(id) = entity.id() {
            return Err(ValidationError::AssignedId(id.raw()).into());
        }
        if entity.version() != 0 {
            return Err(ValidationError::InvalidVersion(entity.version()).into());
        }
        entity.validate()?;

        let schema = E::SCHEMA;
        let values = schema
            .data_columns()
            .map(|column| entity.column_value(column.name))
            .collect::<Vec<_>>();
        self.conn
            .execute(&schema.insert_sql(), params_from_iter(values))
            .map_err(|err| map_write_error(schema, err))?;

        let id = E::Id::from_raw(self.conn.last_insert_rowid());
        debug!(
            "event=entity_create module=repo status=ok entity={} id={}",
            E::NAME,
            id
        );
        self.load_required(id)
    }

    fn edit(&self, entity: &E) -> RepoResult<E> {
        let id = entity.id().ok_or(ValidationError::MissingId)?;
        entity.validate()?;

        let schema = E::SCHEMA;
        let mut values = schema
            .updatable_columns()
            .map(|column| entity.column_value(column.name))
            .collect::<Vec<_>>();
        values.push(Value::Integer(id.raw()));
        values.push(Value::Integer(entity.version()));

        let changed = self
            .conn
            .execute(&schema.update_sql(), params_from_iter(values))
            .map_err(|err| map_write_error(schema, err))?;

        if changed == 0 {
            let Some(actual) = self.stored_version(id)? else {
                return Err(RepoError::not_found::<E>(id));
            };
            warn!(
                "event=entity_edit module=repo status=conflict entity={} id={} expected_version={} actual_version={}",
                E::NAME,
                id,
                entity.version(),
                actual
            );
            return Err(RepoError::Conflict {
                entity: E::NAME,
                id: id.raw(),
                expected: entity.version(),
                actual,
            });
        }

        debug!(
            "event=entity_edit module=repo status=ok entity={} id={} version={}",
            E::NAME,
            id,
            entity.version() + 1
        );
        self.load_required(id)
    }

    fn find(&self, id: E::Id) -> RepoResult<Option<E>> {
        let schema = E::SCHEMA;
        let sql = format!("{} WHERE {} = ?1;", schema.select_sql(), schema.id_column());
        Ok(self.query_entities(&sql, [id.raw()])?.into_iter().next())
    }

    fn find_range(&self, offset: i64, limit: i64) -> RepoResult<Vec<E>> {
        if limit <= 0 {
            return Ok(Vec::new());
        }
        let schema = E::SCHEMA;
        let sql = format!(
            "{} ORDER BY {} ASC LIMIT ?1 OFFSET ?2;",
            schema.select_sql(),
            schema.id_column()
        );
        self.query_entities(&sql, [limit, offset.max(0)])
    }

    fn remove(&self, entity: &E) -> RepoResult<()> {
        self.remove_with(entity, DeletePolicy::Restrict)
    }

    fn count(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row(&E::SCHEMA.count_sql(), [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count {count}")))
    }
}

/// Maps SQLite constraint failures on writes to `ConstraintViolation`.
pub(crate) fn map_write_error(schema: &EntitySchema, err: rusqlite::Error) -> RepoError {
    let rusqlite::Error::SqliteFailure(failure, message) = &err else {
        return err.into();
    };
    if failure.code != ErrorCode::ConstraintViolation {
        return err.into();
    }

    let detail = message.clone().unwrap_or_else(|| failure.to_string());
    let violation = match failure.extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
            ConstraintViolation::Duplicate {
                entity: schema.entity,
                field: failed_column(&detail),
            }
        }
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ConstraintViolation::MissingReference {
            entity: schema.entity,
            detail,
        },
        _ => ConstraintViolation::Other(detail),
    };
    RepoError::Constraint(violation)
}

// SQLite reports "UNIQUE constraint failed: countries.country_flag".
fn failed_column(detail: &str) -> String {
    detail
        .rsplit(": ")
        .next()
        .and_then(|columns| columns.split(", ").next())
        .and_then(|qualified| qualified.rsplit('.').next())
        .unwrap_or(detail)
        .to_string()
}

fn ensure_connection_ready(conn: &Connection, schema: &EntitySchema) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, schema.table)? {
        return Err(RepoError::MissingRequiredTable(schema.table));
    }

    let columns = table_columns(conn, schema.table)?;
    let unique = unique_columns(conn, schema.table)?;
    let foreign_keys = foreign_keys(conn, schema.table)?;
    for spec in schema.columns {
        let Some(column) = columns.iter().find(|column| column.name == spec.name) else {
            return Err(RepoError::MissingRequiredColumn {
                table: schema.table,
                column: spec.name,
            });
        };
        check_column(schema.table, spec, column, &unique, foreign_keys.get(spec.name))?;
    }

    Ok(())
}

struct StoredColumn {
    name: String,
    declared_type: String,
    not_null: bool,
    primary_key: bool,
}

struct StoredForeignKey {
    table: String,
    column: Option<String>,
    on_delete: String,
}

fn check_column(
    table: &'static str,
    spec: &ColumnSpec,
    column: &StoredColumn,
    unique: &HashSet<String>,
    foreign_key: Option<&StoredForeignKey>,
) -> RepoResult<()> {
    let mismatch = |detail: String| RepoError::SchemaMismatch {
        table,
        column: spec.name,
        detail,
    };

    let expected_type = spec.column_type.sql_name();
    if !column.declared_type.eq_ignore_ascii_case(expected_type) {
        return Err(mismatch(format!(
            "declared type `{}`, expected `{expected_type}`",
            column.declared_type
        )));
    }

    if spec.role == ColumnRole::Id {
        if !column.primary_key {
            return Err(mismatch("expected PRIMARY KEY".to_string()));
        }
    } else {
        if column.not_null == spec.nullable {
            return Err(mismatch(format!(
                "NOT NULL is {}, expected {}",
                column.not_null, !spec.nullable
            )));
        }
        let stored_unique = unique.contains(spec.name);
        if stored_unique != spec.unique {
            return Err(mismatch(format!(
                "UNIQUE is {stored_unique}, expected {}",
                spec.unique
            )));
        }
    }

    match (spec.references, foreign_key) {
        (None, None) => Ok(()),
        (Some(expected), Some(stored))
            if stored.table == expected.table
                && stored
                    .column
                    .as_deref()
                    .map_or(true, |column| column == expected.column)
                && stored
                    .on_delete
                    .eq_ignore_ascii_case(expected.on_delete.sql_action()) =>
        {
            Ok(())
        }
        (Some(expected), stored) => Err(mismatch(format!(
            "expected REFERENCES {}({}) ON DELETE {}, found {}",
            expected.table,
            expected.column,
            expected.on_delete.sql_action(),
            describe_foreign_key(stored)
        ))),
        (None, Some(stored)) => Err(mismatch(format!(
            "unexpected {}",
            describe_foreign_key(Some(stored))
        ))),
    }
}

fn describe_foreign_key(foreign_key: Option<&StoredForeignKey>) -> String {
    match foreign_key {
        Some(foreign_key) => format!(
            "REFERENCES {}({}) ON DELETE {}",
            foreign_key.table,
            foreign_key.column.as_deref().unwrap_or("<primary key>"),
            foreign_key.on_delete
        ),
        None => "no foreign key".to_string(),
    }
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> RepoResult<Vec<StoredColumn>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(StoredColumn {
            name: row.get("name")?,
            declared_type: row.get("type")?,
            not_null: row.get::<_, i64>("notnull")? != 0,
            primary_key: row.get::<_, i64>("pk")? != 0,
        });
    }
    Ok(columns)
}

/// Columns covered on their own by a UNIQUE index or constraint.
fn unique_columns(conn: &Connection, table: &str) -> RepoResult<HashSet<String>> {
    let mut unique_indexes = Vec::new();
    {
        let mut stmt = conn.prepare(&format!("PRAGMA index_list({table});"))?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            if row.get::<_, i64>("unique")? != 0 {
                unique_indexes.push(row.get::<_, String>("name")?);
            }
        }
    }

    let mut columns = HashSet::new();
    for index in unique_indexes {
        let mut stmt = conn.prepare(&format!("PRAGMA index_info(\"{index}\");"))?;
        let indexed = stmt
            .query_map([], |row| row.get::<_, Option<String>>("name"))?
            .collect::<Result<Vec<_>, _>>()?;
        if let [Some(column)] = indexed.as_slice() {
            columns.insert(column.clone());
        }
    }
    Ok(columns)
}

fn foreign_keys(conn: &Connection, table: &str) -> RepoResult<HashMap<String, StoredForeignKey>> {
    let mut stmt = conn.prepare(&format!("PRAGMA foreign_key_list({table});"))?;
    let mut rows = stmt.query([])?;
    let mut foreign_keys = HashMap::new();
    while let Some(row) = rows.next()? {
        foreign_keys.insert(
            row.get::<_, String>("from")?,
            StoredForeignKey {
                table: row.get("table")?,
                column: row.get("to")?,
                on_delete: row.get("on_delete")?,
            },
        );
    }
    Ok(foreign_keys)
}
