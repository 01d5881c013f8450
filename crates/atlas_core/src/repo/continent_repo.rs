//! Continent storage mapping.
//!
//! # Invariants
//! - `Continent::countries` is rebuilt from `countries.continent_id` on every
//!   load; it is never written directly.
//! - Removal consults `aggregate::check_removal`; with `Cascade` the
//!   countries are deleted before the continent row.

use crate::db::schema::{EntitySchema, CONTINENT_SCHEMA, COUNTRY_SCHEMA};
use crate::model::aggregate::{check_removal, DeletePolicy, RemovalPlan};
use crate::model::continent::{Continent, ContinentId};
use crate::repo::sqlite::{SqliteEntity, SqliteRepository};
use crate::repo::{RepoError, RepoResult};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{Connection, Row};
use std::collections::BTreeSet;

/// SQLite-backed continent repository.
pub type SqliteContinentRepository<'conn> = SqliteRepository<'conn, Continent>;

impl SqliteEntity for Continent {
    const SCHEMA: &'static EntitySchema = &CONTINENT_SCHEMA;

    fn column_value(&self, column: &str) -> Value {
        match column {
            "continent_name" => Value::Text(self.continent_name.clone()),
            _ => Value::Null,
        }
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let continent = Continent {
            id: Some(ContinentId(row.get("id")?)),
            continent_name: row.get("continent_name")?,
            countries: BTreeSet::new(),
            version: row.get("version")?,
        };
        Ok(continent)
    }

    fn hydrate(&mut self, conn: &Connection) -> RepoResult<()> {
        let Some(id) = self.id else {
            return Ok(());
        };
        let mut stmt = conn.prepare(&format!(
            "SELECT country_flag FROM {} WHERE {} = ?1;",
            COUNTRY_SCHEMA.table,
            continent_reference_column()
        ))?;
        let mut rows = stmt.query([id.0])?;
        let mut countries = BTreeSet::new();
        while let Some(row) = rows.next()? {
            let flag: String = row.get(0)?;
            countries.insert(flag.to_ascii_uppercase());
        }
        self.countries = countries;
        Ok(())
    }

    fn before_remove(&self, conn: &Connection, policy: DeletePolicy) -> RepoResult<()> {
        let Some(id) = self.id else {
            return Ok(());
        };
        let attached = count_attached_countries(conn, id)?;
        match check_removal(id, attached, policy)? {
            RemovalPlan::Direct => Ok(()),
            RemovalPlan::CascadeCountries(expected) => {
                let removed = conn.execute(
                    &format!(
                        "DELETE FROM {} WHERE {} = ?1;",
                        COUNTRY_SCHEMA.table,
                        continent_reference_column()
                    ),
                    [id.0],
                )?;
                debug!(
                    "event=continent_cascade module=repo status=ok continent_id={} countries={}",
                    id, removed
                );
                if removed as u64 != expected {
                    return Err(RepoError::InvalidData(format!(
                        "cascade for continent {id} removed {removed} countries, expected {expected}"
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Number of stored countries referencing `continent_id`.
pub fn count_attached_countries(conn: &Connection, continent_id: ContinentId) -> RepoResult<u64> {
    let count: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?1;",
            COUNTRY_SCHEMA.table,
            continent_reference_column()
        ),
        [continent_id.0],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}

pub(crate) fn continent_reference_column() -> &'static str {
    COUNTRY_SCHEMA
        .references_to(&CONTINENT_SCHEMA)
        .next()
        .map_or("continent_id", |column| column.name)
}

impl SqliteContinentRepository<'_> {
    /// Looks up a continent by its unique name.
    pub fn find_by_name(&self, continent_name: &str) -> RepoResult<Option<Continent>> {
        self.find_by_natural_key(continent_name)
    }
}
