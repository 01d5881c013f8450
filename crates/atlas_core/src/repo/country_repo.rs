//! Country storage mapping.
//!
//! # Invariants
//! - `country_flag` lookups are case-insensitive (`COLLATE NOCASE`).
//! - A stored country always references an existing continent; the foreign
//!   key rejects anything else as `ConstraintViolation::MissingReference`.
//! - Rows failing `Country::validate` load as `RepoError::InvalidData`.

use crate::db::schema::{EntitySchema, COUNTRY_SCHEMA};
use crate::model::continent::ContinentId;
use crate::model::country::{Country, CountryId};
use crate::model::entity::Entity;
use crate::repo::continent_repo::continent_reference_column;
use crate::repo::sqlite::{SqliteEntity, SqliteRepository};
use crate::repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::Row;

/// SQLite-backed country repository.
pub type SqliteCountryRepository<'conn> = SqliteRepository<'conn, Country>;

impl SqliteEntity for Country {
    const SCHEMA: &'static EntitySchema = &COUNTRY_SCHEMA;

    fn column_value(&self, column: &str) -> Value {
        match column {
            "country_name" => Value::Text(self.country_name.clone()),
            "country_flag" => Value::Text(self.country_flag.clone()),
            "continent_id" => self
                .continent_id
                .map_or(Value::Null, |id| Value::Integer(id.0)),
            _ => Value::Null,
        }
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let id = CountryId(row.get("id")?);
        let country = Country {
            id: Some(id),
            country_name: row.get("country_name")?,
            country_flag: row.get("country_flag")?,
            continent_id: row.get::<_, Option<i64>>("continent_id")?.map(ContinentId),
            version: row.get("version")?,
        };
        country.validate().map_err(|err| {
            RepoError::InvalidData(format!("stored country {id} is invalid: {err}"))
        })?;
        Ok(country)
    }
}

impl SqliteCountryRepository<'_> {
    /// Looks up a country by flag, ignoring case.
    pub fn find_by_flag(&self, country_flag: &str) -> RepoResult<Option<Country>> {
        self.find_by_natural_key(country_flag)
    }

    /// Countries referencing `continent_id`, ordered by identifier.
    pub fn countries_of(&self, continent_id: ContinentId) -> RepoResult<Vec<Country>> {
        let sql = format!(
            "{} WHERE {} = ?1 ORDER BY {} ASC;",
            COUNTRY_SCHEMA.select_sql(),
            continent_reference_column(),
            COUNTRY_SCHEMA.id_column()
        );
        self.query_entities(&sql, [continent_id.0])
    }
}
