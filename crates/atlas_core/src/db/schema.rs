//! Explicit table descriptions consumed by the SQLite storage adapter.
//!
//! # Responsibility
//! - Describe each persisted entity: table, columns, nullability,
//!   uniqueness, updatability and foreign-key rules.
//! - Derive the SQL statements the generic repository runs.
//!
//! # Invariants
//! - Every schema has exactly one `Id` column and one `Version` column.
//! - Descriptions must agree with the migration scripts; repository
//!   construction verifies the connected database against them.

/// SQLite storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
}

impl ColumnType {
    /// Declared type as written in `CREATE TABLE`.
    pub fn sql_name(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
        }
    }
}

/// What a column means to the generic repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    /// Storage-assigned surrogate key.
    Id,
    /// Optimistic concurrency token.
    Version,
    /// Entity data written on create and, if updatable, on edit.
    Data,
}

/// Referential action when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Restrict,
    Cascade,
}

impl OnDelete {
    /// Action name as reported by `PRAGMA foreign_key_list`.
    pub fn sql_action(self) -> &'static str {
        match self {
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
    pub on_delete: OnDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub role: ColumnRole,
    pub nullable: bool,
    pub unique: bool,
    pub updatable: bool,
    pub references: Option<ForeignKey>,
}

impl ColumnSpec {
    pub const fn id(name: &'static str) -> Self {
        Self {
            name,
            column_type: ColumnType::Integer,
            role: ColumnRole::Id,
            nullable: false,
            unique: true,
            updatable: false,
            references: None,
        }
    }

    pub const fn version(name: &'static str) -> Self {
        Self {
            name,
            column_type: ColumnType::Integer,
            role: ColumnRole::Version,
            nullable: false,
            unique: false,
            updatable: true,
            references: None,
        }
    }

    pub const fn data(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            role: ColumnRole::Data,
            nullable: false,
            unique: false,
            updatable: true,
            references: None,
        }
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Written on create only; edits leave the stored value untouched.
    pub const fn immutable(mut self) -> Self {
        self.updatable = false;
        self
    }

    pub const fn references(mut self, foreign_key: ForeignKey) -> Self {
        self.references = Some(foreign_key);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySchema {
    pub table: &'static str,
    /// Entity name as used in errors.
    pub entity: &'static str,
    /// Unique column usable as a lookup key besides the identifier.
    pub natural_key: &'static str,
    pub columns: &'static [ColumnSpec],
}

impl EntitySchema {
    pub fn id_column(&self) -> &'static str {
        self.column_with_role(ColumnRole::Id)
    }

    pub fn version_column(&self) -> &'static str {
        self.column_with_role(ColumnRole::Version)
    }

    /// Data columns in declaration order; these are bound on insert.
    pub fn data_columns(&self) -> impl Iterator<Item = &'static ColumnSpec> {
        self.columns
            .iter()
            .filter(|column| column.role == ColumnRole::Data)
    }

    /// Data columns bound on edit, in declaration order.
    pub fn updatable_columns(&self) -> impl Iterator<Item = &'static ColumnSpec> {
        self.data_columns().filter(|column| column.updatable)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> {
        self.columns.iter().map(|column| column.name)
    }

    pub fn select_sql(&self) -> String {
        let columns = self.column_names().collect::<Vec<_>>().join(", ");
        format!("SELECT {columns} FROM {}", self.table)
    }

    /// Insert with version fixed at 0; placeholders follow `data_columns`.
    pub fn insert_sql(&self) -> String {
        let names = self.data_columns().map(|column| column.name);
        let mut columns = names.collect::<Vec<_>>();
        let placeholders = (1..=columns.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>();
        columns.push(self.version_column());
        format!(
            "INSERT INTO {} ({}) VALUES ({}, 0);",
            self.table,
            columns.join(", "),
            placeholders.join(", ")
        )
    }

    /// Compare-and-swap update.
    ///
    /// Placeholders: `updatable_columns` in order, then id, then the
    /// expected version.
    pub fn update_sql(&self) -> String {
        let version = self.version_column();
        let mut assignments = self
            .updatable_columns()
            .enumerate()
            .map(|(index, column)| format!("{} = ?{}", column.name, index + 1))
            .collect::<Vec<_>>();
        let bound = assignments.len();
        assignments.push(format!("{version} = {version} + 1"));
        format!(
            "UPDATE {} SET {} WHERE {} = ?{} AND {version} = ?{};",
            self.table,
            assignments.join(", "),
            self.id_column(),
            bound + 1,
            bound + 2
        )
    }

    pub fn delete_sql(&self) -> String {
        format!("DELETE FROM {} WHERE {} = ?1;", self.table, self.id_column())
    }

    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM {};", self.table)
    }

    /// Columns of `self` that reference `target`'s table.
    pub fn references_to<'a>(
        &'a self,
        target: &'a EntitySchema,
    ) -> impl Iterator<Item = &'static ColumnSpec> + 'a {
        self.columns.iter().filter(move |column| {
            column
                .references
                .is_some_and(|foreign_key| foreign_key.table == target.table)
        })
    }

    fn column_with_role(&self, role: ColumnRole) -> &'static str {
        self.columns
            .iter()
            .find(|column| column.role == role)
            .map_or("", |column| column.name)
    }
}

pub const CONTINENT_SCHEMA: EntitySchema = EntitySchema {
    table: "continents",
    entity: "continent",
    natural_key: "continent_name",
    columns: &[
        ColumnSpec::id("id"),
        ColumnSpec::data("continent_name", ColumnType::Text)
            .unique()
            .immutable(),
        ColumnSpec::version("version"),
    ],
};

pub const COUNTRY_SCHEMA: EntitySchema = EntitySchema {
    table: "countries",
    entity: "country",
    natural_key: "country_flag",
    columns: &[
        ColumnSpec::id("id"),
        ColumnSpec::data("country_name", ColumnType::Text)
            .unique()
            .immutable(),
        ColumnSpec::data("country_flag", ColumnType::Text).unique(),
        ColumnSpec::data("continent_id", ColumnType::Integer).references(ForeignKey {
            table: "continents",
            column: "id",
            on_delete: OnDelete::Restrict,
        }),
        ColumnSpec::version("version"),
    ],
};

/// All entity tables in dependency order, referenced tables first.
pub const ALL_SCHEMAS: &[&EntitySchema] = &[&CONTINENT_SCHEMA, &COUNTRY_SCHEMA];
