//! Core persistence logic for the continent/country catalog.
//! This crate is the single source of truth for catalog invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod pagination;
pub mod repo;
pub mod service;

pub use config::CoreConfig;
pub use db::{unit_of_work, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_logging_from, logging_status};
pub use model::aggregate::{attach, check_removal, detach, transfer, DeletePolicy, RemovalPlan};
pub use model::continent::{Continent, ContinentId};
pub use model::country::{validate_country_flag, Country, CountryId};
pub use model::entity::{Entity, EntityId};
pub use model::validation::{ConstraintViolation, ValidationError};
pub use pagination::{fetch_page, Page, PageRequest};
pub use repo::continent_repo::SqliteContinentRepository;
pub use repo::country_repo::SqliteCountryRepository;
pub use repo::sqlite::{SqliteEntity, SqliteRepository};
pub use repo::{RepoError, RepoResult, Repository};
pub use service::catalog_service::CatalogService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
