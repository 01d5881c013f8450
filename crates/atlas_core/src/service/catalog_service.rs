//! Catalog use-case service.
//!
//! # Responsibility
//! - Combine the continent and country repositories into use-case calls.
//! - Route every change of the continent/country edge through
//!   `model::aggregate` before persisting it.
//!
//! # Invariants
//! - Service calls never bypass repository validation or version checks.
//! - Callers own the unit of work; wrap multi-call flows in
//!   `db::unit_of_work` when they must be atomic together.

use crate::model::aggregate::{attach, transfer, DeletePolicy};
use crate::model::continent::{Continent, ContinentId};
use crate::model::country::{Country, CountryId};
use crate::pagination::{fetch_page, Page, PageRequest};
use crate::repo::continent_repo::SqliteContinentRepository;
use crate::repo::country_repo::SqliteCountryRepository;
use crate::repo::{RepoError, RepoResult, Repository};
use rusqlite::Connection;

pub struct CatalogService<'conn> {
    continents: SqliteContinentRepository<'conn>,
    countries: SqliteCountryRepository<'conn>,
}

impl<'conn> CatalogService<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        Ok(Self {
            continents: SqliteContinentRepository::try_new(conn)?,
            countries: SqliteCountryRepository::try_new(conn)?,
        })
    }

    pub fn continents(&self) -> &SqliteContinentRepository<'conn> {
        &self.continents
    }

    pub fn countries(&self) -> &SqliteCountryRepository<'conn> {
        &self.countries
    }

    pub fn create_continent(&self, continent_name: &str) -> RepoResult<Continent> {
        self.continents.create(&Continent::new(continent_name))
    }

    /// Creates a country attached to an existing continent.
    ///
    /// # Errors
    /// - `NotFound` when the continent does not exist.
    /// - `Validation` / `Constraint` from the country write.
    pub fn add_country(
        &self,
        continent_id: ContinentId,
        country_name: &str,
        country_flag: &str,
    ) -> RepoResult<Country> {
        let mut continent = self.require_continent(continent_id)?;
        let mut country = Country::new(country_name, country_flag);
        attach(&mut continent, &mut country)?;
        self.countries.create(&country)
    }

    /// Moves `country` to another continent.
    ///
    /// `country.version` must be the version the caller last observed;
    /// a stale one fails with `RepoError::Conflict`.
    pub fn move_country(&self, country: &Country, to: ContinentId) -> RepoResult<Country> {
        let mut moving = country.clone();
        let mut target = self.require_continent(to)?;
        let source = moving
            .continent_id
            .map(|id| self.continents.find(id))
            .transpose()?
            .flatten();

        match source {
            Some(mut source) => transfer(&mut source, &mut target, &mut moving)?,
            None => {
                // The referenced continent no longer exists; nothing lists it.
                moving.continent_id = None;
                attach(&mut target, &mut moving)?;
            }
        }
        self.countries.edit(&moving)
    }

    pub fn remove_country(&self, country_id: CountryId) -> RepoResult<()> {
        let country = self
            .countries
            .find(country_id)?
            .ok_or_else(|| RepoError::not_found::<Country>(country_id))?;
        self.countries.remove(&country)
    }

    /// Removes a continent; `policy` decides what happens to its countries.
    pub fn remove_continent(&self, continent_id: ContinentId, policy: DeletePolicy) -> RepoResult<()> {
        let continent = self.require_continent(continent_id)?;
        self.continents.remove_with(&continent, policy)
    }

    pub fn list_continents(&self, request: PageRequest) -> RepoResult<Page<Continent>> {
        fetch_page(&self.continents, request)
    }

    pub fn list_countries(&self, request: PageRequest) -> RepoResult<Page<Country>> {
        fetch_page(&self.countries, request)
    }

    fn require_continent(&self, continent_id: ContinentId) -> RepoResult<Continent> {
        self.continents
            .find(continent_id)?
            .ok_or_else(|| RepoError::not_found::<Continent>(continent_id))
    }
}
