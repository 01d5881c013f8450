//! Continent domain model.
//!
//! # Responsibility
//! - Define the continent record and its derived country membership.
//!
//! # Invariants
//! - `continent_name` is unique and never changes after creation.
//! - `countries` mirrors the `continent_id` references held by countries; it
//!   is hydrated from storage and only mutated through `model::aggregate`.

use crate::model::entity::{entity_id, Entity};
use crate::model::validation::{require_text, require_version, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

entity_id!(
    /// Storage-assigned continent identifier.
    ContinentId
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Continent {
    pub id: Option<ContinentId>,
    pub continent_name: String,
    /// Uppercased flags of the countries referencing this continent.
    #[serde(default)]
    pub(crate) countries: BTreeSet<String>,
    #[serde(default)]
    pub version: i64,
}

impl Continent {
    /// Creates an unsaved continent with no countries and version 0.
    pub fn new(continent_name: impl Into<String>) -> Self {
        Self {
            id: None,
            continent_name: continent_name.into(),
            countries: BTreeSet::new(),
            version: 0,
        }
    }

    /// Flags of attached countries, uppercased and sorted.
    pub fn countries(&self) -> &BTreeSet<String> {
        &self.countries
    }

    /// Returns whether a country with this flag is attached.
    pub fn has_country(&self, flag: &str) -> bool {
        self.countries.contains(&flag.to_ascii_uppercase())
    }
}

impl Entity for Continent {
    type Id = ContinentId;
    const NAME: &'static str = "continent";

    fn id(&self) -> Option<ContinentId> {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("continent_name", &self.continent_name)?;
        require_version(self.version)
    }
}
