//! Country domain model.
//!
//! # Responsibility
//! - Define the country record and its flag validation rule.
//!
//! # Invariants
//! - `country_flag` is exactly two ASCII letters; case is not significant.
//! - Two countries are equal iff their flags match, ignoring case.
//! - `continent_id` must be set before the country can be persisted.

use crate::model::continent::ContinentId;
use crate::model::entity::{entity_id, Entity};
use crate::model::validation::{require_text, require_version, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

static COUNTRY_FLAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{2}$").expect("valid country flag regex"));

entity_id!(
    /// Storage-assigned country identifier.
    CountryId
);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Country {
    pub id: Option<CountryId>,
    pub country_name: String,
    pub country_flag: String,
    /// Foreign key to the owning continent. `None` only between a detach and
    /// the following re-attach or delete.
    pub continent_id: Option<ContinentId>,
    #[serde(default)]
    pub version: i64,
}

impl Country {
    /// Creates an unsaved country that is not yet attached to any continent.
    ///
    /// Nothing is validated here; `Entity::validate` runs on every write.
    pub fn new(country_name: impl Into<String>, country_flag: impl Into<String>) -> Self {
        Self {
            id: None,
            country_name: country_name.into(),
            country_flag: country_flag.into(),
            continent_id: None,
            version: 0,
        }
    }

    /// Case-normalized flag used as the natural equality key.
    pub fn flag_key(&self) -> String {
        self.country_flag.to_ascii_uppercase()
    }

    pub fn is_attached(&self) -> bool {
        self.continent_id.is_some()
    }
}

impl PartialEq for Country {
    fn eq(&self, other: &Self) -> bool {
        self.country_flag.eq_ignore_ascii_case(&other.country_flag)
    }
}

impl Eq for Country {}

impl Hash for Country {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.flag_key().hash(state);
    }
}

impl Entity for Country {
    type Id = CountryId;
    const NAME: &'static str = "country";

    fn id(&self) -> Option<CountryId> {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("country_name", &self.country_name)?;
        validate_country_flag(&self.country_flag)?;
        if self.continent_id.is_none() {
            return Err(ValidationError::MissingContinent);
        }
        require_version(self.version)
    }
}

/// Checks the two-letter alphabetic flag rule.
pub fn validate_country_flag(flag: &str) -> Result<(), ValidationError> {
    if flag.is_empty() {
        return Err(ValidationError::EmptyField("country_flag"));
    }
    if !COUNTRY_FLAG_RE.is_match(flag) {
        return Err(ValidationError::InvalidCountryFlag(flag.to_string()));
    }
    Ok(())
}
