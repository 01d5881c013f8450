//! Continent/country aggregate consistency rules.
//!
//! # Responsibility
//! - Keep `Continent::countries` and `Country::continent_id` in agreement
//!   while callers mutate in-memory values.
//! - Decide whether a continent may be removed and how.
//!
//! # Invariants
//! - After `attach(a, c)`: `a.has_country(c.flag)` and `c.continent_id == a.id`.
//! - After `detach(a, c)`: `a` no longer lists `c` and `c.continent_id` is
//!   `None`. The country is then invalid until it is re-attached or deleted.
//! - `attach` refuses a country that references another continent, so a
//!   country is never listed by two continents; moves go through `transfer`.
//! - Every function either applies all of its changes or none of them.
//!
//! Storage stays authoritative: `countries` is re-derived from
//! `continent_id` references whenever a continent is loaded.

use crate::model::continent::{Continent, ContinentId};
use crate::model::country::Country;
use crate::model::validation::{ConstraintViolation, ValidationError};

/// What happens to a continent's countries when the continent is removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Refuse to remove a continent that still has countries.
    #[default]
    Restrict,
    /// Remove the countries first, then the continent.
    Cascade,
}

/// Outcome of `check_removal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPlan {
    /// No countries reference the continent.
    Direct,
    /// This many countries must be removed before the continent.
    CascadeCountries(u64),
}

/// Attaches `country` to `continent`.
///
/// Attaching to the continent the country already references is a no-op
/// beyond refreshing the membership entry.
///
/// # Errors
/// - `ValidationError::UnsavedContinent` when `continent` has no identifier.
/// - `ValidationError::AttachedElsewhere` when the country references a
///   different continent; moves go through `transfer` so the old
///   continent's membership is dropped in the same step.
pub fn attach(continent: &mut Continent, country: &mut Country) -> Result<(), ValidationError> {
    let continent_id = continent.id.ok_or(ValidationError::UnsavedContinent)?;
    if let Some(current) = country.continent_id.filter(|current| *current != continent_id) {
        return Err(ValidationError::AttachedElsewhere(current));
    }

    continent.countries.insert(country.flag_key());
    country.continent_id = Some(continent_id);
    Ok(())
}

/// Detaches `country` from `continent`.
///
/// Returns `true` when the country's reference was cleared. A country that
/// references a different continent keeps its reference; only the stale
/// entry in `continent` is dropped.
pub fn detach(continent: &mut Continent, country: &mut Country) -> bool {
    continent.countries.remove(&country.flag_key());
    if continent.id.is_some() && country.continent_id == continent.id {
        country.continent_id = None;
        return true;
    }
    false
}

/// Moves `country` from `from` to `to`, updating both continents.
///
/// # Errors
/// - `ValidationError::UnsavedContinent` when `to` has no identifier.
/// - `ValidationError::NotAttachedTo` when `country` does not reference
///   `from`.
///
/// No value is modified when an error is returned.
pub fn transfer(
    from: &mut Continent,
    to: &mut Continent,
    country: &mut Country,
) -> Result<(), ValidationError> {
    if to.id.is_none() {
        return Err(ValidationError::UnsavedContinent);
    }
    if from.id.is_none() || country.continent_id != from.id {
        return Err(ValidationError::NotAttachedTo(from.id));
    }

    from.countries.remove(&country.flag_key());
    country.continent_id = None;
    attach(to, country)
}

/// Decides how a continent with `attached` stored countries may be removed.
///
/// # Errors
/// - `ConstraintViolation::ContinentHasCountries` for `Restrict` when
///   `attached > 0`.
pub fn check_removal(
    continent_id: ContinentId,
    attached: u64,
    policy: DeletePolicy,
) -> Result<RemovalPlan, ConstraintViolation> {
    match (attached, policy) {
        (0, _) => Ok(RemovalPlan::Direct),
        (count, DeletePolicy::Cascade) => Ok(RemovalPlan::CascadeCountries(count)),
        (count, DeletePolicy::Restrict) => Err(ConstraintViolation::ContinentHasCountries {
            continent_id,
            countries: count,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{attach, check_removal, detach, transfer, DeletePolicy, RemovalPlan};
    use crate::model::continent::{Continent, ContinentId};
    use crate::model::country::Country;
    use crate::model::entity::Entity;
    use crate::model::validation::{ConstraintViolation, ValidationError};

    fn saved_continent(id: i64, name: &str) -> Continent {
        let mut continent = Continent::new(name);
        continent.id = Some(ContinentId(id));
        continent
    }

    #[test]
    fn attach_sets_both_sides() {
        let mut europe = saved_continent(1, "Europe");
        let mut france = Country::new("France", "fr");

        attach(&mut europe, &mut france).unwrap();

        assert!(europe.has_country("FR"));
        assert_eq!(france.continent_id, Some(ContinentId(1)));
        assert!(france.validate().is_ok());
    }

    #[test]
    fn attach_requires_saved_continent() {
        let mut draft = Continent::new("Atlantis");
        let mut country = Country::new("Lost", "LS");

        let err = attach(&mut draft, &mut country).unwrap_err();

        assert_eq!(err, ValidationError::UnsavedContinent);
        assert!(draft.countries().is_empty());
        assert_eq!(country.continent_id, None);
    }

    #[test]
    fn attach_to_second_continent_is_rejected() {
        let mut europe = saved_continent(1, "Europe");
        let mut asia = saved_continent(2, "Asia");
        let mut turkey = Country::new("Turkey", "TR");
        attach(&mut europe, &mut turkey).unwrap();

        let err = attach(&mut asia, &mut turkey).unwrap_err();

        assert_eq!(err, ValidationError::AttachedElsewhere(ContinentId(1)));
        assert_eq!(turkey.continent_id, Some(ContinentId(1)));
        assert!(europe.has_country("TR"));
        assert!(!asia.has_country("TR"));
    }

    #[test]
    fn attach_twice_to_same_continent_is_a_no_op() {
        let mut europe = saved_continent(1, "Europe");
        let mut france = Country::new("France", "FR");
        attach(&mut europe, &mut france).unwrap();

        attach(&mut europe, &mut france).unwrap();
        assert_eq!(europe.countries().len(), 1);
    }

    #[test]
    fn detach_clears_both_sides() {
        let mut europe = saved_continent(1, "Europe");
        let mut france = Country::new("France", "FR");
        attach(&mut europe, &mut france).unwrap();

        assert!(detach(&mut europe, &mut france));
        assert!(!europe.has_country("FR"));
        assert_eq!(france.continent_id, None);
        assert_eq!(
            france.validate().unwrap_err(),
            ValidationError::MissingContinent
        );
    }

    #[test]
    fn detach_from_other_continent_keeps_reference() {
        let mut europe = saved_continent(1, "Europe");
        let mut asia = saved_continent(2, "Asia");
        let mut japan = Country::new("Japan", "JP");
        attach(&mut asia, &mut japan).unwrap();

        assert!(!detach(&mut europe, &mut japan));
        assert_eq!(japan.continent_id, Some(ContinentId(2)));
    }

    #[test]
    fn transfer_moves_membership() {
        let mut europe = saved_continent(1, "Europe");
        let mut asia = saved_continent(2, "Asia");
        let mut turkey = Country::new("Turkey", "TR");
        attach(&mut europe, &mut turkey).unwrap();

        transfer(&mut europe, &mut asia, &mut turkey).unwrap();

        assert!(!europe.has_country("TR"));
        assert!(asia.has_country("TR"));
        assert_eq!(turkey.continent_id, Some(ContinentId(2)));
    }

    #[test]
    fn transfer_from_continent_not_owning_country_changes_nothing() {
        let mut europe = saved_continent(1, "Europe");
        let mut asia = saved_continent(2, "Asia");
        let mut africa = saved_continent(3, "Africa");
        let mut egypt = Country::new("Egypt", "EG");
        attach(&mut africa, &mut egypt).unwrap();
        europe.countries.insert("EG".to_string());

        let err = transfer(&mut europe, &mut asia, &mut egypt).unwrap_err();

        assert_eq!(err, ValidationError::NotAttachedTo(Some(ContinentId(1))));
        assert!(europe.has_country("EG"));
        assert!(!asia.has_country("EG"));
        assert_eq!(egypt.continent_id, Some(ContinentId(3)));

        let mut detached = Country::new("Nowhere", "NW");
        let err = transfer(&mut europe, &mut asia, &mut detached).unwrap_err();
        assert_eq!(err, ValidationError::NotAttachedTo(Some(ContinentId(1))));
    }

    #[test]
    fn transfer_to_unsaved_continent_changes_nothing() {
        let mut europe = saved_continent(1, "Europe");
        let mut draft = Continent::new("Draft");
        let mut turkey = Country::new("Turkey", "TR");
        attach(&mut europe, &mut turkey).unwrap();

        let err = transfer(&mut europe, &mut draft, &mut turkey).unwrap_err();

        assert_eq!(err, ValidationError::UnsavedContinent);
        assert!(europe.has_country("TR"));
        assert_eq!(turkey.continent_id, Some(ContinentId(1)));
    }

    #[test]
    fn removal_rules_follow_policy() {
        let id = ContinentId(7);
        assert_eq!(
            check_removal(id, 0, DeletePolicy::Restrict),
            Ok(RemovalPlan::Direct)
        );
        assert_eq!(
            check_removal(id, 3, DeletePolicy::Cascade),
            Ok(RemovalPlan::CascadeCountries(3))
        );
        assert_eq!(
            check_removal(id, 3, DeletePolicy::Restrict),
            Err(ConstraintViolation::ContinentHasCountries {
                continent_id: id,
                countries: 3
            })
        );
    }
}
