use atlas_core::db::open_db_in_memory;
use atlas_core::{
    attach, fetch_page, ConstraintViolation, Continent, ContinentId, Country, PageRequest,
    RepoError, Repository, SqliteContinentRepository, SqliteCountryRepository, ValidationError,
};
use rusqlite::Connection;
use std::collections::HashSet;

fn saved_continent(conn: &Connection, name: &str) -> Continent {
    SqliteContinentRepository::try_new(conn)
        .unwrap()
        .create(&Continent::new(name))
        .unwrap()
}

fn country_in(continent: &Continent, name: &str, flag: &str) -> Country {
    let mut continent = continent.clone();
    let mut country = Country::new(name, flag);
    attach(&mut continent, &mut country).unwrap();
    country
}

#[test]
fn create_assigns_id_and_initial_version() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContinentRepository::try_new(&conn).unwrap();

    let created = repo.create(&Continent::new("Europe")).unwrap();
    let loaded = repo.find(created.id.unwrap()).unwrap().unwrap();

    assert!(created.id.is_some());
    assert_eq!(created.version, 0);
    assert_eq!(loaded, created);
    assert_eq!(loaded.continent_name, "Europe");
    assert!(loaded.countries().is_empty());
}

#[test]
fn create_and_find_country_keeps_all_fields() {
    let conn = open_db_in_memory().unwrap();
    let europe = saved_continent(&conn, "Europe");
    let repo = SqliteCountryRepository::try_new(&conn).unwrap();

    let draft = country_in(&europe, "France", "FR");
    let created = repo.create(&draft).unwrap();
    let loaded = repo.find(created.id.unwrap()).unwrap().unwrap();

    assert_eq!(loaded.id, created.id);
    assert_eq!(loaded.version, 0);
    assert_eq!(loaded.country_name, draft.country_name);
    assert_eq!(loaded.country_flag, draft.country_flag);
    assert_eq!(loaded.continent_id, europe.id);
}

#[test]
fn create_rejects_entity_with_identifier_or_version() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContinentRepository::try_new(&conn).unwrap();

    let mut with_id = Continent::new("Asia");
    with_id.id = Some(ContinentId(42));
    assert!(matches!(
        repo.create(&with_id).unwrap_err(),
        RepoError::Validation(ValidationError::AssignedId(42))
    ));

    let mut with_version = Continent::new("Asia");
    with_version.version = 3;
    assert!(matches!(
        repo.create(&with_version).unwrap_err(),
        RepoError::Validation(ValidationError::InvalidVersion(3))
    ));
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn country_flag_must_be_two_letters() {
    let conn = open_db_in_memory().unwrap();
    let america = saved_continent(&conn, "North America");
    let repo = SqliteCountryRepository::try_new(&conn).unwrap();

    repo.create(&country_in(&america, "United States", "US"))
        .unwrap();

    for (name, flag) in [("United States of America", "USA"), ("Unknown", "U1")] {
        let err = repo.create(&country_in(&america, name, flag)).unwrap_err();
        assert!(
            matches!(
                err,
                RepoError::Validation(ValidationError::InvalidCountryFlag(_))
            ),
            "flag {flag} should be rejected, got {err}"
        );
    }
    assert_eq!(repo.count().unwrap(), 1);
}

#[test]
fn country_without_continent_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCountryRepository::try_new(&conn).unwrap();

    let err = repo.create(&Country::new("Nowhere", "NW")).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::MissingContinent)
    ));
}

#[test]
fn country_referencing_missing_continent_violates_constraint() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCountryRepository::try_new(&conn).unwrap();

    let mut orphan = Country::new("Atlantis", "AT");
    orphan.continent_id = Some(ContinentId(999));

    let err = repo.create(&orphan).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Constraint(ConstraintViolation::MissingReference {
            entity: "country",
            ..
        })
    ));
}

#[test]
fn duplicate_continent_name_violates_constraint() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContinentRepository::try_new(&conn).unwrap();

    repo.create(&Continent::new("Europe")).unwrap();
    let err = repo.create(&Continent::new("Europe")).unwrap_err();

    match err {
        RepoError::Constraint(ConstraintViolation::Duplicate { entity, field }) => {
            assert_eq!(entity, "continent");
            assert_eq!(field, "continent_name");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(repo.count().unwrap(), 1);
}

#[test]
fn duplicate_country_name_or_flag_violates_constraint() {
    let conn = open_db_in_memory().unwrap();
    let europe = saved_continent(&conn, "Europe");
    let repo = SqliteCountryRepository::try_new(&conn).unwrap();
    repo.create(&country_in(&europe, "France", "FR")).unwrap();

    let same_name = repo
        .create(&country_in(&europe, "France", "FX"))
        .unwrap_err();
    assert!(matches!(
        same_name,
        RepoError::Constraint(ConstraintViolation::Duplicate { ref field, .. }) if field == "country_name"
    ));

    let same_flag_other_case = repo
        .create(&country_in(&europe, "French Republic", "fr"))
        .unwrap_err();
    assert!(matches!(
        same_flag_other_case,
        RepoError::Constraint(ConstraintViolation::Duplicate { ref field, .. }) if field == "country_flag"
    ));
}

#[test]
fn edit_with_current_version_increments_version() {
    let conn = open_db_in_memory().unwrap();
    let europe = saved_continent(&conn, "Europe");
    let repo = SqliteCountryRepository::try_new(&conn).unwrap();
    let mut country = repo.create(&country_in(&europe, "Germany", "DE")).unwrap();

    country.country_flag = "GE".to_string();
    let edited = repo.edit(&country).unwrap();
    assert_eq!(edited.version, 1);
    assert_eq!(edited.country_flag, "GE");

    let edited_again = repo.edit(&edited).unwrap();
    assert_eq!(edited_again.version, 2);
    assert_eq!(
        repo.find(country.id.unwrap()).unwrap().unwrap().version,
        2
    );
}

#[test]
fn edit_with_stale_version_conflicts_and_changes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let europe = saved_continent(&conn, "Europe");
    let repo = SqliteCountryRepository::try_new(&conn).unwrap();
    let created = repo.create(&country_in(&europe, "Italy", "IT")).unwrap();

    let first_writer = repo.edit(&created).unwrap();
    assert_eq!(first_writer.version, 1);

    let mut second_writer = created.clone();
    second_writer.country_flag = "IX".to_string();
    let err = repo.edit(&second_writer).unwrap_err();

    assert!(err.is_conflict());
    assert!(matches!(
        err,
        RepoError::Conflict {
            entity: "country",
            expected: 0,
            actual: 1,
            ..
        }
    ));
    let stored = repo.find(created.id.unwrap()).unwrap().unwrap();
    assert_eq!(stored.country_flag, "IT");
    assert_eq!(stored.version, 1);
}

#[test]
fn edit_does_not_persist_immutable_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContinentRepository::try_new(&conn).unwrap();
    let mut continent = repo.create(&Continent::new("Oceania")).unwrap();

    continent.continent_name = "Australia".to_string();
    let edited = repo.edit(&continent).unwrap();

    assert_eq!(edited.continent_name, "Oceania");
    assert_eq!(edited.version, 1);
}

#[test]
fn edit_missing_entity_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContinentRepository::try_new(&conn).unwrap();
    let mut ghost = Continent::new("Ghost");
    ghost.id = Some(ContinentId(77));

    let err = repo.edit(&ghost).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: "continent",
            id: 77
        }
    ));

    let err = repo.edit(&Continent::new("No id")).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::MissingId)
    ));
}

#[test]
fn remove_is_permanent_and_second_remove_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let europe = saved_continent(&conn, "Europe");
    let repo = SqliteCountryRepository::try_new(&conn).unwrap();
    let spain = repo.create(&country_in(&europe, "Spain", "ES")).unwrap();

    repo.remove(&spain).unwrap();
    assert!(repo.find(spain.id.unwrap()).unwrap().is_none());

    let err = repo.remove(&spain).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "country", .. }));
}

#[test]
fn find_missing_id_is_absent() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContinentRepository::try_new(&conn).unwrap();
    assert!(repo.find(ContinentId(1)).unwrap().is_none());
}

#[test]
fn stored_row_breaking_flag_rule_loads_as_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    let europe = saved_continent(&conn, "Europe");
    conn.execute(
        "INSERT INTO countries (country_name, country_flag, continent_id) VALUES ('Bad', 'X1', ?1);",
        [europe.id.unwrap().0],
    )
    .unwrap();
    let repo = SqliteCountryRepository::try_new(&conn).unwrap();

    let err = repo.find_by_flag("X1").unwrap_err();
    match err {
        RepoError::InvalidData(message) => assert!(message.contains("X1"), "{message}"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(
        repo.find_range(0, 10),
        Err(RepoError::InvalidData(_))
    ));
}

#[test]
fn find_by_natural_keys() {
    let conn = open_db_in_memory().unwrap();
    let europe = saved_continent(&conn, "Europe");
    let continents = SqliteContinentRepository::try_new(&conn).unwrap();
    let countries = SqliteCountryRepository::try_new(&conn).unwrap();
    let portugal = countries
        .create(&country_in(&europe, "Portugal", "PT"))
        .unwrap();

    assert_eq!(
        continents.find_by_name("Europe").unwrap(),
        continents.find(europe.id.unwrap()).unwrap()
    );
    assert!(continents.find_by_name("Antarctica").unwrap().is_none());
    assert_eq!(
        countries.find_by_flag("pt").unwrap().and_then(|country| country.id),
        portugal.id
    );
}

#[test]
fn find_range_pages_partition_all_rows_in_id_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContinentRepository::try_new(&conn).unwrap();
    let names = [
        "Africa",
        "Antarctica",
        "Asia",
        "Europe",
        "North America",
        "Oceania",
        "South America",
    ];
    let created_ids = names
        .iter()
        .map(|name| repo.create(&Continent::new(*name)).unwrap().id.unwrap())
        .collect::<Vec<_>>();

    let page_size = 3;
    let mut seen = Vec::new();
    let mut offset = 0;
    loop {
        let page = repo.find_range(offset, page_size).unwrap();
        assert!(page.len() as i64 <= page_size);
        if page.is_empty() {
            break;
        }
        seen.extend(page.into_iter().map(|continent| continent.id.unwrap()));
        offset += page_size;
    }

    assert_eq!(seen, created_ids);
    assert_eq!(seen.iter().collect::<HashSet<_>>().len(), seen.len());
    assert_eq!(repo.count().unwrap(), seen.len() as u64);
}

#[test]
fn find_range_boundaries() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContinentRepository::try_new(&conn).unwrap();
    for name in ["Africa", "Asia", "Europe"] {
        repo.create(&Continent::new(name)).unwrap();
    }

    assert!(repo.find_range(0, 0).unwrap().is_empty());
    assert!(repo.find_range(0, -5).unwrap().is_empty());
    assert_eq!(repo.find_range(-10, 2).unwrap().len(), 2);
    assert!(repo.find_range(10, 2).unwrap().is_empty());
    assert_eq!(repo.find_range(2, 10).unwrap().len(), 1);
}

#[test]
fn fetch_page_reports_total_and_contents() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContinentRepository::try_new(&conn).unwrap();
    for name in ["Africa", "Asia", "Europe", "Oceania", "Antarctica"] {
        repo.create(&Continent::new(name)).unwrap();
    }

    let second = fetch_page(&repo, PageRequest::new(1, 2)).unwrap();
    assert_eq!(second.total_count, 5);
    assert_eq!(second.total_pages(), 3);
    assert_eq!(
        second
            .items
            .iter()
            .map(|continent| continent.continent_name.as_str())
            .collect::<Vec<_>>(),
        vec!["Europe", "Oceania"]
    );
    assert_eq!(second.next_request(), Some(PageRequest::new(2, 2)));

    let empty = fetch_page(&repo, PageRequest::new(0, 0)).unwrap();
    assert!(empty.items.is_empty());
    assert_eq!(empty.total_count, 5);
}
