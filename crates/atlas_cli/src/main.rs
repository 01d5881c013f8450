//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open the catalog store described by `ATLAS_*` environment variables.
//! - Print the core version and entity counts for quick sanity checks.

use atlas_core::db::open_db_with;
use atlas_core::{init_logging_from, CoreConfig, Repository};
use atlas_core::{SqliteContinentRepository, SqliteCountryRepository};
use log::info;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("atlas_cli error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = CoreConfig::from_env()?;
    init_logging_from(&config)?;

    let conn = open_db_with(&config)?;
    let continents = SqliteContinentRepository::try_new(&conn)?.count()?;
    let countries = SqliteCountryRepository::try_new(&conn)?.count()?;
    info!("event=cli_probe module=cli status=ok continents={continents} countries={countries}");

    println!("atlas_core version={}", atlas_core::core_version());
    println!("continents={continents} countries={countries}");
    Ok(())
}
