//! Run drivers.
//!
//! Ties the pieces together for the two kinds of run. Control flow per unit:
//! enumerate → skip check → build request → dispatch → record → (loader only) write CSV.
//!
//! Dispatch is strictly sequential. Per-unit failures are recorded and the run moves on;
//! any `Err` returned here ends the run, leaving the accumulator holding everything
//! recorded so far so the caller can still print the summary.

use crate::accumulator::RunAccumulator;
use crate::completion::{output_path, should_skip};
use crate::config::{ConditionConfig, LoaderConfig};
use crate::constants::SEPARATOR;
use crate::dispatch::{DispatchEngine, Outcome, Transport};
use crate::plan::{condition_sweep, plan_units, Combination};
use crate::records::{list_record_files, load_record, record_name};
use crate::report::{workbook_file_name, write_condition_workbook, write_identifiers_csv};
use crate::{request, SweepError, SweepResult};
use chrono::{DateTime, TimeZone};
use fhir::ConditionCatalogue;
use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

/// Sends every record in the record directory across the configured location sweep.
///
/// Writes `<record>_r<radius>_z<zip>.csv` into the results directory for each unit the
/// service reported matches for.
///
/// # Errors
///
/// Returns an error for unreadable or malformed records, results directory creation
/// failures, CSV write failures and any fatal dispatch error.
pub fn run_loader<T: Transport>(
    config: &LoaderConfig,
    engine: &DispatchEngine<T>,
    acc: &mut RunAccumulator,
) -> SweepResult<()> {
    let files = list_record_files(config.record_dir())?;
    fs::create_dir_all(config.results_dir()).map_err(SweepError::ResultsDirCreation)?;

    let names: Vec<String> = files.iter().map(|path| record_name(path)).collect();
    let paths: HashMap<&str, &Path> = names
        .iter()
        .map(String::as_str)
        .zip(files.iter().map(PathBuf::as_path))
        .collect();
    let units = plan_units(&config.sweep().combinations(), &names);

    tracing::info!(
        "planned {} units ({} records) against {}",
        units.len(),
        names.len(),
        engine.url()
    );

    let mut loaded: HashMap<String, Value> = HashMap::new();
    for unit in units {
        acc.note_enumerated();
        println!("{SEPARATOR}");
        println!("Record ({}): {unit}", acc.enumerated());

        let Combination::Location(params) = &unit.combination else {
            return Err(SweepError::Config(format!(
                "loader runs only sweep locations, got {}",
                unit.combination
            )));
        };
        let path = output_path(config.results_dir(), &unit.record, params);

        if should_skip(&path, config.skip_existing()) {
            tracing::info!("Skipping file due to prior existence: {}", path.display());
            acc.note_skipped();
            continue;
        }

        let base = match loaded.entry(unit.record.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let file = paths.get(unit.record.as_str()).ok_or_else(|| {
                    SweepError::Config(format!("planned unit for unknown record {}", unit.record))
                })?;
                entry.insert(load_record(file)?.document)
            }
        };
        let document = request::build(base, &unit.combination)?;
        let outcome = engine.dispatch(&unit, &document)?;

        if let Outcome::Matches { results, .. } = &outcome {
            tracing::info!("Writing results to... {}", path.display());
            write_identifiers_csv(&path, &results.identifiers)?;
        }

        acc.record(&unit, outcome)?;
    }

    Ok(())
}

/// Sends one primary-condition request per catalogue code in the configured category and
/// writes the workbook. `now` stamps the workbook file name.
///
/// Returns the path of the written workbook.
///
/// # Errors
///
/// Returns an error for an unreadable or malformed catalogue, workbook write failures and
/// any fatal dispatch error.
pub fn run_condition_sweep<T, Tz>(
    config: &ConditionConfig,
    engine: &DispatchEngine<T>,
    acc: &mut RunAccumulator,
    now: &DateTime<Tz>,
) -> SweepResult<PathBuf>
where
    T: Transport,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let text = fs::read_to_string(config.catalogue_path()).map_err(|source| {
        SweepError::CatalogueRead {
            path: config.catalogue_path().to_path_buf(),
            source,
        }
    })?;
    let catalogue = ConditionCatalogue::parse(&text).map_err(SweepError::CatalogueParse)?;

    let combinations = condition_sweep(&catalogue, config.category());
    let units = plan_units(&combinations, &[config.service()]);
    tracing::info!(
        "{} of {} catalogue codes match '{}'",
        units.len(),
        catalogue.len(),
        config.category()
    );

    for unit in units {
        acc.note_enumerated();
        let document = request::build(&Value::Null, &unit.combination)?;
        let outcome = engine.dispatch(&unit, &document)?;
        acc.record(&unit, outcome)?;
    }

    let path = config
        .output_dir()
        .map(|dir| dir.to_path_buf())
        .unwrap_or_default()
        .join(workbook_file_name(config.service(), config.category(), now));
    write_condition_workbook(&path, acc)?;

    for bucket in acc.buckets() {
        tracing::info!("status {}: {} conditions", bucket.status, bucket.entries.len());
    }
    tracing::info!("timeouts: {}", acc.timeouts().count());
    println!("{SEPARATOR}");
    println!("Results printed out to {}", path.display());

    Ok(path)
}
