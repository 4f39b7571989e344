//! Report emitters.
//!
//! Two shapes, depending on the run:
//! - loader runs write one headerless, single-column CSV of match identifiers per unit,
//!   as soon as the unit completes, and only when the service reported matches;
//! - condition sweeps write one workbook at the end of the run with a sheet per HTTP
//!   status seen, plus `Timeouts` / `Connection Failures` sheets when any occurred.
//!
//! Workbook codes are written as text so that spreadsheet applications do not reformat
//! numeric-looking codes (e.g. into scientific notation).

use crate::accumulator::{FailedUnit, RunAccumulator};
use crate::constants::{CONNECTION_FAILURES_SHEET, TIMEOUTS_SHEET, WORKBOOK_TIMESTAMP_FORMAT};
use crate::plan::{Combination, UnitOfWork};
use crate::{SweepError, SweepResult};
use chrono::{DateTime, TimeZone};
use fhir::{CancerCategory, ConditionCoding};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::fmt::Display;
use std::path::Path;

const RESPONSE_HEADERS: [&str; 4] = ["Code", "Display", "System", "Number of Results"];
const FAILURE_HEADERS: [&str; 3] = ["Code", "Display", "System"];

/// Writes `identifiers` to `path`, one per row, no header.
///
/// # Errors
///
/// Returns `SweepError::CsvWrite` if the file cannot be created or written.
pub fn write_identifiers_csv(path: &Path, identifiers: &[String]) -> SweepResult<()> {
    let csv_err = |source| SweepError::CsvWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(csv_err)?;
    for identifier in identifiers {
        writer.write_record([identifier]).map_err(csv_err)?;
    }
    writer.flush().map_err(|e| csv_err(e.into()))?;
    Ok(())
}

/// Workbook file name: `<service>_<cancer>_<timestamp>.xlsx`.
pub fn workbook_file_name<Tz>(service: &str, category: CancerCategory, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "{service}_{category}_{}.xlsx",
        at.format(WORKBOOK_TIMESTAMP_FORMAT)
    )
}

/// Writes the condition sweep workbook for `acc` to `path`.
///
/// Units that are not condition units carry no code/display/system and are left out.
///
/// # Errors
///
/// Returns `SweepError::WorkbookWrite` if the workbook cannot be built or saved.
pub fn write_condition_workbook(path: &Path, acc: &RunAccumulator) -> SweepResult<()> {
    build_workbook(path, acc).map_err(|source| SweepError::WorkbookWrite {
        path: path.to_path_buf(),
        source,
    })
}

fn build_workbook(path: &Path, acc: &RunAccumulator) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let text = Format::new().set_num_format("@");

    for bucket in acc.buckets() {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(bucket.status.to_string())?;
        write_headers(worksheet, &RESPONSE_HEADERS)?;

        let rows = bucket
            .entries
            .iter()
            .filter_map(|entry| condition_of(&entry.unit).map(|coding| (coding, entry.total)));
        for (row, (coding, total)) in (1u32..).zip(rows) {
            write_coding(worksheet, row, coding, &text)?;
            worksheet.write_number(row, 3, total as f64)?;
        }
    }

    let timeouts: Vec<_> = acc.timeouts().collect();
    if !timeouts.is_empty() {
        write_failure_sheet(&mut workbook, TIMEOUTS_SHEET, &timeouts, &text)?;
    }

    let connection_failures: Vec<_> = acc.connection_failures().collect();
    if !connection_failures.is_empty() {
        write_failure_sheet(&mut workbook, CONNECTION_FAILURES_SHEET, &connection_failures, &text)?;
    }

    workbook.save(path)
}

fn write_failure_sheet(
    workbook: &mut Workbook,
    name: &str,
    failures: &[&FailedUnit],
    text: &Format,
) -> Result<(), XlsxError> {
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(name)?;
    write_headers(worksheet, &FAILURE_HEADERS)?;

    let rows = failures.iter().filter_map(|f| condition_of(&f.unit));
    for (row, coding) in (1u32..).zip(rows) {
        write_coding(worksheet, row, coding, text)?;
    }
    Ok(())
}

fn write_headers(worksheet: &mut Worksheet, headers: &[&str]) -> Result<(), XlsxError> {
    for (col, header) in (0u16..).zip(headers) {
        worksheet.write_string(0, col, *header)?;
    }
    Ok(())
}

fn write_coding(
    worksheet: &mut Worksheet,
    row: u32,
    coding: &ConditionCoding,
    text: &Format,
) -> Result<(), XlsxError> {
    worksheet.write_string_with_format(row, 0, &coding.code, text)?;
    worksheet.write_string(row, 1, &coding.display)?;
    worksheet.write_string(row, 2, &coding.system)?;
    Ok(())
}

fn condition_of(unit: &UnitOfWork) -> Option<&ConditionCoding> {
    match &unit.combination {
        Combination::Condition(coding) => Some(coding),
        Combination::Location(_) => None,
    }
}
