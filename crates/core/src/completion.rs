//! Completion tracking for idempotent re-runs.
//!
//! A loader unit is complete once its CSV report exists. The report path is a pure
//! function of the record name and the location, so re-running with skipping enabled
//! never dispatches a completed unit again and retries everything else.

use crate::constants::CSV_EXTENSION;
use fhir::SearchParameters;
use std::path::{Path, PathBuf};

/// Report path for `record` searched at `params`:
/// `<results_dir>/<record>_r<radius>_z<zip>.csv`.
pub fn output_path(results_dir: &Path, record: &str, params: &SearchParameters) -> PathBuf {
    results_dir.join(format!(
        "{record}_r{}_z{}.{CSV_EXTENSION}",
        params.travel_radius, params.zip_code
    ))
}

/// True iff skipping is enabled and `output_path` already exists.
pub fn should_skip(output_path: &Path, skip_enabled: bool) -> bool {
    skip_enabled && output_path.exists()
}
