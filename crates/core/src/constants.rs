//! Constants used throughout the sweep core crate.
//!
//! Default sweep lists, service locations and report naming live here so the
//! run drivers and their tests agree on them.

use std::time::Duration;

/// Upper bound on a single dispatch when no override is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Matching service used by record loader runs.
pub const DEFAULT_LOADER_SERVICE_URL: &str = "http://localhost:3000/getClinicalTrial";

/// Built-in condition sweep services (name, URL).
pub const DEFAULT_SERVICES: [(&str, &str); 5] = [
    ("ancora", "http://localhost:3002/getClinicalTrial"),
    ("carebox", "http://localhost:3004/getClinicalTrial"),
    ("bct", "http://localhost:3000/getClinicalTrial"),
    ("lungevity", "http://localhost:3003/getClinicalTrial"),
    ("trialjectory", "http://localhost:3001/getClinicalTrial"),
];

/// Zip code for a narrow run.
pub const NARROW_ZIP_CODE: &str = "75001";

/// Radius for a narrow run.
pub const NARROW_RADIUS: &str = "20";

/// Zip codes visited by a broad run, in visiting order.
///
/// The list repeats "26506"; enumeration keeps only the first occurrence.
pub const BROAD_ZIP_CODES: [&str; 29] = [
    "25438", "26506", "26330", "26101", "25401", "26003", "26038", "24740", "15401", "26726",
    "90211", "55455", "55101", "72205", "26506", "19104", "92868", "60637", "59102", "85364",
    "33606", "80045", "06102", "31202", "31405", "31904", "31501", "30303", "75390",
];

/// Radii visited for each zip code in a broad run.
pub const BROAD_RADII: [&str; 3] = ["20", "50", "100"];

/// Extension of record documents picked up from the record directory.
pub const RECORD_EXTENSION: &str = "json";

/// Extension of per-unit loader reports.
pub const CSV_EXTENSION: &str = "csv";

/// Timestamp format embedded in workbook file names.
pub const WORKBOOK_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Sheet listing conditions whose dispatch timed out.
pub const TIMEOUTS_SHEET: &str = "Timeouts";

/// Sheet listing conditions whose dispatch could not connect.
pub const CONNECTION_FAILURES_SHEET: &str = "Connection Failures";

/// Rule printed between console sections.
pub const SEPARATOR: &str = "---------------------------------------------";
