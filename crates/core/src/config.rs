//! Sweep runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into the run drivers. Values that may come from the environment are handed in as
//! `Option<String>` by the binary; nothing here reads process-wide environment variables, so
//! the run behaves identically under test harnesses.

use crate::constants::{DEFAULT_LOADER_SERVICE_URL, DEFAULT_SERVICES, DEFAULT_TIMEOUT};
use crate::plan::{LocationSweep, SweepMode};
use crate::{SweepError, SweepResult};
use fhir::CancerCategory;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for a record loader run.
#[derive(Clone, Debug)]
pub struct LoaderConfig {
    record_dir: PathBuf,
    results_dir: PathBuf,
    service_url: String,
    timeout: Duration,
    sweep: LocationSweep,
    skip_existing: bool,
}

impl LoaderConfig {
    /// Create a new `LoaderConfig`.
    ///
    /// # Errors
    ///
    /// Returns `SweepError::Usage` if `results_dir` is missing or blank, or if `record_dir`
    /// is not a directory.
    pub fn new(
        record_dir: PathBuf,
        results_dir: Option<PathBuf>,
        service_url: Option<String>,
        timeout: Duration,
        sweep: LocationSweep,
        skip_existing: bool,
    ) -> SweepResult<Self> {
        let results_dir = results_dir
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| SweepError::Usage("Please supply a path to a results directory".into()))?;

        if !record_dir.is_dir() {
            return Err(SweepError::Usage(format!(
                "record directory {} does not exist",
                record_dir.display()
            )));
        }

        Ok(Self {
            record_dir,
            results_dir,
            service_url: non_blank(service_url)
                .unwrap_or_else(|| DEFAULT_LOADER_SERVICE_URL.to_string()),
            timeout,
            sweep,
            skip_existing,
        })
    }

    pub fn record_dir(&self) -> &Path {
        &self.record_dir
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn sweep(&self) -> &LocationSweep {
        &self.sweep
    }

    pub fn skip_existing(&self) -> bool {
        self.skip_existing
    }
}

/// Configuration for a condition-code sweep.
#[derive(Clone, Debug)]
pub struct ConditionConfig {
    service: String,
    service_url: String,
    category: CancerCategory,
    catalogue_path: PathBuf,
    output_dir: Option<PathBuf>,
    timeout: Duration,
}

impl ConditionConfig {
    /// Create a new `ConditionConfig`.
    ///
    /// `output_dir` is only used when it exists; otherwise the workbook goes to the working
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns `SweepError::Usage` if the catalogue path is missing or the service is not in
    /// `registry`.
    pub fn new(
        registry: &ServiceRegistry,
        service: &str,
        category: CancerCategory,
        catalogue_path: Option<PathBuf>,
        output_dir: Option<PathBuf>,
        timeout: Duration,
    ) -> SweepResult<Self> {
        let catalogue_path = catalogue_path
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| {
                SweepError::Usage(
                    "Please supply a path to the application's list of cancer types.".into(),
                )
            })?;

        Ok(Self {
            service: service.to_string(),
            service_url: registry.url_for(service)?.to_string(),
            category,
            catalogue_path,
            output_dir: output_dir.filter(|p| p.is_dir()),
            timeout,
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    pub fn category(&self) -> CancerCategory {
        self.category
    }

    pub fn catalogue_path(&self) -> &Path {
        &self.catalogue_path
    }

    /// Directory the workbook is written to, if one was supplied and exists.
    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Matching services a condition sweep can target, by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceRegistry {
    services: BTreeMap<String, String>,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self {
            services: DEFAULT_SERVICES
                .iter()
                .map(|(name, url)| (name.to_string(), url.to_string()))
                .collect(),
        }
    }
}

impl ServiceRegistry {
    /// Built-in services, extended or overridden by the YAML mapping at `path` if given.
    ///
    /// # Errors
    ///
    /// Returns `SweepError::ConfigRead` / `SweepError::YamlDeserialization` if the file
    /// cannot be read or is not a name → URL mapping.
    pub fn load(path: Option<&Path>) -> SweepResult<Self> {
        let registry = Self::default();
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(SweepError::ConfigRead)?;
                registry.with_overrides(&text)
            }
            None => Ok(registry),
        }
    }

    /// Apply a YAML `name: url` mapping on top of this registry.
    pub fn with_overrides(mut self, yaml_text: &str) -> SweepResult<Self> {
        let overrides: BTreeMap<String, String> =
            serde_yaml::from_str(yaml_text).map_err(SweepError::YamlDeserialization)?;

        for (name, url) in overrides {
            if url.trim().is_empty() {
                return Err(SweepError::Config(format!("service '{name}' has an empty URL")));
            }
            self.services.insert(name, url);
        }
        Ok(self)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    /// # Errors
    ///
    /// Returns `SweepError::Usage` naming the known services if `name` is not one of them.
    pub fn url_for(&self, name: &str) -> SweepResult<&str> {
        self.services.get(name).map(String::as_str).ok_or_else(|| {
            SweepError::Usage(format!(
                "unknown service '{name}' (expected one of: {})",
                self.names().collect::<Vec<_>>().join(", ")
            ))
        })
    }
}

/// Parse the dispatch timeout (whole seconds) from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default of 30 seconds.
pub fn timeout_from_env_value(value: Option<String>) -> SweepResult<Duration> {
    match non_blank(value) {
        None => Ok(DEFAULT_TIMEOUT),
        Some(v) => match v.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(SweepError::Config(format!(
                "timeout must be a positive number of seconds, got '{v}'"
            ))),
        },
    }
}

/// Location sweep for `mode`, optionally replacing the built-in lists of a broad run.
///
/// Overrides are comma separated. They are ignored for narrow runs.
pub fn location_sweep_from_env_values(
    mode: SweepMode,
    zip_codes: Option<String>,
    radii: Option<String>,
) -> SweepResult<LocationSweep> {
    let builtin = LocationSweep::for_mode(mode);
    if mode == SweepMode::Narrow {
        return Ok(builtin);
    }

    let split = |v: String| v.split(',').map(|s| s.trim().to_string()).collect::<Vec<_>>();
    let zip_codes = non_blank(zip_codes).map(split);
    let radii = non_blank(radii).map(split);
    if zip_codes.is_none() && radii.is_none() {
        return Ok(builtin);
    }

    LocationSweep::new(
        zip_codes.unwrap_or_else(|| builtin.zip_codes().to_vec()),
        radii.unwrap_or_else(|| builtin.radii().to_vec()),
    )
}

/// Expand a leading `~` to `home`.
pub fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
