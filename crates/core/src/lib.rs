//! # Sweep Core
//!
//! Parameter-sweep execution engine for exercising clinical-trial matching services.
//!
//! This crate contains the run logic:
//! - enumerating the parameter space (locations × radii, or catalogue condition codes)
//! - building one independent request document per unit of work
//! - skipping units whose report already exists, so interrupted runs can resume
//! - dispatching requests one at a time and classifying the outcome
//! - accumulating outcomes by HTTP status, with timeouts and connection failures kept apart
//! - writing per-unit CSV reports or a single condition workbook
//!
//! **No CLI concerns**: argument parsing, logging setup and process exit belong in the
//! `trialsweep` binary.

pub mod accumulator;
pub mod completion;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod plan;
pub mod records;
pub mod report;
pub mod request;
pub mod sweep;

pub use accumulator::{Bucket, FailedUnit, FailureKind, ResponseEntry, RunAccumulator, StatusBucket};
pub use config::{ConditionConfig, LoaderConfig, ServiceRegistry};
pub use dispatch::{DispatchEngine, HttpTransport, Outcome, Transport, TransportError, TransportResponse};
pub use error::{SweepError, SweepResult};
pub use plan::{Combination, LocationSweep, SweepMode, UnitOfWork};
pub use sweep::{run_condition_sweep, run_loader};
