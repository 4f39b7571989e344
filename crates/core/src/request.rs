//! Outbound request construction.
//!
//! Each unit of work gets its own freshly built document. The base record is borrowed,
//! never mutated, so one loaded record can back every combination in a sweep.

use crate::plan::Combination;
use crate::SweepResult;
use fhir::{Bundle, PrimaryCondition};
use serde_json::Value;

/// Builds the request document for `combination`.
///
/// Location combinations are appended to `base` as a `Parameters` resource. Condition
/// combinations ignore `base` and fill the fixed primary-condition skeleton instead.
///
/// # Errors
///
/// Returns `SweepError::Structure` if a location combination is applied to a record that
/// has no `entry` list.
pub fn build(base: &Value, combination: &Combination) -> SweepResult<Value> {
    match combination {
        Combination::Location(params) => Ok(Bundle::with_search_parameters(base, params)?),
        Combination::Condition(coding) => Ok(PrimaryCondition::request(coding)),
    }
}
