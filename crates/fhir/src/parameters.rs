//! FHIR `Parameters` resource carrying the trial search location.
//!
//! The matching service reads the patient's search area from a `Parameters` resource
//! appended to the submitted Bundle. Only two parameters are understood:
//! - `zipCode`: postal code the search is centred on
//! - `travelRadius`: maximum travel distance, as a string
//!
//! Both are sent as `valueString` to match what the service expects.

use crate::{FhirError, FhirResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameter name for the search postal code.
pub const ZIP_CODE_PARAM: &str = "zipCode";

/// Parameter name for the search radius.
pub const TRAVEL_RADIUS_PARAM: &str = "travelRadius";

// ============================================================================
// Public domain-level types
// ============================================================================

/// Domain-level carrier for the search location sent alongside a record.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SearchParameters {
    /// Postal code the trial search is centred on.
    pub zip_code: String,

    /// Travel radius, kept as text exactly as it is sent on the wire.
    pub travel_radius: String,
}

impl SearchParameters {
    pub fn new(zip_code: impl Into<String>, travel_radius: impl Into<String>) -> Self {
        Self {
            zip_code: zip_code.into(),
            travel_radius: travel_radius.into(),
        }
    }

    /// Render these parameters as a Bundle entry (`{"resource": {...}}`).
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::InvalidJson`] if serialisation fails.
    pub fn to_bundle_entry(&self) -> FhirResult<Value> {
        let wire = EntryWire {
            resource: ParametersWire {
                resource_type: "Parameters".to_string(),
                id: "0".to_string(),
                parameter: vec![
                    ParameterWire {
                        name: ZIP_CODE_PARAM.to_string(),
                        value_string: self.zip_code.clone(),
                    },
                    ParameterWire {
                        name: TRAVEL_RADIUS_PARAM.to_string(),
                        value_string: self.travel_radius.clone(),
                    },
                ],
            },
        };
        Ok(serde_json::to_value(wire)?)
    }

    /// Find the last `Parameters` entry in a Bundle and read the search location from it.
    ///
    /// Returns `Ok(None)` when the Bundle carries no `Parameters` resource.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if:
    /// - the Bundle has no `entry` list,
    /// - the `Parameters` resource does not match the wire schema,
    /// - either `zipCode` or `travelRadius` is missing.
    pub fn extract(bundle: &Value) -> FhirResult<Option<Self>> {
        let entries = bundle
            .get("entry")
            .and_then(Value::as_array)
            .ok_or_else(|| FhirError::Structure("bundle has no 'entry' list".into()))?;

        let Some(entry) = entries.iter().rev().find(|entry| {
            entry
                .pointer("/resource/resourceType")
                .and_then(Value::as_str)
                == Some("Parameters")
        }) else {
            return Ok(None);
        };

        let wire: EntryWire = crate::from_json_with_path(&entry.to_string(), "Parameters")?;
        let lookup = |name: &str| {
            wire.resource
                .parameter
                .iter()
                .find(|p| p.name == name)
                .map(|p| p.value_string.clone())
                .ok_or_else(|| FhirError::InvalidInput(format!("missing parameter '{name}'")))
        };

        Ok(Some(Self {
            zip_code: lookup(ZIP_CODE_PARAM)?,
            travel_radius: lookup(TRAVEL_RADIUS_PARAM)?,
        }))
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
struct EntryWire {
    pub resource: ParametersWire,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
struct ParametersWire {
    #[serde(rename = "resourceType")]
    pub resource_type: String,

    pub id: String,

    #[serde(default)]
    pub parameter: Vec<ParameterWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
struct ParameterWire {
    pub name: String,

    #[serde(rename = "valueString")]
    pub value_string: String,
}
