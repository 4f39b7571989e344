//! Primary cancer condition requests and the condition catalogue.
//!
//! Condition sweeps submit the same synthetic patient over and over, changing only the
//! coding of the mCODE primary cancer condition. The codes come from the matching
//! application's `cancerTypes.json` catalogue, filtered by cancer category.
//!
//! Notes:
//! - The catalogue's `cancerType` field is either a single string or a list of strings.
//!   A string matches when it contains the requested category; a list matches when any
//!   element equals it.
//! - Catalogue order is preserved so repeated sweeps visit codes in the same order.

use crate::{FhirError, FhirResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Default coding system for condition codes.
pub const SNOMED_SYSTEM: &str = "http://snomed.info/sct";

/// mCODE profile URL for a primary cancer condition.
pub const PRIMARY_CANCER_PROFILE: &str =
    "http://hl7.org/fhir/us/mcode/StructureDefinition/mcode-primary-cancer-condition";

/// Search location baked into every condition request.
pub const CONDITION_REQUEST_ZIP_CODE: &str = "75390";

/// Search radius baked into every condition request.
pub const CONDITION_REQUEST_RADIUS: &str = "20";

const SKELETON_PATIENT_ID: &str = "x158lHhYhbvCXQ3VLfy-v";

// ============================================================================
// Public domain-level types
// ============================================================================

/// A single coding for the primary cancer condition.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConditionCoding {
    pub code: String,
    pub display: String,
    #[serde(default = "default_system")]
    pub system: String,
}

impl ConditionCoding {
    pub fn new(
        code: impl Into<String>,
        display: impl Into<String>,
        system: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            display: display.into(),
            system: system.into(),
        }
    }
}

impl fmt::Display for ConditionCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.code, self.display, self.system)
    }
}

fn default_system() -> String {
    SNOMED_SYSTEM.to_string()
}

/// Cancer categories a condition sweep can target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CancerCategory {
    Bladder,
    Brain,
    Breast,
    Colon,
    Lung,
    MultipleMyeloma,
    Prostate,
}

impl CancerCategory {
    /// All categories, in the order they are offered on the command line.
    pub const ALL: [CancerCategory; 7] = [
        CancerCategory::Bladder,
        CancerCategory::Brain,
        CancerCategory::Breast,
        CancerCategory::Colon,
        CancerCategory::Lung,
        CancerCategory::MultipleMyeloma,
        CancerCategory::Prostate,
    ];

    /// Catalogue spelling of the category.
    pub fn as_str(self) -> &'static str {
        match self {
            CancerCategory::Bladder => "bladder",
            CancerCategory::Brain => "brain",
            CancerCategory::Breast => "breast",
            CancerCategory::Colon => "colon",
            CancerCategory::Lung => "lung",
            CancerCategory::MultipleMyeloma => "multipleMyeloma",
            CancerCategory::Prostate => "prostate",
        }
    }
}

impl fmt::Display for CancerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CancerCategory {
    type Err = FhirError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CancerCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| FhirError::InvalidInput(format!("unknown cancer type '{s}'")))
    }
}

// ============================================================================
// Catalogue
// ============================================================================

/// The condition catalogue loaded from `cancerTypes.json`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConditionCatalogue {
    entries: Vec<CatalogueEntryWire>,
}

impl ConditionCatalogue {
    /// Parse the catalogue from JSON text (a top-level array of entries).
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::Translation`] naming the failing path if any entry does not
    /// match the catalogue schema.
    pub fn parse(json_text: &str) -> FhirResult<Self> {
        let entries: Vec<CatalogueEntryWire> =
            crate::from_json_with_path(json_text, "Condition catalogue")?;
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Codings whose category field contains `category`, in catalogue order.
    pub fn codings_for(&self, category: CancerCategory) -> Vec<ConditionCoding> {
        self.entries
            .iter()
            .filter(|entry| entry.cancer_type.contains(category.as_str()))
            .map(|entry| entry.coding.clone())
            .collect()
    }
}

// ============================================================================
// Request skeleton
// ============================================================================

/// Primary cancer condition request operations.
///
/// This is a zero-sized type used for namespacing request construction.
pub struct PrimaryCondition;

impl PrimaryCondition {
    /// Build the fixed patient/condition Bundle with `coding` as the primary condition.
    ///
    /// Every call returns a fresh document; nothing is shared between requests.
    pub fn request(coding: &ConditionCoding) -> Value {
        json!({
            "resourceType": "Bundle",
            "type": "collection",
            "entry": [
                {
                    "resource": {
                        "resourceType": "Parameters",
                        "id": "0",
                        "parameter": [
                            { "name": "zipCode", "valueString": CONDITION_REQUEST_ZIP_CODE },
                            { "name": "travelRadius", "valueString": CONDITION_REQUEST_RADIUS }
                        ]
                    }
                },
                {
                    "resource": {
                        "resourceType": "Patient",
                        "id": SKELETON_PATIENT_ID,
                        "gender": "female",
                        "birthDate": "1953"
                    },
                    "fullUrl": format!("urn:uuid:{SKELETON_PATIENT_ID}")
                },
                {
                    "resource": {
                        "resourceType": "Condition",
                        "meta": { "profile": [PRIMARY_CANCER_PROFILE] },
                        "subject": {
                            "reference": format!("urn:uuid:{SKELETON_PATIENT_ID}"),
                            "type": "Patient"
                        },
                        "code": {
                            "coding": [
                                {
                                    "system": coding.system,
                                    "code": coding.code,
                                    "display": coding.display
                                }
                            ]
                        },
                        "category": [
                            {
                                "coding": [
                                    { "system": SNOMED_SYSTEM, "code": "64572001" }
                                ]
                            }
                        ]
                    }
                }
            ]
        })
    }

    /// Read back the primary condition coding from a request built by [`Self::request`].
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::Structure`] if the Bundle has no Condition with a coding.
    pub fn coding(bundle: &Value) -> FhirResult<ConditionCoding> {
        let coding = bundle
            .get("entry")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .find(|entry| {
                entry
                    .pointer("/resource/resourceType")
                    .and_then(Value::as_str)
                    == Some("Condition")
            })
            .and_then(|entry| entry.pointer("/resource/code/coding/0"))
            .ok_or_else(|| FhirError::Structure("request has no primary condition coding".into()))?;

        Ok(serde_json::from_value(coding.clone())?)
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
struct CatalogueEntryWire {
    #[serde(flatten)]
    pub coding: ConditionCoding,

    #[serde(rename = "cancerType")]
    pub cancer_type: CancerTypeField,
}

/// Shape of the catalogue's `cancerType` field.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
enum CancerTypeField {
    One(String),
    Many(Vec<String>),
}

impl CancerTypeField {
    fn contains(&self, category: &str) -> bool {
        match self {
            CancerTypeField::One(value) => value.contains(category),
            CancerTypeField::Many(values) => values.iter().any(|v| v == category),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOGUE: &str = r#"[
        { "code": "254637007", "display": "Non-small cell lung cancer", "system": "http://snomed.info/sct", "cancerType": ["lung"] },
        { "code": "408643008", "display": "Infiltrating duct carcinoma of breast", "system": "http://snomed.info/sct", "cancerType": ["breast"] },
        { "code": "C34.90", "display": "Lung, unspecified", "system": "http://hl7.org/fhir/sid/icd-10-cm", "cancerType": ["lung", "brain"] },
        { "code": "94225005", "display": "Metastatic lung neoplasm", "cancerType": "lung" }
    ]"#;

    #[test]
    fn filters_by_category_preserving_order() {
        let catalogue = ConditionCatalogue::parse(CATALOGUE).expect("parse catalogue");
        assert_eq!(catalogue.len(), 4);

        let codes: Vec<_> = catalogue
            .codings_for(CancerCategory::Lung)
            .into_iter()
            .map(|c| c.code)
            .collect();
        assert_eq!(codes, vec!["254637007", "C34.90", "94225005"]);

        let brain = catalogue.codings_for(CancerCategory::Brain);
        assert_eq!(brain.len(), 1);
        assert_eq!(brain[0].system, "http://hl7.org/fhir/sid/icd-10-cm");

        assert!(catalogue.codings_for(CancerCategory::Prostate).is_empty());
    }

    #[test]
    fn missing_system_defaults_to_snomed() {
        let catalogue = ConditionCatalogue::parse(CATALOGUE).unwrap();
        let last = catalogue.codings_for(CancerCategory::Lung).pop().unwrap();
        assert_eq!(last.system, SNOMED_SYSTEM);
    }

    #[test]
    fn catalogue_schema_errors_name_the_path() {
        let err = ConditionCatalogue::parse(r#"[{ "code": "1", "display": "x", "cancerType": 3 }]"#)
            .expect_err("numeric cancerType");
        match err {
            FhirError::Translation(msg) => assert!(msg.contains("Condition catalogue")),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn request_carries_the_coding() {
        let coding = ConditionCoding::new("254637007", "NSCLC", SNOMED_SYSTEM);
        let request = PrimaryCondition::request(&coding);

        assert_eq!(request["type"], "collection");
        assert_eq!(PrimaryCondition::coding(&request).unwrap(), coding);

        let params = crate::SearchParameters::extract(&request).unwrap().unwrap();
        assert_eq!(params.zip_code, CONDITION_REQUEST_ZIP_CODE);
        assert_eq!(params.travel_radius, CONDITION_REQUEST_RADIUS);
    }

    #[test]
    fn category_parses_from_catalogue_spelling() {
        assert_eq!(
            "multipleMyeloma".parse::<CancerCategory>().unwrap(),
            CancerCategory::MultipleMyeloma
        );
        assert!("kidney".parse::<CancerCategory>().is_err());
    }
}
