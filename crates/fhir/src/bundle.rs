//! Patient record Bundles.
//!
//! Records are opaque JSON documents; the harness only relies on the top-level
//! `entry` list (to append the search `Parameters`) and the `type` field (forced to
//! `collection` before submission). Everything else passes through untouched.

use crate::{FhirError, FhirResult, SearchParameters};
use serde_json::Value;

/// Bundle type the matching service expects on submission.
pub const COLLECTION_BUNDLE_TYPE: &str = "collection";

/// Bundle document operations.
///
/// This is a zero-sized type used for namespacing Bundle-related operations.
/// All methods are associated functions.
pub struct Bundle;

impl Bundle {
    /// Parse a record Bundle from JSON text.
    ///
    /// The document must be a JSON object; its contents are otherwise not validated.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if the text is not JSON or not a JSON object.
    pub fn parse(json_text: &str) -> FhirResult<Value> {
        let value: Value = serde_json::from_str(json_text)?;
        if !value.is_object() {
            return Err(FhirError::Structure(
                "record document must be a JSON object".into(),
            ));
        }
        Ok(value)
    }

    /// Build a submission document from `base` with `params` appended to its entries.
    ///
    /// `base` is never modified: the returned document is an independent copy, so
    /// repeated calls against the same base record produce identical documents.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::Structure`] if `base` has no `entry` list.
    pub fn with_search_parameters(base: &Value, params: &SearchParameters) -> FhirResult<Value> {
        let mut document = base.clone();

        let object = document
            .as_object_mut()
            .ok_or_else(|| FhirError::Structure("record document must be a JSON object".into()))?;

        let entries = object
            .get_mut("entry")
            .and_then(Value::as_array_mut)
            .ok_or_else(|| FhirError::Structure("record has no 'entry' list".into()))?;
        entries.push(params.to_bundle_entry()?);

        object.insert(
            "type".to_string(),
            Value::String(COLLECTION_BUNDLE_TYPE.to_string()),
        );

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_record() -> Value {
        json!({
            "resourceType": "Bundle",
            "type": "transaction",
            "entry": [
                { "resource": { "resourceType": "Patient", "id": "p1" } }
            ]
        })
    }

    #[test]
    fn appends_parameters_and_forces_collection() {
        let base = base_record();
        let params = SearchParameters::new("75001", "20");

        let doc = Bundle::with_search_parameters(&base, &params).expect("build");

        assert_eq!(doc["type"], "collection");
        assert_eq!(doc["entry"].as_array().unwrap().len(), 2);
        let extracted = SearchParameters::extract(&doc).unwrap().unwrap();
        assert_eq!(extracted, params);
    }

    #[test]
    fn leaves_base_record_untouched() {
        let base = base_record();
        let before = base.clone();

        let _ = Bundle::with_search_parameters(&base, &SearchParameters::new("1", "2")).unwrap();
        let _ = Bundle::with_search_parameters(&base, &SearchParameters::new("3", "4")).unwrap();

        assert_eq!(base, before);
    }

    #[test]
    fn rebuilding_from_same_base_is_byte_identical() {
        let base = base_record();
        let params = SearchParameters::new("26506", "50");

        let a = Bundle::with_search_parameters(&base, &params).unwrap();
        let b = Bundle::with_search_parameters(&base, &params).unwrap();

        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
    }

    #[test]
    fn rejects_record_without_entry_list() {
        let base = json!({ "resourceType": "Bundle", "entry": "nope" });

        let err = Bundle::with_search_parameters(&base, &SearchParameters::new("1", "2"))
            .expect_err("entry is not a list");
        assert!(matches!(err, FhirError::Structure(_)));
    }

    #[test]
    fn parse_rejects_non_object_documents() {
        let err = Bundle::parse("[1, 2, 3]").expect_err("array is not a record");
        assert!(matches!(err, FhirError::Structure(_)));

        let err = Bundle::parse("{ not json").expect_err("invalid json");
        assert!(matches!(err, FhirError::InvalidJson(_)));
    }
}
