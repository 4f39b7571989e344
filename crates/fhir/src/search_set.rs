//! Search-set responses from the matching service.
//!
//! A successful response is a Bundle of `ResearchStudy` matches:
//! - `total`: number of matches; absent or non-integer values are read as `0`
//! - `entry`: the matches, each identified by `resource.identifier[0].value`
//!
//! Entries are only inspected when `total > 0`; the service may omit `entry` entirely when
//! it has nothing to report. A response claiming matches must carry an `entry` list.

use crate::{FhirError, FhirResult};
use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// Public domain-level types
// ============================================================================

/// Domain-level carrier for a parsed search-set response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchSetData {
    /// Number of matches reported by the service.
    pub total: u64,

    /// Match identifiers in response order. Empty when `total == 0`.
    pub identifiers: Vec<String>,
}

impl SearchSetData {
    pub fn has_matches(&self) -> bool {
        self.total > 0
    }
}

/// Search-set operations.
///
/// This is a zero-sized type used for namespacing search-set related operations.
pub struct SearchSet;

impl SearchSet {
    /// Parse a search-set response body.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if:
    /// - the body is not a JSON object,
    /// - `total > 0` and `entry` is absent,
    /// - `total > 0` and an entry lacks `resource.identifier[0].value`.
    pub fn parse(json_text: &str) -> FhirResult<SearchSetData> {
        let wire: SearchSetWire = crate::from_json_with_path(json_text, "Search set")?;
        let total = Self::read_total(wire.total.as_ref());

        if total == 0 {
            return Ok(SearchSetData::default());
        }

        let entries = wire.entry.ok_or_else(|| {
            FhirError::Structure(format!("search set reports {total} matches but has no entry"))
        })?;

        let identifiers = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                entry
                    .pointer("/resource/identifier/0/value")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        FhirError::Structure(format!(
                            "search set entry {index} has no resource.identifier[0].value"
                        ))
                    })
            })
            .collect::<FhirResult<Vec<_>>>()?;

        Ok(SearchSetData { total, identifiers })
    }

    /// Read only the `total` of a response body, defaulting to `0`.
    ///
    /// Used for non-success responses where the body may not be a search set at all;
    /// unparseable bodies also read as `0`.
    pub fn total_or_zero(json_text: &str) -> u64 {
        serde_json::from_str::<Value>(json_text)
            .ok()
            .and_then(|v| v.get("total").cloned())
            .map(|v| Self::read_total(Some(&v)))
            .unwrap_or(0)
    }

    fn read_total(total: Option<&Value>) -> u64 {
        match total {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f > 0.0 && f.fract() == 0.0).map(|f| f as u64))
                .unwrap_or(0),
            _ => 0,
        }
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize)]
struct SearchSetWire {
    #[serde(default)]
    pub total: Option<Value>,

    #[serde(default)]
    pub entry: Option<Vec<Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn study(id: &str) -> String {
        format!(
            r#"{{ "resource": {{ "resourceType": "ResearchStudy", "identifier": [{{ "value": "{id}" }}] }} }}"#
        )
    }

    #[test]
    fn parses_identifiers_in_response_order() {
        let body = format!(
            r#"{{ "resourceType": "Bundle", "type": "searchset", "total": 3, "entry": [{}, {}, {}] }}"#,
            study("NCT03"),
            study("NCT01"),
            study("NCT02")
        );

        let data = SearchSet::parse(&body).expect("parse search set");
        assert_eq!(data.total, 3);
        assert_eq!(data.identifiers, vec!["NCT03", "NCT01", "NCT02"]);
        assert!(data.has_matches());
    }

    #[test]
    fn absent_total_reads_as_zero() {
        let data = SearchSet::parse(r#"{ "resourceType": "Bundle" }"#).unwrap();
        assert_eq!(data, SearchSetData::default());
        assert!(!data.has_matches());
    }

    #[test]
    fn malformed_total_reads_as_zero() {
        let data = SearchSet::parse(r#"{ "total": "many", "entry": [] }"#).unwrap();
        assert_eq!(data.total, 0);

        let data = SearchSet::parse(r#"{ "total": -2 }"#).unwrap();
        assert_eq!(data.total, 0);
    }

    #[test]
    fn zero_total_ignores_entries() {
        let body = r#"{ "total": 0, "entry": [{ "resource": {} }] }"#;
        let data = SearchSet::parse(body).unwrap();
        assert!(data.identifiers.is_empty());
    }

    #[test]
    fn entry_without_identifier_is_structural_error() {
        let body = r#"{ "total": 1, "entry": [{ "resource": { "identifier": [] } }] }"#;
        let err = SearchSet::parse(body).expect_err("identifier missing");
        assert!(matches!(err, FhirError::Structure(_)));
    }

    #[test]
    fn matches_without_entry_list_are_structural_error() {
        let err = SearchSet::parse(r#"{ "total": 3 }"#).expect_err("entry missing");
        assert!(matches!(err, FhirError::Structure(_)));
    }

    #[test]
    fn unparseable_body_is_an_error() {
        assert!(SearchSet::parse("<html>Bad Gateway</html>").is_err());
    }

    #[test]
    fn total_or_zero_tolerates_any_body() {
        assert_eq!(SearchSet::total_or_zero(r#"{ "total": 7 }"#), 7);
        assert_eq!(SearchSet::total_or_zero(r#"{ "error": "boom" }"#), 0);
        assert_eq!(SearchSet::total_or_zero("Internal Server Error"), 0);
    }
}
