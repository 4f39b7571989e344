//! FHIR wire/boundary support for the trial-matching sweep harness.
//!
//! This crate provides **wire models** and **document helpers** for the JSON documents
//! exchanged with a clinical-trial matching service:
//! - patient record Bundles (treated as opaque JSON apart from the `entry` container)
//! - the synthetic `Parameters` resource carrying the search location and radius
//! - the fixed primary-cancer-condition request used for condition sweeps
//! - the condition catalogue (`cancerTypes.json`) entries
//! - the search-set response returned by the matching service
//!
//! This crate focuses on:
//! - FHIR semantic alignment of the request/response shapes
//! - serialisation/deserialisation with path-aware error messages
//! - copy-on-write construction of outbound documents
//!
//! It performs no I/O against the network; transport belongs in `sweep-core`.

pub mod bundle;
pub mod condition;
pub mod parameters;
pub mod search_set;

// Re-export facades
pub use bundle::Bundle;
pub use condition::{CancerCategory, ConditionCatalogue, ConditionCoding, PrimaryCondition};
pub use parameters::SearchParameters;
pub use search_set::{SearchSet, SearchSetData};

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("structural error: {0}")]
    Structure(String),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;

/// Deserialize JSON text into `T`, reporting the failing field path on mismatch.
///
/// `what` names the document being parsed and prefixes the error message.
pub(crate) fn from_json_with_path<T>(json_text: &str, what: &str) -> FhirResult<T>
where
    T: serde::de::DeserializeOwned,
{
    let mut deserializer = serde_json::Deserializer::from_str(json_text);

    match serde_path_to_error::deserialize::<_, T>(&mut deserializer) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() || path == "." {
                "<root>"
            } else {
                path.as_str()
            };
            Err(FhirError::Translation(format!(
                "{what} schema mismatch at {path}: {source}"
            )))
        }
    }
}
