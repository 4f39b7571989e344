//! Dispatch engine.
//!
//! Submits one request at a time to the matching service and classifies what came back.
//! Expected failure classes never escape as errors:
//! - transport timeout → [`Outcome::Timeout`]
//! - service unreachable → [`Outcome::ConnectionFailure`]
//! - non-success status → [`Outcome::ServiceError`]
//! - success with `total == 0` (or no `total`) → [`Outcome::NoMatches`]
//!
//! Each contained failure prints a one-line diagnostic to stdout alongside its log event.
//!
//! A success response whose body cannot be read as a search set, or a transport failure
//! that is neither a timeout nor a connection failure, is returned as `Err` and ends the
//! run.

use crate::plan::UnitOfWork;
use crate::{SweepError, SweepResult};
use fhir::{SearchSet, SearchSetData};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::time::Duration;

/// Raw response from the matching service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("{0}")]
    Other(String),
}

/// Sends a JSON document to a URL and returns the raw response.
///
/// Implementations must block until the response arrives or their own timeout fires.
pub trait Transport {
    fn post_json(&self, url: &str, body: String) -> Result<TransportResponse, TransportError>;
}

/// Blocking HTTP transport with a fixed per-request timeout.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Creates a transport whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `SweepError::HttpClient` if the underlying client cannot be built.
    pub fn new(timeout: Duration) -> SweepResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SweepError::HttpClient)?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn post_json(&self, url: &str, body: String) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(classify_reqwest_error)?;

        let status = response.status().as_u16();
        let body = response.text().map_err(classify_reqwest_error)?;
        Ok(TransportResponse { status, body })
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

/// Classified result of dispatching one unit of work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Success status with at least one match.
    Matches { status: u16, results: SearchSetData },
    /// Success status with no matches.
    NoMatches { status: u16 },
    /// Non-success status. `total` is read from the body when it has one, else `0`.
    ServiceError { status: u16, total: u64 },
    Timeout,
    ConnectionFailure { reason: String },
}

impl Outcome {
    /// HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Outcome::Matches { status, .. }
            | Outcome::NoMatches { status }
            | Outcome::ServiceError { status, .. } => Some(*status),
            Outcome::Timeout | Outcome::ConnectionFailure { .. } => None,
        }
    }

    /// Number of matches the service reported.
    pub fn total(&self) -> u64 {
        match self {
            Outcome::Matches { results, .. } => results.total,
            Outcome::ServiceError { total, .. } => *total,
            Outcome::NoMatches { .. } | Outcome::Timeout | Outcome::ConnectionFailure { .. } => 0,
        }
    }

    /// One-line diagnostic for a per-unit failure, `None` when the service answered with
    /// a success status.
    pub fn diagnostic(&self, unit: &UnitOfWork) -> Option<String> {
        match self {
            Outcome::ServiceError { status, .. } => {
                Some(format!("{unit}: service error (status {status})"))
            }
            Outcome::Timeout => Some(format!("{unit}: timeout")),
            Outcome::ConnectionFailure { reason } => {
                Some(format!("{unit}: connection failure ({reason})"))
            }
            Outcome::Matches { .. } | Outcome::NoMatches { .. } => None,
        }
    }

    /// True for outcomes counted as errors in the run summary.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Outcome::ServiceError { .. } | Outcome::Timeout | Outcome::ConnectionFailure { .. }
        )
    }
}

fn contained(unit: &UnitOfWork, outcome: Outcome) -> Outcome {
    if let Some(line) = outcome.diagnostic(unit) {
        println!("{line}");
    }
    outcome
}

/// Sequential dispatcher bound to one service URL.
pub struct DispatchEngine<T: Transport> {
    transport: T,
    url: String,
}

impl<T: Transport> DispatchEngine<T> {
    pub fn new(transport: T, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Submits `request` for `unit` and classifies the result.
    ///
    /// # Errors
    ///
    /// Returns `SweepError::MalformedResponse` when a success body is not a search set,
    /// and `SweepError::Transport` for unclassified transport failures.
    pub fn dispatch(&self, unit: &UnitOfWork, request: &Value) -> SweepResult<Outcome> {
        let body = serde_json::to_string(request).map_err(SweepError::RequestSerialization)?;

        let response = match self.transport.post_json(&self.url, body) {
            Ok(response) => response,
            Err(TransportError::Timeout) => {
                tracing::warn!("There was a timeout with sending this record ({unit}) to the wrapper");
                return Ok(contained(unit, Outcome::Timeout));
            }
            Err(TransportError::Connect(reason)) => {
                tracing::warn!(
                    "There was a connection error with sending this record ({unit}) to the wrapper"
                );
                return Ok(contained(unit, Outcome::ConnectionFailure { reason }));
            }
            Err(TransportError::Other(reason)) => return Err(SweepError::Transport(reason)),
        };

        if !response.is_success() {
            tracing::warn!(
                "There was an issue with sending this record ({unit}) to the wrapper: status {}",
                response.status
            );
            return Ok(contained(
                unit,
                Outcome::ServiceError {
                    status: response.status,
                    total: SearchSet::total_or_zero(&response.body),
                },
            ));
        }

        let results = SearchSet::parse(&response.body).map_err(SweepError::MalformedResponse)?;
        if results.has_matches() {
            tracing::debug!("{unit}: {} matches", results.total);
            Ok(Outcome::Matches {
                status: response.status,
                results,
            })
        } else {
            tracing::debug!("{unit}: no matches");
            Ok(Outcome::NoMatches {
                status: response.status,
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted in-memory transport for exercising the engine without a network.

    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replies from a script, then with an empty search set once the script runs out.
    #[derive(Default)]
    pub(crate) struct ScriptedTransport {
        replies: RefCell<VecDeque<Result<TransportResponse, TransportError>>>,
        calls: RefCell<Vec<(String, Value)>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(
            replies: impl IntoIterator<Item = Result<TransportResponse, TransportError>>,
        ) -> Self {
            Self {
                replies: RefCell::new(replies.into_iter().collect()),
                calls: RefCell::default(),
            }
        }

        pub(crate) fn calls(&self) -> Vec<(String, Value)> {
            self.calls.borrow().clone()
        }
    }

    impl Transport for ScriptedTransport {
        fn post_json(&self, url: &str, body: String) -> Result<TransportResponse, TransportError> {
            let parsed = serde_json::from_str(&body).expect("request body is JSON");
            self.calls.borrow_mut().push((url.to_string(), parsed));
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(empty()))
        }
    }

    pub(crate) fn empty() -> TransportResponse {
        TransportResponse::new(200, r#"{ "resourceType": "Bundle", "total": 0 }"#)
    }

    pub(crate) fn matches(ids: &[&str]) -> TransportResponse {
        let entries: Vec<Value> = ids
            .iter()
            .map(|id| serde_json::json!({ "resource": { "identifier": [{ "value": id }] } }))
            .collect();
        TransportResponse::new(
            200,
            serde_json::json!({ "total": ids.len(), "entry": entries }).to_string(),
        )
    }
}
