//! Run accumulator.
//!
//! Collects every outcome of a run for end-of-run reporting. Responses are bucketed by
//! HTTP status in the order statuses are first seen; timeouts and connection failures go
//! to a separate failure list. Each unit can be recorded once.
//!
//! Invariant: entries across all buckets plus failures equal the number of dispatched
//! units.

use crate::constants::SEPARATOR;
use crate::dispatch::Outcome;
use crate::plan::UnitOfWork;
use crate::{SweepError, SweepResult};
use std::collections::HashSet;
use std::fmt::Write as _;

/// Where an outcome is filed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bucket {
    Status(u16),
    Failures,
}

impl Bucket {
    pub fn for_outcome(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Matches { status, .. }
            | Outcome::NoMatches { status }
            | Outcome::ServiceError { status, .. } => Bucket::Status(*status),
            Outcome::Timeout | Outcome::ConnectionFailure { .. } => Bucket::Failures,
        }
    }
}

/// A unit that received a response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseEntry {
    pub unit: UnitOfWork,
    pub total: u64,
    /// Match identifiers in response order; empty unless the service reported matches.
    pub identifiers: Vec<String>,
}

/// All units that received the same HTTP status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusBucket {
    pub status: u16,
    pub entries: Vec<ResponseEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    ConnectionFailure(String),
}

/// A unit that never received a response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailedUnit {
    pub unit: UnitOfWork,
    pub kind: FailureKind,
}

#[derive(Debug, Default)]
pub struct RunAccumulator {
    buckets: Vec<StatusBucket>,
    failures: Vec<FailedUnit>,
    recorded: HashSet<UnitOfWork>,
    enumerated: usize,
    skipped: usize,
    flushed: bool,
}

impl RunAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a unit as visited by the run, whether or not it is dispatched.
    pub fn note_enumerated(&mut self) {
        self.enumerated += 1;
    }

    /// Counts a unit skipped because its report already exists.
    pub fn note_skipped(&mut self) {
        self.skipped += 1;
    }

    /// Files `outcome` for `unit`.
    ///
    /// # Errors
    ///
    /// Returns `SweepError::DuplicateUnit` if `unit` was already recorded; the earlier
    /// entry is left untouched.
    pub fn record(&mut self, unit: &UnitOfWork, outcome: Outcome) -> SweepResult<()> {
        if !self.recorded.insert(unit.clone()) {
            return Err(SweepError::DuplicateUnit(unit.to_string()));
        }

        let total = outcome.total();
        match Bucket::for_outcome(&outcome) {
            Bucket::Failures => {
                let kind = match outcome {
                    Outcome::ConnectionFailure { reason } => FailureKind::ConnectionFailure(reason),
                    _ => FailureKind::Timeout,
                };
                self.failures.push(FailedUnit {
                    unit: unit.clone(),
                    kind,
                });
            }
            Bucket::Status(status) => {
                let identifiers = match outcome {
                    Outcome::Matches { results, .. } => results.identifiers,
                    _ => Vec::new(),
                };
                self.bucket_mut(status).entries.push(ResponseEntry {
                    unit: unit.clone(),
                    total,
                    identifiers,
                });
            }
        }
        Ok(())
    }

    fn bucket_mut(&mut self, status: u16) -> &mut StatusBucket {
        let index = match self.buckets.iter().position(|b| b.status == status) {
            Some(index) => index,
            None => {
                self.buckets.push(StatusBucket {
                    status,
                    entries: Vec::new(),
                });
                self.buckets.len() - 1
            }
        };
        &mut self.buckets[index]
    }

    /// Status buckets in first-seen order.
    pub fn buckets(&self) -> &[StatusBucket] {
        &self.buckets
    }

    pub fn bucket(&self, status: u16) -> Option<&StatusBucket> {
        self.buckets.iter().find(|b| b.status == status)
    }

    pub fn failures(&self) -> &[FailedUnit] {
        &self.failures
    }

    pub fn timeouts(&self) -> impl Iterator<Item = &FailedUnit> {
        self.failures
            .iter()
            .filter(|f| matches!(f.kind, FailureKind::Timeout))
    }

    pub fn connection_failures(&self) -> impl Iterator<Item = &FailedUnit> {
        self.failures
            .iter()
            .filter(|f| matches!(f.kind, FailureKind::ConnectionFailure(_)))
    }

    /// Responses with a non-success status, across buckets.
    pub fn service_errors(&self) -> impl Iterator<Item = (u16, &ResponseEntry)> {
        self.buckets
            .iter()
            .filter(|b| !(200..300).contains(&b.status))
            .flat_map(|b| b.entries.iter().map(move |e| (b.status, e)))
    }

    pub fn enumerated(&self) -> usize {
        self.enumerated
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn dispatched(&self) -> usize {
        self.recorded.len()
    }

    pub fn error_count(&self) -> usize {
        self.failures.len() + self.service_errors().count()
    }

    /// End-of-run summary, or `None` when the run visited no units.
    pub fn summary(&self) -> Option<String> {
        if self.enumerated == 0 {
            return None;
        }

        let errors = self.error_count();
        let mut out = String::new();
        let _ = writeln!(out, "{SEPARATOR}");
        if self.skipped > 0 {
            let _ = writeln!(
                out,
                "Skipped {} of {} records due to prior existence.",
                self.skipped, self.enumerated
            );
        }
        let _ = writeln!(
            out,
            "There were {errors} errors out of {} records run.",
            self.enumerated
        );

        if errors > 0 {
            let _ = writeln!(out, "{SEPARATOR}");
            for (status, entry) in self.service_errors() {
                let _ = writeln!(out, "{}: service error (status {status})", entry.unit);
            }
            for failure in &self.failures {
                match &failure.kind {
                    FailureKind::Timeout => {
                        let _ = writeln!(out, "{}: timeout", failure.unit);
                    }
                    FailureKind::ConnectionFailure(reason) => {
                        let _ = writeln!(out, "{}: connection failure ({reason})", failure.unit);
                    }
                }
            }
            let _ = writeln!(out, "{SEPARATOR}");
        }

        Some(out)
    }

    /// Returns the summary the first time it is called and `None` afterwards.
    pub fn take_summary(&mut self) -> Option<String> {
        if self.flushed {
            return None;
        }
        self.flushed = true;
        self.summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Combination;
    use fhir::{SearchParameters, SearchSetData};

    fn unit(record: &str, zip: &str) -> UnitOfWork {
        UnitOfWork {
            record: record.into(),
            combination: Combination::Location(SearchParameters::new(zip, "20")),
        }
    }

    fn matched(ids: &[&str]) -> Outcome {
        Outcome::Matches {
            status: 200,
            results: SearchSetData {
                total: ids.len() as u64,
                identifiers: ids.iter().map(|s| s.to_string()).collect(),
            },
        }
    }

    #[test]
    fn buckets_by_status_in_first_seen_order() {
        let mut acc = RunAccumulator::new();
        acc.record(&unit("a", "1"), Outcome::ServiceError { status: 500, total: 0 })
            .unwrap();
        acc.record(&unit("b", "1"), matched(&["NCT1", "NCT2", "NCT3"]))
            .unwrap();
        acc.record(&unit("c", "1"), Outcome::NoMatches { status: 200 })
            .unwrap();

        let statuses: Vec<_> = acc.buckets().iter().map(|b| b.status).collect();
        assert_eq!(statuses, vec![500, 200]);

        let ok = acc.bucket(200).unwrap();
        assert_eq!(ok.entries.len(), 2);
        assert_eq!(ok.entries[0].identifiers, vec!["NCT1", "NCT2", "NCT3"]);
        assert_eq!(ok.entries[1].total, 0);
        assert!(ok.entries[1].identifiers.is_empty());
    }

    #[test]
    fn failures_are_kept_apart_from_buckets() {
        let mut acc = RunAccumulator::new();
        acc.record(&unit("a", "1"), Outcome::Timeout).unwrap();
        acc.record(
            &unit("a", "2"),
            Outcome::ConnectionFailure {
                reason: "refused".into(),
            },
        )
        .unwrap();

        assert!(acc.buckets().is_empty());
        assert_eq!(acc.timeouts().count(), 1);
        assert_eq!(acc.connection_failures().count(), 1);
        assert_eq!(acc.error_count(), 2);
    }

    #[test]
    fn entry_count_matches_dispatched_units() {
        let mut acc = RunAccumulator::new();
        let outcomes = [
            matched(&["NCT9"]),
            Outcome::NoMatches { status: 200 },
            Outcome::ServiceError { status: 503, total: 0 },
            Outcome::Timeout,
        ];
        for (i, outcome) in outcomes.into_iter().enumerate() {
            acc.record(&unit("r", &i.to_string()), outcome).unwrap();
        }

        let bucketed: usize = acc.buckets().iter().map(|b| b.entries.len()).sum();
        assert_eq!(bucketed + acc.failures().len(), acc.dispatched());
        assert_eq!(acc.dispatched(), 4);
    }

    #[test]
    fn recording_a_unit_twice_is_rejected() {
        let mut acc = RunAccumulator::new();
        acc.record(&unit("a", "1"), matched(&["NCT1"])).unwrap();

        let err = acc
            .record(&unit("a", "1"), Outcome::Timeout)
            .expect_err("second record");
        assert!(matches!(err, SweepError::DuplicateUnit(_)));
        assert!(acc.failures().is_empty());
        assert_eq!(acc.bucket(200).unwrap().entries[0].identifiers, vec!["NCT1"]);
    }

    #[test]
    fn summary_counts_errors_over_enumerated_units() {
        let mut acc = RunAccumulator::new();
        for _ in 0..2 {
            acc.note_enumerated();
        }
        acc.record(&unit("a", "1"), Outcome::NoMatches { status: 200 })
            .unwrap();
        acc.record(&unit("b", "1"), Outcome::NoMatches { status: 200 })
            .unwrap();

        let summary = acc.summary().unwrap();
        assert!(summary.contains("There were 0 errors out of 2 records run."));
        assert!(!summary.contains("timeout"));
    }

    #[test]
    fn summary_itemises_failures() {
        let mut acc = RunAccumulator::new();
        acc.note_enumerated();
        acc.note_enumerated();
        acc.record(&unit("a", "1"), Outcome::Timeout).unwrap();
        acc.record(&unit("b", "1"), Outcome::ServiceError { status: 502, total: 0 })
            .unwrap();

        let summary = acc.summary().unwrap();
        assert!(summary.contains("There were 2 errors out of 2 records run."));
        assert!(summary.contains("a | zip: 1 | travel radius: 20: timeout"));
        assert!(summary.contains("b | zip: 1 | travel radius: 20: service error (status 502)"));
    }

    #[test]
    fn take_summary_fires_once_and_not_for_empty_runs() {
        let mut empty = RunAccumulator::new();
        assert_eq!(empty.take_summary(), None);

        let mut acc = RunAccumulator::new();
        acc.note_enumerated();
        assert!(acc.take_summary().is_some());
        assert_eq!(acc.take_summary(), None);
    }
}
