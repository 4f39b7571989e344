//! Parameter space enumeration.
//!
//! A run is planned up front as an ordered list of units of work. Ordering is fully
//! determined by the inputs so that a re-run with `--skip` visits the same units in the
//! same order and picks up exactly where an interrupted run stopped.
//!
//! Location sweeps iterate zip codes (outer), radii (middle) and records (inner).
//! Condition sweeps iterate catalogue codings in catalogue order.

use crate::constants::{BROAD_RADII, BROAD_ZIP_CODES, NARROW_RADIUS, NARROW_ZIP_CODE};
use crate::{SweepError, SweepResult};
use fhir::{CancerCategory, ConditionCatalogue, ConditionCoding, SearchParameters};
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// How much of the location space a loader run covers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SweepMode {
    /// A single default zip code and radius.
    #[default]
    Narrow,
    /// Every configured zip code crossed with every configured radius.
    Broad,
}

/// The sweep variables injected into one request.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Combination {
    Location(SearchParameters),
    Condition(ConditionCoding),
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combination::Location(params) => write!(
                f,
                "zip: {} | travel radius: {}",
                params.zip_code, params.travel_radius
            ),
            Combination::Condition(coding) => write!(f, "condition: {coding}"),
        }
    }
}

/// One (record, combination) pair requiring exactly one dispatch.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnitOfWork {
    /// Record name (file stem) for loader runs, service name for condition sweeps.
    pub record: String,
    pub combination: Combination,
}

impl fmt::Display for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.record, self.combination)
    }
}

/// Zip codes and radii for a loader run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocationSweep {
    zip_codes: Vec<String>,
    radii: Vec<String>,
}

impl LocationSweep {
    /// Built-in lists for `mode`.
    pub fn for_mode(mode: SweepMode) -> Self {
        match mode {
            SweepMode::Narrow => Self {
                zip_codes: vec![NARROW_ZIP_CODE.to_string()],
                radii: vec![NARROW_RADIUS.to_string()],
            },
            SweepMode::Broad => Self {
                zip_codes: dedup_in_order(BROAD_ZIP_CODES.iter().map(|z| z.to_string())),
                radii: dedup_in_order(BROAD_RADII.iter().map(|r| r.to_string())),
            },
        }
    }

    /// Custom lists. Repeated values keep their first position.
    ///
    /// # Errors
    ///
    /// Returns `SweepError::Config` if either list is empty or contains a blank value.
    pub fn new(zip_codes: Vec<String>, radii: Vec<String>) -> SweepResult<Self> {
        if zip_codes.is_empty() || radii.is_empty() {
            return Err(SweepError::Config(
                "location sweep needs at least one zip code and one radius".into(),
            ));
        }
        if zip_codes.iter().chain(radii.iter()).any(|v| v.trim().is_empty()) {
            return Err(SweepError::Config(
                "location sweep values cannot be blank".into(),
            ));
        }

        Ok(Self {
            zip_codes: dedup_in_order(zip_codes.into_iter().map(|z| z.trim().to_string())),
            radii: dedup_in_order(radii.into_iter().map(|r| r.trim().to_string())),
        })
    }

    pub fn zip_codes(&self) -> &[String] {
        &self.zip_codes
    }

    pub fn radii(&self) -> &[String] {
        &self.radii
    }

    /// Cross product of zip codes and radii; zip codes vary slowest.
    pub fn combinations(&self) -> Vec<Combination> {
        self.zip_codes
            .iter()
            .flat_map(|zip| {
                self.radii.iter().map(move |radius| {
                    Combination::Location(SearchParameters::new(zip.clone(), radius.clone()))
                })
            })
            .collect()
    }
}

/// Catalogue codings matching `category`, as combinations, in catalogue order.
///
/// A coding listed more than once keeps its first position.
pub fn condition_sweep(catalogue: &ConditionCatalogue, category: CancerCategory) -> Vec<Combination> {
    dedup_in_order(
        catalogue
            .codings_for(category)
            .into_iter()
            .map(Combination::Condition),
    )
}

/// Expand combinations over records: combinations vary slowest, records fastest.
pub fn plan_units<S: AsRef<str>>(combinations: &[Combination], records: &[S]) -> Vec<UnitOfWork> {
    combinations
        .iter()
        .flat_map(|combination| {
            records.iter().map(move |record| UnitOfWork {
                record: record.as_ref().to_string(),
                combination: combination.clone(),
            })
        })
        .collect()
}

fn dedup_in_order<T: Clone + Eq + Hash>(values: impl Iterator<Item = T>) -> Vec<T> {
    let mut seen = HashSet::new();
    values.filter(|v| seen.insert(v.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(zip: &str, radius: &str) -> Combination {
        Combination::Location(SearchParameters::new(zip, radius))
    }

    #[test]
    fn narrow_yields_exactly_one_default() {
        let combos = LocationSweep::for_mode(SweepMode::Narrow).combinations();
        assert_eq!(combos, vec![location("75001", "20")]);
    }

    #[test]
    fn broad_yields_full_cross_product_without_duplicates() {
        let sweep = LocationSweep::for_mode(SweepMode::Broad);
        let combos = sweep.combinations();

        assert_eq!(sweep.zip_codes().len(), 28);
        assert_eq!(combos.len(), sweep.zip_codes().len() * sweep.radii().len());

        let unique: HashSet<_> = combos.iter().collect();
        assert_eq!(unique.len(), combos.len());

        assert_eq!(combos[0], location("25438", "20"));
        assert_eq!(combos[1], location("25438", "50"));
        assert_eq!(combos[2], location("25438", "100"));
        assert_eq!(combos[3], location("26506", "20"));
        assert_eq!(combos.last(), Some(&location("75390", "100")));
    }

    #[test]
    fn enumeration_is_deterministic() {
        let a = LocationSweep::for_mode(SweepMode::Broad).combinations();
        let b = LocationSweep::for_mode(SweepMode::Broad).combinations();
        assert_eq!(a, b);
    }

    #[test]
    fn custom_sweep_orders_location_outer_radius_inner() {
        let sweep = LocationSweep::new(
            vec!["10001".into(), "94105".into()],
            vec!["20".into(), "50".into(), "100".into()],
        )
        .expect("valid sweep");
        let units = plan_units(&sweep.combinations(), &["patient-a"]);

        let order: Vec<_> = units
            .iter()
            .map(|u| match &u.combination {
                Combination::Location(p) => (p.zip_code.as_str(), p.travel_radius.as_str()),
                Combination::Condition(_) => unreachable!(),
            })
            .collect();
        assert_eq!(
            order,
            vec![
                ("10001", "20"),
                ("10001", "50"),
                ("10001", "100"),
                ("94105", "20"),
                ("94105", "50"),
                ("94105", "100"),
            ]
        );
    }

    #[test]
    fn custom_sweep_rejects_empty_lists() {
        assert!(LocationSweep::new(vec![], vec!["20".into()]).is_err());
        assert!(LocationSweep::new(vec!["1".into()], vec![" ".into()]).is_err());
    }

    #[test]
    fn records_vary_fastest() {
        let combos = vec![location("1", "20"), location("2", "20")];
        let units = plan_units(&combos, &["a", "b"]);

        let order: Vec<_> = units.iter().map(|u| u.to_string()).collect();
        assert_eq!(
            order,
            vec![
                "a | zip: 1 | travel radius: 20",
                "b | zip: 1 | travel radius: 20",
                "a | zip: 2 | travel radius: 20",
                "b | zip: 2 | travel radius: 20",
            ]
        );
    }

    #[test]
    fn condition_sweep_preserves_catalogue_order() {
        let catalogue = ConditionCatalogue::parse(
            r#"[
                { "code": "2", "display": "b", "cancerType": ["breast"] },
                { "code": "1", "display": "a", "cancerType": ["breast"] },
                { "code": "3", "display": "c", "cancerType": ["lung"] }
            ]"#,
        )
        .unwrap();

        let combos = condition_sweep(&catalogue, CancerCategory::Breast);
        let codes: Vec<_> = combos
            .iter()
            .map(|c| match c {
                Combination::Condition(coding) => coding.code.as_str(),
                Combination::Location(_) => unreachable!(),
            })
            .collect();
        assert_eq!(codes, vec!["2", "1"]);
    }

    #[test]
    fn condition_sweep_plans_a_repeated_coding_once() {
        let catalogue = ConditionCatalogue::parse(
            r#"[
                { "code": "1", "display": "A", "system": "s", "cancerType": "lung" },
                { "code": "2", "display": "B", "system": "s", "cancerType": ["lung"] },
                { "code": "1", "display": "A", "system": "s", "cancerType": ["lung", "brain"] }
            ]"#,
        )
        .unwrap();

        let combos = condition_sweep(&catalogue, CancerCategory::Lung);
        let units = plan_units(&combos, &["bct"]);

        let order: Vec<_> = units.iter().map(|u| u.to_string()).collect();
        assert_eq!(
            order,
            vec!["bct | condition: 1, A, s", "bct | condition: 2, B, s"]
        );
    }
}
