//! Expected-vs-received completeness checks.

use ab1_set::filenames::{is_individual_blank, plate_blank_well};
use ab1_set::WellPosition;
use order_types::{Order, OrderType, PlateSubtype};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// What a completeness check found. `missing` holds normalized sample
/// identities, or well tokens for plate orders; `unexpected` holds raw
/// filenames that nothing in the expected set accounts for. Unexpected files
/// are always reported — they mean either a mis-filed sample or a stale
/// manifest, and guessing which would hide both.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub complete: bool,
    pub missing: BTreeSet<String>,
    pub unexpected: BTreeSet<String>,
}

/// Validate one order. Individual and PCR orders are complete when the
/// received identity set covers the expected set; plate orders additionally
/// require every expected well position to be present.
pub fn validate(order: &Order) -> ValidationReport {
    match order.order_type {
        OrderType::Individual | OrderType::Pcr => validate_membership(order),
        OrderType::Plate => validate_plate(order),
    }
}

fn validate_membership(order: &Order) -> ValidationReport {
    let received: HashSet<String> = order
        .received
        .iter()
        .map(|r| r.normalized.clone())
        .collect();
    let expected: HashSet<String> = order.expected.iter().map(|e| e.normalized()).collect();

    let missing: BTreeSet<String> = expected.difference(&received).cloned().collect();
    let unexpected: BTreeSet<String> = order
        .received
        .iter()
        .filter(|r| !is_individual_blank(&r.raw))
        .filter(|r| !expected.contains(&r.normalized))
        .map(|r| r.raw.clone())
        .collect();

    ValidationReport {
        complete: missing.is_empty(),
        missing,
        unexpected,
    }
}

fn validate_plate(order: &Order) -> ValidationReport {
    let subtype = order
        .plate_subtype
        .unwrap_or(PlateSubtype::FullAnalysis);

    // Wells that produced a real trace vs. wells the instrument blanked out.
    let mut traced: HashSet<WellPosition> = HashSet::new();
    let mut blanked: HashSet<WellPosition> = HashSet::new();
    for record in &order.received {
        match plate_blank_well(&record.raw) {
            Some(well) => {
                blanked.insert(well);
            }
            None => {
                if let Some(well) = record.well {
                    traced.insert(well);
                }
            }
        }
    }

    let expected_names: HashSet<String> = order.expected.iter().map(|e| e.normalized()).collect();
    let expected_wells: HashSet<WellPosition> =
        order.expected.iter().filter_map(|e| e.well).collect();

    let mut missing = BTreeSet::new();
    for expected in &order.expected {
        match expected.well {
            Some(well) => {
                let satisfied = traced.contains(&well)
                    || (subtype == PlateSubtype::ReducedAnalysis && blanked.contains(&well));
                if !satisfied {
                    missing.insert(well.to_string());
                }
            }
            // Orders built outside the manifest loader may omit wells; fall
            // back to identity membership for those rows.
            None => {
                let name = expected.normalized();
                if !order.received.iter().any(|r| r.normalized == name) {
                    missing.insert(name);
                }
            }
        }
    }

    let unexpected: BTreeSet<String> = order
        .received
        .iter()
        .filter(|r| plate_blank_well(&r.raw).is_none())
        .filter(|r| match r.well {
            Some(well) => !expected_wells.contains(&well),
            None => !expected_names.contains(&r.normalized),
        })
        .map(|r| r.raw.clone())
        .collect();

    ValidationReport {
        complete: missing.is_empty(),
        missing,
        unexpected,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use order_types::{ExpectedSample, OrderSpec};
    use pretty_assertions::assert_eq;

    fn plate_spec(subtype: Option<PlateSubtype>, wells: &[&str]) -> OrderSpec {
        OrderSpec {
            order_id: "5011".to_string(),
            order_type: OrderType::Plate,
            plate_subtype: subtype,
            expected: wells
                .iter()
                .map(|w| ExpectedSample {
                    name: format!("colony_{w}"),
                    well: Some(w.parse().unwrap()),
                })
                .collect(),
        }
    }

    fn individual_spec(samples: &[&str]) -> OrderSpec {
        OrderSpec {
            order_id: "67890".to_string(),
            order_type: OrderType::Individual,
            plate_subtype: None,
            expected: samples
                .iter()
                .map(|s| ExpectedSample {
                    name: s.to_string(),
                    well: None,
                })
                .collect(),
        }
    }

    #[test]
    fn individual_order_complete_when_received_covers_expected() {
        let spec = individual_spec(&["bioi-1_alpha", "bioi-1_beta"]);
        let order = Order::from_listing(&spec, ["bioi-1_alpha.ab1", "bioi-1_beta.ab1"]);
        let report = validate(&order);
        assert!(report.complete);
        assert!(report.missing.is_empty());
        assert!(report.unexpected.is_empty());
    }

    #[test]
    fn missing_and_unexpected_are_both_surfaced() {
        let spec = individual_spec(&["bioi-1_alpha", "bioi-1_beta"]);
        let order = Order::from_listing(&spec, ["bioi-1_alpha.ab1", "bioi-2_stray.ab1"]);
        let report = validate(&order);
        assert!(!report.complete);
        assert_eq!(
            report.missing.iter().collect::<Vec<_>>(),
            vec!["bioi-1_beta"]
        );
        assert_eq!(
            report.unexpected.iter().collect::<Vec<_>>(),
            vec!["bioi-2_stray.ab1"]
        );
    }

    #[test]
    fn extra_files_do_not_block_completeness() {
        let spec = individual_spec(&["bioi-1_alpha"]);
        let order = Order::from_listing(&spec, ["bioi-1_alpha.ab1", "bioi-2_stray.ab1"]);
        let report = validate(&order);
        assert!(report.complete);
        assert_eq!(report.unexpected.len(), 1);
    }

    #[test]
    fn individual_blanks_are_not_unexpected() {
        let spec = individual_spec(&["bioi-1_alpha"]);
        let order = Order::from_listing(&spec, ["bioi-1_alpha.ab1", "{01A}.ab1"]);
        let report = validate(&order);
        assert!(report.unexpected.is_empty());
    }

    #[test]
    fn plate_completeness_is_positional() {
        let spec = plate_spec(None, &["A1", "A2", "B1", "B2"]);
        let order = Order::from_listing(
            &spec,
            ["P5011_{01A}c1.ab1", "P5011_{02A}c2.ab1", "P5011_{01B}c3.ab1"],
        );
        let report = validate(&order);
        assert!(!report.complete);
        assert_eq!(report.missing.iter().collect::<Vec<_>>(), vec!["B2"]);
    }

    #[test]
    fn blank_well_satisfies_reduced_analysis_only() {
        let listing = ["P5011_{01A}c1.ab1", "02A__.ab1"];

        let reduced = plate_spec(Some(PlateSubtype::ReducedAnalysis), &["A1", "A2"]);
        let report = validate(&Order::from_listing(&reduced, listing));
        assert!(report.complete);

        let full = plate_spec(Some(PlateSubtype::FullAnalysis), &["A1", "A2"]);
        let report = validate(&Order::from_listing(&full, listing));
        assert!(!report.complete);
        assert_eq!(report.missing.iter().collect::<Vec<_>>(), vec!["A2"]);
    }

    #[test]
    fn off_plate_wells_are_unexpected() {
        let spec = plate_spec(None, &["A1"]);
        let order = Order::from_listing(&spec, ["P5011_{01A}c1.ab1", "P5011_{05C}stray.ab1"]);
        let report = validate(&order);
        assert!(report.complete);
        assert_eq!(
            report.unexpected.iter().collect::<Vec<_>>(),
            vec!["P5011_{05C}stray.ab1"]
        );
    }
}
