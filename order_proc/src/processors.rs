//! Per-order-type processing policy.
//!
//! Order types are an explicit tag selecting grouping and completeness rules
//! (the rule table lives here and in `validator`), rather than a class
//! hierarchy; each processor composes the normalizer, resolver, and
//! validator over immutable inputs and returns a terminal action.

use crate::resolver::resolve;
use crate::validator::{validate, ValidationReport};
use ab1_set::filenames::{is_individual_blank, plate_blank_well};
use ab1_set::{OrderIdentity, SampleFilenameRecord};
use itertools::Itertools;
use order_types::{Order, OrderAction, OrderType, ReinjectDecision};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One received sample's reinjection verdict.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleDecision {
    pub file: String,
    pub normalized: String,
    pub decision: ReinjectDecision,
}

/// Everything decided about one order in one pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderOutcome {
    pub order_id: String,
    pub order_type: OrderType,
    pub validation: ValidationReport,
    pub decisions: Vec<SampleDecision>,
    pub action: OrderAction,
}

impl OrderOutcome {
    /// An order is reinject-clean only if every contained sample resolved to
    /// no action needed.
    pub fn reinject_clean(&self) -> bool {
        self.decisions.iter().all(|d| !d.decision.needs_reinject())
    }
}

/// Run the full pipeline for one order and decide its terminal action:
/// `Archive` when complete and reinject-clean, `HoldReinject` when complete
/// with flagged samples, `NotReady` otherwise.
pub fn process_order(order: &Order, history: &HashSet<String>) -> OrderOutcome {
    let validation = validate(order);

    // Blank/control files are instrument artifacts; they are never
    // candidates for reinjection.
    let decisions: Vec<SampleDecision> = order
        .received
        .iter()
        .filter(|r| !is_individual_blank(&r.raw) && plate_blank_well(&r.raw).is_none())
        .map(|r| SampleDecision {
            file: r.raw.clone(),
            normalized: r.normalized.clone(),
            decision: resolve(r, history),
        })
        .collect();

    let flagged: Vec<String> = decisions
        .iter()
        .filter(|d| d.decision.needs_reinject())
        .map(|d| d.file.clone())
        .collect();

    let action = if !validation.complete {
        OrderAction::NotReady {
            order_id: order.order_id.clone(),
            missing: validation.missing.iter().cloned().collect(),
        }
    } else if !flagged.is_empty() {
        OrderAction::HoldReinject {
            order_id: order.order_id.clone(),
            flagged,
        }
    } else {
        OrderAction::Archive {
            order_id: order.order_id.clone(),
            files: order.received.iter().map(|r| r.raw.clone()).sorted().collect(),
        }
    };

    OrderOutcome {
        order_id: order.order_id.clone(),
        order_type: order.order_type,
        validation,
        decisions,
        action,
    }
}

/// Records from one folder listing, grouped by the order each belongs to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupedRecords {
    /// Keyed by I-number.
    pub individual: BTreeMap<String, Vec<SampleFilenameRecord>>,
    /// Keyed by P-number.
    pub plate: BTreeMap<String, Vec<SampleFilenameRecord>>,
    /// Keyed by PCR experiment number.
    pub pcr: BTreeMap<String, Vec<SampleFilenameRecord>>,
    /// Manual-review bucket.
    pub unrecognized: Vec<SampleFilenameRecord>,
}

/// Group parsed records by order identity. Unrecognized records are kept,
/// not dropped — the batch report surfaces them.
pub fn group_by_order(records: &[SampleFilenameRecord]) -> GroupedRecords {
    let mut grouped = GroupedRecords::default();
    for record in records {
        let bucket = match &record.identity {
            OrderIdentity::Individual(n) => grouped.individual.entry(n.clone()),
            OrderIdentity::Plate(n) => grouped.plate.entry(n.clone()),
            OrderIdentity::Pcr(n) => grouped.pcr.entry(n.clone()),
            OrderIdentity::Unrecognized(_) => {
                grouped.unrecognized.push(record.clone());
                continue;
            }
        };
        bucket.or_default().push(record.clone());
    }
    grouped
}

#[cfg(test)]
mod test {
    use super::*;
    use order_types::{ExpectedSample, OrderSpec, ReinjectState};
    use pretty_assertions::assert_eq;

    fn spec(samples: &[&str]) -> OrderSpec {
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
    fn complete_clean_order_archives() {
        let order = Order::from_listing(&spec(&["bioi-1_a"]), ["bioi-1_a.ab1"]);
        let outcome = process_order(&order, &HashSet::new());
        assert!(outcome.reinject_clean());
        assert_eq!(
            outcome.action,
            OrderAction::Archive {
                order_id: "67890".to_string(),
                files: vec!["bioi-1_a.ab1".to_string()],
            }
        );
    }

    #[test]
    fn complete_order_with_flags_holds_for_reinjection() {
        let order = Order::from_listing(
            &spec(&["bioi-1_a", "bioi-1_{!p}_b"]),
            ["bioi-1_a.ab1", "bioi-1_{!P}_b.ab1"],
        );
        let outcome = process_order(&order, &HashSet::new());
        assert!(!outcome.reinject_clean());
        let OrderAction::HoldReinject { flagged, .. } = &outcome.action else {
            panic!("expected hold-reinject, got {:?}", outcome.action);
        };
        assert_eq!(flagged, &vec!["bioi-1_{!P}_b.ab1".to_string()]);
    }

    #[test]
    fn incomplete_order_is_not_ready_even_with_flags() {
        let order = Order::from_listing(
            &spec(&["bioi-1_a", "bioi-1_b"]),
            ["bioi-1_{!P}_a.ab1"],
        );
        let outcome = process_order(&order, &HashSet::new());
        let OrderAction::NotReady { missing, .. } = &outcome.action else {
            panic!("expected not-ready, got {:?}", outcome.action);
        };
        assert!(missing.contains(&"bioi-1_b".to_string()));
    }

    #[test]
    fn history_marks_standard_reinjects() {
        let order = Order::from_listing(&spec(&["bioi-1_a"]), ["bioi-1_a.ab1"]);
        let history: HashSet<String> = ["bioi-1_a".to_string()].into_iter().collect();
        let outcome = process_order(&order, &history);
        assert_eq!(outcome.decisions[0].decision.state, ReinjectState::Standard);
        assert!(matches!(outcome.action, OrderAction::HoldReinject { .. }));
    }

    #[test]
    fn pcr_files_group_by_experiment_number() {
        let records: Vec<SampleFilenameRecord> = [
            "{pcr7exp-run1}.fsa",
            "{pcr7exp-run2}.fsa",
            "{pcr8exp-run1}.fsa",
        ]
        .iter()
        .map(|name| SampleFilenameRecord::parse(name))
        .collect();
        let grouped = group_by_order(&records);
        assert_eq!(grouped.pcr.len(), 2);
        assert_eq!(grouped.pcr["7"].len(), 2);
        assert_eq!(grouped.pcr["8"].len(), 1);
        assert!(grouped.unrecognized.is_empty());
    }

    #[test]
    fn unrecognized_records_stay_visible_in_grouping() {
        let records = vec![
            SampleFilenameRecord::parse("bioi-12_a.ab1"),
            SampleFilenameRecord::parse("{01A}Sample1_KseqF.ab1"),
        ];
        let grouped = group_by_order(&records);
        assert_eq!(grouped.individual["12"].len(), 1);
        assert_eq!(grouped.unrecognized.len(), 1);
        assert_eq!(grouped.unrecognized[0].raw, "{01A}Sample1_KseqF.ab1");
    }
}
