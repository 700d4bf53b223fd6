//! Whole-batch processing.
//!
//! Every file is classified independently and every order processed to a
//! terminal action; one unparseable filename never aborts the run. The
//! report carries a per-file and per-order breakdown so operators see
//! exactly which items need manual attention instead of a single pass/fail.

use crate::processors::{process_order, OrderOutcome};
use crate::resolver::resolve;
use ab1_set::filenames::{is_individual_blank, plate_blank_well};
use ab1_set::OrderIdentity;
use log::{info, warn};
use order_types::{Order, OrderAction, ReinjectState};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One line of the per-file breakdown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub raw: String,
    pub normalized: String,
    pub identity: OrderIdentity,
    pub reinject: ReinjectState,
}

/// The result of one batch pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub orders: Vec<OrderOutcome>,
    pub files: Vec<FileReport>,
    /// Raw names no order-identifier convention matched; for an operator.
    pub manual_review: Vec<String>,
}

impl BatchReport {
    pub fn actions(&self) -> impl Iterator<Item = &OrderAction> {
        self.orders.iter().map(|o| &o.action)
    }
}

/// Process every order in sequence. Orders share no state, so a failure to
/// recognize files in one cannot affect another.
pub fn process_batch(orders: &[Order], history: &HashSet<String>) -> BatchReport {
    let mut outcomes = Vec::with_capacity(orders.len());
    let mut files = Vec::new();
    let mut manual_review = Vec::new();

    for order in orders {
        for record in &order.received {
            let decision = resolve(record, history);
            files.push(FileReport {
                raw: record.raw.clone(),
                normalized: record.normalized.clone(),
                identity: record.identity.clone(),
                reinject: decision.state,
            });
            let is_blank =
                is_individual_blank(&record.raw) || plate_blank_well(&record.raw).is_some();
            if !record.identity.is_recognized() && !is_blank {
                warn!(
                    "'{}' matched no order-identifier convention; routed to manual review",
                    record.raw
                );
                manual_review.push(record.raw.clone());
            }
        }
        outcomes.push(process_order(order, history));
    }

    info!(
        "batch complete: {} orders, {} files, {} for manual review",
        outcomes.len(),
        files.len(),
        manual_review.len()
    );
    BatchReport {
        orders: outcomes,
        files,
        manual_review,
    }
}
