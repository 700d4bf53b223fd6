//! Core data model for sequencing orders: order types, expected and received
//! sample sets, reinjection decisions, and the terminal actions handed to the
//! file-operations layer.

use ab1_set::{SampleFilenameRecord, WellPosition};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumString};
use thiserror::Error;

pub mod manifest;

pub use manifest::{load_order_manifest, load_reinject_list, OrderSpec};

/// The three order conventions the lab runs.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Individual,
    Plate,
    Pcr,
}

/// Plate orders come in two analysis flavors with different completeness
/// rules.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum PlateSubtype {
    /// Every expected well must produce a real trace.
    FullAnalysis,
    /// A well may instead be explicitly blanked out by the instrument
    /// (`01A__.ab1`).
    ReducedAnalysis,
}

/// One sample the order paperwork says should arrive. Supplied externally;
/// the pipeline never infers what should exist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedSample {
    pub name: String,
    /// Required for plate orders, absent otherwise.
    pub well: Option<WellPosition>,
}

impl ExpectedSample {
    /// Canonical identity used when matching received files.
    pub fn normalized(&self) -> String {
        ab1_set::normalize(&self.name, true)
    }
}

/// An order mid-pass: what the paperwork expects plus what a folder scan
/// actually found. The received set is rebuilt wholesale on every scan,
/// never patched incrementally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub order_type: OrderType,
    pub plate_subtype: Option<PlateSubtype>,
    pub expected: Vec<ExpectedSample>,
    pub received: Vec<SampleFilenameRecord>,
}

impl Order {
    /// Build an order from its manifest spec and a folder listing.
    pub fn from_listing<'a>(
        spec: &OrderSpec,
        filenames: impl IntoIterator<Item = &'a str>,
    ) -> Order {
        Order {
            order_id: spec.order_id.clone(),
            order_type: spec.order_type,
            plate_subtype: spec.plate_subtype,
            expected: spec.expected.clone(),
            received: filenames
                .into_iter()
                .map(SampleFilenameRecord::parse)
                .collect(),
        }
    }
}

/// Outcome of reinjection resolution for one sample.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReinjectState {
    NoActionNeeded,
    /// Normalized identity appears on the historical reinject list.
    Standard,
    /// `{!P}`-flagged in the filename; wins over history.
    Preemptive,
}

/// Per-sample reinjection decision, recomputed fresh on every pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReinjectDecision {
    pub state: ReinjectState,
    /// Operator-facing explanation of which rule fired.
    pub reason: String,
}

impl ReinjectDecision {
    pub fn needs_reinject(&self) -> bool {
        !matches!(self.state, ReinjectState::NoActionNeeded)
    }
}

/// Terminal action for a processed order. This is the only thing the
/// pipeline hands to the file-operations layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OrderAction {
    /// Complete with no reinjects outstanding: package for delivery.
    Archive {
        order_id: String,
        files: Vec<String>,
    },
    /// Complete, but samples are flagged for reinjection.
    HoldReinject {
        order_id: String,
        flagged: Vec<String>,
    },
    /// The expected sample set has not fully arrived.
    NotReady {
        order_id: String,
        missing: Vec<String>,
    },
}

impl OrderAction {
    pub fn order_id(&self) -> &str {
        match self {
            OrderAction::Archive { order_id, .. }
            | OrderAction::HoldReinject { order_id, .. }
            | OrderAction::NotReady { order_id, .. } => order_id,
        }
    }
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderAction::Archive { order_id, files } => {
                write!(f, "archive order {order_id} ({} files)", files.len())
            }
            OrderAction::HoldReinject { order_id, flagged } => {
                write!(
                    f,
                    "hold order {order_id} for reinjection ({} flagged)",
                    flagged.len()
                )
            }
            OrderAction::NotReady { order_id, missing } => {
                write!(f, "order {order_id} not ready ({} missing)", missing.len())
            }
        }
    }
}

/// Failures while reading the externally supplied order inputs.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order manifest '{path}' is missing required column '{column}'")]
    ManifestMissingColumn { path: String, column: String },
    #[error("order manifest '{path}' line {line}: {message}")]
    ManifestField {
        path: String,
        line: usize,
        message: String,
    },
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    #[test]
    fn order_type_round_trips_through_strings() {
        assert_eq!(OrderType::from_str("plate").unwrap(), OrderType::Plate);
        assert_eq!(OrderType::from_str("PCR").unwrap(), OrderType::Pcr);
        assert_eq!(OrderType::Individual.to_string(), "individual");
        assert!(OrderType::from_str("96well").is_err());
    }

    #[test]
    fn expected_sample_matches_on_normalized_identity() {
        let expected = ExpectedSample {
            name: "Sample One+Control".to_string(),
            well: None,
        };
        assert_eq!(expected.normalized(), "sampleone&control");
    }

    #[test]
    fn received_set_is_rebuilt_per_listing() {
        let spec = OrderSpec {
            order_id: "67890".to_string(),
            order_type: OrderType::Individual,
            plate_subtype: None,
            expected: vec![],
        };
        let first = Order::from_listing(&spec, ["bioi-1_a.ab1"]);
        let second = Order::from_listing(&spec, ["bioi-1_b.ab1"]);
        assert_eq!(first.received.len(), 1);
        assert_eq!(second.received[0].raw, "bioi-1_b.ab1");
    }
}
