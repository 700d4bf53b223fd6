//! Loaders for the two externally supplied order inputs.
//!
//! The order manifest is a CSV exported from the order system, one row per
//! expected sample, with required columns `order_id`, `order_type`, and
//! `sample_name` plus optional `well` (required for plate rows) and
//! `subtype`. The historical reinject list is a flat text file with one
//! previously flagged identity per line; blank lines and `#` comments are
//! tolerated. Errors name the file, line, and column so an operator can fix
//! the input without reading code.

use crate::{ExpectedSample, OrderError, OrderType, PlateSubtype};
use anyhow::{Context, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::str::FromStr;

/// Columns every manifest must carry.
pub const REQUIRED_COLUMNS: &[&str] = &["order_id", "order_type", "sample_name"];

/// One order's worth of manifest rows: identity, type, and expected samples.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub order_id: String,
    pub order_type: OrderType,
    pub plate_subtype: Option<PlateSubtype>,
    pub expected: Vec<ExpectedSample>,
}

/// Load and validate the order manifest at `path`.
pub fn load_order_manifest(path: &Path) -> Result<Vec<OrderSpec>> {
    let file = File::open(path).with_context(|| path.display().to_string())?;
    read_order_manifest(BufReader::new(file), &path.display().to_string())
}

/// Parse a manifest from any reader; `path` is used in error messages only.
pub fn read_order_manifest(reader: impl Read, path: &str) -> Result<Vec<OrderSpec>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut headers = rdr
        .headers()
        .with_context(|| format!("reading order manifest '{path}'"))?
        .clone();
    headers.trim();
    let headers: Vec<String> = headers.iter().map(String::from).collect();
    for &required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h.as_str() == required) {
            return Err(OrderError::ManifestMissingColumn {
                path: path.to_string(),
                column: required.to_string(),
            }
            .into());
        }
    }
    let columns: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.as_str(), i))
        .collect();

    let mut specs: Vec<OrderSpec> = Vec::new();
    let mut by_order_id: HashMap<String, usize> = HashMap::new();

    for (i, row) in rdr.records().enumerate() {
        // Header is line 1.
        let line = i + 2;
        let field_err = |message: String| OrderError::ManifestField {
            path: path.to_string(),
            line,
            message,
        };
        let mut row = row.with_context(|| format!("reading order manifest '{path}'"))?;
        row.trim();
        let get = |name: &str| {
            columns
                .get(name)
                .and_then(|&i| row.get(i))
                .unwrap_or("")
                .trim()
        };

        let order_id = get("order_id");
        if order_id.is_empty() {
            return Err(field_err("empty 'order_id' value".to_string()).into());
        }
        let order_type = OrderType::from_str(get("order_type")).map_err(|_| {
            field_err(format!(
                "unknown order type '{}' (expected one of: {})",
                get("order_type"),
                [OrderType::Individual, OrderType::Plate, OrderType::Pcr]
                    .iter()
                    .join(", ")
            ))
        })?;
        let sample_name = get("sample_name");
        if sample_name.is_empty() {
            return Err(field_err("empty 'sample_name' value".to_string()).into());
        }

        let well = match get("well") {
            "" => None,
            token => Some(token.parse().map_err(|_| {
                field_err(format!(
                    "'{token}' is not a well position (expected e.g. 'A1' or '01A')"
                ))
            })?),
        };
        if order_type == OrderType::Plate && well.is_none() {
            return Err(field_err(format!(
                "plate sample '{sample_name}' has no 'well' value; \
                 plate completeness is positional"
            ))
            .into());
        }

        let plate_subtype = match (order_type, get("subtype")) {
            (OrderType::Plate, "") => None,
            (OrderType::Plate, token) => Some(PlateSubtype::from_str(token).map_err(|_| {
                field_err(format!(
                    "unknown plate subtype '{token}' (expected full_analysis or reduced_analysis)"
                ))
            })?),
            _ => None,
        };

        let expected = ExpectedSample {
            name: sample_name.to_string(),
            well,
        };
        match by_order_id.get(order_id) {
            Some(&at) => {
                let spec = &mut specs[at];
                if spec.order_type != order_type {
                    return Err(field_err(format!(
                        "order '{order_id}' listed as both '{}' and '{order_type}'",
                        spec.order_type
                    ))
                    .into());
                }
                if spec.plate_subtype.is_none() {
                    spec.plate_subtype = plate_subtype;
                }
                spec.expected.push(expected);
            }
            None => {
                by_order_id.insert(order_id.to_string(), specs.len());
                specs.push(OrderSpec {
                    order_id: order_id.to_string(),
                    order_type,
                    plate_subtype,
                    expected: vec![expected],
                });
            }
        }
    }
    Ok(specs)
}

/// Load the historical reinject list: one previously flagged identity per
/// line, normalized on the way in so lookups are exact.
pub fn load_reinject_list(path: &Path) -> Result<HashSet<String>> {
    let file = File::open(path).with_context(|| path.display().to_string())?;
    read_reinject_list(BufReader::new(file))
}

/// Parse a reinject list from any buffered reader.
pub fn read_reinject_list(reader: impl BufRead) -> Result<HashSet<String>> {
    let mut history = HashSet::new();
    for line in reader.lines() {
        let line = line.context("reading reinject list")?;
        let entry = line.trim();
        if entry.is_empty() || entry.starts_with('#') {
            continue;
        }
        history.insert(ab1_set::normalize(entry, true));
    }
    Ok(history)
}
