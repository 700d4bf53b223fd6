//! seqsort
//!
//! Sort a day's sequencing output: classify order folders, check each order's
//! expected sample set, resolve reinjections, and package finished orders for
//! delivery. Dry-run by default; `--execute` applies the decided actions.

use ab1_set::PATTERNS;
use anyhow::{bail, Context, Result};
use clap::Parser;
use file_ops::{move_folder, strip_annotations_rename, zip_order};
use log::{info, warn};
use order_proc::batch::{process_batch, BatchReport};
use order_types::{
    load_order_manifest, load_reinject_list, Order, OrderAction, OrderSpec, OrderType,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CMD: &str = "seqsort";

/// File types packaged into delivery archives.
const DELIVERY_EXTENSIONS: &[&str] = &["ab1", "fsa", "seq", "txt"];

/// Sort, validate, and package sequencing result folders.
#[derive(Parser, Debug)]
#[clap(name = CMD, version)]
struct SeqSort {
    /// Folder containing the day's order folders
    #[clap(long, value_name = "DIR")]
    data_dir: PathBuf,

    /// Order manifest CSV listing each order's expected samples
    #[clap(long, value_name = "CSV")]
    manifest: PathBuf,

    /// Historical reinject list, one identity per line
    #[clap(long, value_name = "TXT")]
    reinject_list: Option<PathBuf>,

    /// Carry out archive/move actions instead of only reporting them
    #[clap(long)]
    execute: bool,

    /// Emit the report as JSON
    #[clap(long)]
    json: bool,
}

/// A folder under the data dir that matched one of the order-folder
/// conventions.
#[derive(Clone, Debug, PartialEq, Eq)]
struct OrderFolder {
    path: PathBuf,
    order_type: OrderType,
    /// Identifier candidates pulled from the folder name, matched against
    /// manifest order ids.
    keys: Vec<String>,
}

fn main() -> Result<()> {
    init_log();
    let args = SeqSort::parse();
    run(&args)
}

fn init_log() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();
}

fn run(args: &SeqSort) -> Result<()> {
    if !args.data_dir.is_dir() {
        bail!("data dir {} does not exist", args.data_dir.display());
    }
    let specs = load_order_manifest(&args.manifest)?;
    let history = match &args.reinject_list {
        Some(path) => load_reinject_list(path)?,
        None => HashSet::new(),
    };
    info!(
        "{} orders in manifest, {} identities on the reinject list",
        specs.len(),
        history.len()
    );

    let folders = scan_order_folders(&args.data_dir)?;
    let matched = match_orders(&specs, &folders)?;
    for folder in &matched.unmatched_folders {
        warn!("folder {} matches no manifest order", folder.display());
    }

    let report = process_batch(&matched.orders, &history);
    if args.json {
        let run = RunReport {
            batch: &report,
            unmatched_folders: &matched.unmatched_folders,
        };
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        print_human(&report, &matched.unmatched_folders);
    }

    if args.execute {
        execute_actions(&report, &matched.folders_by_order, &args.data_dir)?;
    } else {
        info!("dry run only; rerun with --execute to apply the actions above");
    }
    Ok(())
}

/// Classify one folder name: PCR runs, then individual order folders, then
/// plates (the loosest convention goes last).
fn classify_folder(name: &str) -> Option<(OrderType, Vec<String>)> {
    if PATTERNS.contains("pcr_folder", name) {
        let keys = [
            PATTERNS.extract("pcr_folder", name, 1),
            PATTERNS.extract("pcr_folder", name, 2),
        ]
        .into_iter()
        .flatten()
        .map(String::from)
        .collect();
        return Some((OrderType::Pcr, keys));
    }
    if PATTERNS.contains("bioi_order_folder", name) {
        let keys = [
            PATTERNS.extract("inumber", name, 1),
            PATTERNS.extract("order_number", name, 1),
        ]
        .into_iter()
        .flatten()
        .map(String::from)
        .collect();
        return Some((OrderType::Individual, keys));
    }
    if PATTERNS.contains("plate_folder", name) {
        let keys = PATTERNS
            .extract("pnumber", name, 1)
            .into_iter()
            .map(String::from)
            .collect();
        return Some((OrderType::Plate, keys));
    }
    None
}

fn scan_order_folders(data_dir: &Path) -> Result<Vec<OrderFolder>> {
    let mut folders = Vec::new();
    scan_into(data_dir, true, &mut folders)?;
    folders.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(folders)
}

fn scan_into(dir: &Path, descend: bool, out: &mut Vec<OrderFolder>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| dir.display().to_string())? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        match classify_folder(name) {
            Some((order_type, keys)) => out.push(OrderFolder {
                path: path.clone(),
                order_type,
                keys,
            }),
            // An instrument batch folder (BioI-<n>) holds its order folders
            // one level down.
            None if descend && PATTERNS.contains("bioi_folder", name) => {
                scan_into(&path, false, out)?;
            }
            None => {}
        }
    }
    Ok(())
}

fn list_files(folder: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(folder).with_context(|| folder.display().to_string())? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

struct MatchedOrders {
    orders: Vec<Order>,
    folders_by_order: HashMap<String, PathBuf>,
    unmatched_folders: Vec<PathBuf>,
}

/// Pair every manifest order with its on-disk folder. Orders with no folder
/// yet get an empty listing (they validate as not ready); folders with no
/// manifest entry are reported, never guessed into a pipeline.
fn match_orders(specs: &[OrderSpec], folders: &[OrderFolder]) -> Result<MatchedOrders> {
    let mut used = vec![false; folders.len()];
    let mut orders = Vec::with_capacity(specs.len());
    let mut folders_by_order = HashMap::new();

    for spec in specs {
        let found = folders.iter().enumerate().find(|(_, f)| {
            f.order_type == spec.order_type && f.keys.iter().any(|k| k == &spec.order_id)
        });
        match found {
            Some((i, folder)) => {
                used[i] = true;
                let files = list_files(&folder.path)?;
                orders.push(Order::from_listing(spec, files.iter().map(String::as_str)));
                folders_by_order.insert(spec.order_id.clone(), folder.path.clone());
            }
            None => {
                info!("no folder on disk yet for order {}", spec.order_id);
                orders.push(Order::from_listing(spec, std::iter::empty::<&str>()));
            }
        }
    }

    let unmatched_folders = folders
        .iter()
        .zip(&used)
        .filter(|(_, used)| !**used)
        .map(|(f, _)| f.path.clone())
        .collect();
    Ok(MatchedOrders {
        orders,
        folders_by_order,
        unmatched_folders,
    })
}

#[derive(Serialize)]
struct RunReport<'a> {
    batch: &'a BatchReport,
    unmatched_folders: &'a [PathBuf],
}

fn print_human(report: &BatchReport, unmatched_folders: &[PathBuf]) {
    for outcome in &report.orders {
        println!(
            "order {} ({}): {}",
            outcome.order_id, outcome.order_type, outcome.action
        );
        for missing in &outcome.validation.missing {
            println!("  missing: {missing}");
        }
        for unexpected in &outcome.validation.unexpected {
            println!("  unexpected: {unexpected}");
        }
        for decision in &outcome.decisions {
            if decision.decision.needs_reinject() {
                println!(
                    "  reinject [{}]: {} ({})",
                    decision.decision.state, decision.file, decision.decision.reason
                );
            }
        }
    }
    if !report.manual_review.is_empty() {
        println!("needs manual review:");
        for raw in &report.manual_review {
            println!("  {raw}");
        }
    }
    for folder in unmatched_folders {
        println!("folder not in manifest: {}", folder.display());
    }
}

fn execute_actions(
    report: &BatchReport,
    folders_by_order: &HashMap<String, PathBuf>,
    data_dir: &Path,
) -> Result<()> {
    for action in report.actions() {
        let folder = folders_by_order.get(action.order_id());
        match action {
            OrderAction::Archive { order_id, .. } => {
                let Some(folder) = folder else { continue };
                let folder_name = folder
                    .file_name()
                    .with_context(|| format!("{} has no folder name", folder.display()))?
                    .to_owned();
                // Delivered files must not carry internal {…} markup.
                for entry in fs::read_dir(folder).with_context(|| folder.display().to_string())? {
                    let path = entry?.path();
                    if path.is_file() {
                        strip_annotations_rename(&path)?;
                    }
                }
                let zip_path = data_dir.join("delivery").join(format!("{order_id}.zip"));
                zip_order(folder, &zip_path, Some(DELIVERY_EXTENSIONS), &["zip"])?;
                let done = data_dir.join("delivered").join(folder_name);
                move_folder(folder, &done, 3, Duration::from_secs(1))?;
            }
            OrderAction::HoldReinject { order_id, flagged } => {
                info!(
                    "holding order {order_id}: {} sample(s) flagged for reinjection",
                    flagged.len()
                );
            }
            OrderAction::NotReady { order_id, .. } => {
                let Some(folder) = folder else { continue };
                let folder_name = folder
                    .file_name()
                    .with_context(|| format!("{} has no folder name", folder.display()))?;
                info!("order {order_id} is not ready; setting its folder aside");
                let dest = data_dir.join("not_ready").join(folder_name);
                move_folder(folder, &dest, 3, Duration::from_secs(1))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use order_types::manifest::read_order_manifest;

    #[test]
    fn folder_classification_truth_table() {
        assert!(classify_folder("BioI-12345").is_none());
        assert_eq!(
            classify_folder("BioI-12345_Customer_67890"),
            Some((
                OrderType::Individual,
                vec!["12345".to_string(), "67890".to_string()]
            ))
        );
        assert_eq!(
            classify_folder("P12345_Test"),
            Some((OrderType::Plate, vec!["12345".to_string()]))
        );
        assert_eq!(
            classify_folder("FB-PCR1234_5678"),
            Some((
                OrderType::Pcr,
                vec!["1234".to_string(), "5678".to_string()]
            ))
        );
        assert!(classify_folder("random_junk").is_none());
    }

    #[test]
    fn scan_descends_into_instrument_batch_folders() {
        let dir = tempfile::tempdir().unwrap();
        let batch = dir.path().join("BioI-12345");
        let order = batch.join("BioI-12345_Customer_67890");
        fs::create_dir_all(&order).unwrap();
        fs::create_dir(dir.path().join("P5011_Lab")).unwrap();
        fs::create_dir(dir.path().join("misc")).unwrap();

        let folders = scan_order_folders(dir.path()).unwrap();
        assert_eq!(folders.len(), 2);
        assert!(folders.iter().any(|f| f.path == order));
        assert!(folders
            .iter()
            .any(|f| f.order_type == OrderType::Plate && f.keys == vec!["5011".to_string()]));
    }

    #[test]
    fn orders_without_folders_validate_as_not_ready() {
        let specs = read_order_manifest(
            "order_id,order_type,sample_name\n67890,individual,bioi-1_a\n".as_bytes(),
            "orders.csv",
        )
        .unwrap();
        let matched = match_orders(&specs, &[]).unwrap();
        let report = process_batch(&matched.orders, &HashSet::new());
        assert!(matches!(
            report.orders[0].action,
            OrderAction::NotReady { .. }
        ));
    }

    #[test]
    fn end_to_end_dry_run_over_a_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let order_dir = dir.path().join("BioI-12_Customer_67890");
        fs::create_dir(&order_dir).unwrap();
        fs::write(order_dir.join("bioi-12_alpha.ab1"), b"x").unwrap();
        fs::write(order_dir.join("bioi-12_beta.ab1"), b"x").unwrap();

        let specs = read_order_manifest(
            "order_id,order_type,sample_name\n\
             67890,individual,bioi-12_alpha\n\
             67890,individual,bioi-12_beta\n"
                .as_bytes(),
            "orders.csv",
        )
        .unwrap();

        let folders = scan_order_folders(dir.path()).unwrap();
        let matched = match_orders(&specs, &folders).unwrap();
        let report = process_batch(&matched.orders, &HashSet::new());

        assert_eq!(report.orders.len(), 1);
        assert!(matches!(report.orders[0].action, OrderAction::Archive { .. }));
        assert_eq!(
            matched.folders_by_order["67890"],
            dir.path().join("BioI-12_Customer_67890")
        );
    }
}
