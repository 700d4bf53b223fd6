//! Centralized registry of the file and folder naming patterns used across
//! the pipeline.
//!
//! Every component matches names through this registry, so two call sites can
//! never drift apart on a convention. Entries are compiled once and read-only
//! afterwards; new semantics get a new name instead of redefining an old one.

use anyhow::{ensure, Context, Result};
use lazy_static::lazy_static;
use regex::{Match, Regex, RegexBuilder};
use std::collections::HashMap;
use thiserror::Error;

/// Lookup failure for a pattern the pipeline cannot run without.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("no pattern named '{0}' is registered")]
pub struct PatternNotFound(pub String);

/// `(name, pattern, case_insensitive)` for every built-in convention.
///
/// Order identifiers are case-insensitive because their casing is
/// operator-dependent; `brace_content` is exact because the brace syntax is.
const BUILTIN_PATTERNS: &[(&str, &str, bool)] = &[
    ("inumber", r"bioi-(\d+)", true),
    ("pnumber", r"p(\d+)", true),
    ("pcr_number", r"\{pcr(\d+)[^}]+\}", true),
    ("brace_content", r"\{[^{}]*\}", false),
    ("bioi_folder", r"bioi-\d+", true),
    ("bioi_order_folder", r"bioi-\d+_.+_\d+", true),
    ("plate_folder", r"p\d+.+", true),
    ("pcr_folder", r"fb-pcr(\d+)_(\d+)", true),
    ("ind_blank_file", r"\{\d+[A-H]\}\.ab1$", true),
    ("plate_blank_file", r"^\d{2}[A-H]__\.ab1$", true),
    ("well_location", r"\{(\d+[A-H])\}", true),
    ("reinject_dilution", r"\{(\d+_\d+)\}", true),
    ("preemptive_flag", r"\{!P\}", true),
    ("order_number", r"_(\d+)(?:$|_)", true),
];

/// Patterns classification cannot run without. A registry built from external
/// configuration must provide all of them or construction fails.
pub const MANDATORY_PATTERNS: &[&str] = &[
    "inumber",
    "pnumber",
    "pcr_number",
    "brace_content",
    "bioi_folder",
    "bioi_order_folder",
    "plate_folder",
    "pcr_folder",
    "ind_blank_file",
    "plate_blank_file",
    "well_location",
    "reinject_dilution",
    "preemptive_flag",
    "order_number",
];

/// Named, compiled text patterns. Read-only after construction, so shared
/// references are safe everywhere.
#[derive(Debug)]
pub struct PatternRegistry {
    patterns: HashMap<String, Regex>,
}

impl PatternRegistry {
    /// The registry of built-in naming conventions. The literals are part of
    /// this crate, so a compile failure here is a bug, not a runtime error.
    pub fn builtin() -> PatternRegistry {
        let mut patterns = HashMap::new();
        for &(name, pattern, case_insensitive) in BUILTIN_PATTERNS {
            let re = RegexBuilder::new(pattern)
                .case_insensitive(case_insensitive)
                .build()
                .unwrap();
            patterns.insert(name.to_string(), re);
        }
        PatternRegistry { patterns }
    }

    /// Build a registry from externally supplied entries.
    ///
    /// Every mandatory pattern must be present and must compile. A gap here
    /// means no file can be classified correctly, so this is the one
    /// setup-time fatal condition in the crate.
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = (&'a str, &'a str, bool)>,
    ) -> Result<PatternRegistry> {
        let mut patterns = HashMap::new();
        for (name, pattern, case_insensitive) in entries {
            ensure!(
                !patterns.contains_key(name),
                "pattern '{name}' is registered twice; register changed semantics under a new name"
            );
            let re = RegexBuilder::new(pattern)
                .case_insensitive(case_insensitive)
                .build()
                .with_context(|| format!("pattern '{name}' failed to compile"))?;
            patterns.insert(name.to_string(), re);
        }
        for &name in MANDATORY_PATTERNS {
            ensure!(
                patterns.contains_key(name),
                "mandatory pattern '{name}' is missing; no file can be classified without it"
            );
        }
        Ok(PatternRegistry { patterns })
    }

    /// Look up a pattern by name. Unknown names yield `None`, never a panic;
    /// callers treat that as an empty match signaling a configuration gap.
    pub fn get(&self, name: &str) -> Option<&Regex> {
        self.patterns.get(name)
    }

    /// Like `get`, for call sites that cannot proceed without the pattern.
    pub fn require(&self, name: &str) -> Result<&Regex, PatternNotFound> {
        self.get(name).ok_or_else(|| PatternNotFound(name.to_string()))
    }

    /// First match of the named pattern in `text`.
    pub fn find<'t>(&self, name: &str, text: &'t str) -> Option<Match<'t>> {
        self.get(name)?.find(text)
    }

    /// Extract a capture group from the first match of the named pattern.
    pub fn extract<'t>(&self, name: &str, text: &'t str, group: usize) -> Option<&'t str> {
        self.get(name)?
            .captures(text)?
            .get(group)
            .map(|m| m.as_str())
    }

    /// Whether `text` contains a match for the named pattern.
    pub fn contains(&self, name: &str, text: &str) -> bool {
        self.find(name, text).is_some()
    }
}

lazy_static! {
    /// Process-wide registry of the built-in conventions. Immutable after
    /// initialization, so concurrent readers need no coordination.
    pub static ref PATTERNS: PatternRegistry = PatternRegistry::builtin();
}
