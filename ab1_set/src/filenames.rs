//! Parsing and normalization of instrument filenames.
//!
//! A raw AB1 filename carries several layers of information: an order
//! identifier (`bioi-<digits>` or `p<digits>`), an optional well token, and
//! any number of bracket annotations (`{…}`) holding flags, PCR experiment
//! numbers, and reinject dilutions. `SampleFilenameRecord::parse` pulls all
//! of it apart in one deterministic pass; `normalize` produces the canonical
//! identity used everywhere two names must compare equal.

use crate::patterns::PATTERNS;
use crate::wells::WellPosition;
use serde::{Deserialize, Serialize};

/// Extensions the instrument and its downstream tools produce. Extension
/// stripping is restricted to this set so dotted sample names like
/// `940.9.H446` survive normalization.
const KNOWN_EXTENSIONS: &[&str] = &["ab1", "fsa", "seq", "txt", "zip"];

/// Instrument-appended suffixes that carry no identity information.
const NEUTRAL_SUFFIXES: &[&str] = &["_premixed", "_rti"];

/// Why a filename could not be tied to an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnrecognizedReason {
    /// No order-identifier convention matched the identity-bearing remainder.
    NoIdentifierMatch,
    /// The remainder matches more than one order-identifier convention, so
    /// picking one would be a guess.
    AmbiguousIdentifier,
}

/// The order a sample file belongs to. Exactly one kind per valid record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderIdentity {
    /// Individual sequencing order, `bioi-<digits>`.
    Individual(String),
    /// Plate order, `p<digits>`.
    Plate(String),
    /// PCR order; the experiment number comes from a `{pcr…}` annotation.
    Pcr(String),
    /// Not an error: routed to the manual-review bucket.
    Unrecognized(UnrecognizedReason),
}

impl OrderIdentity {
    pub fn is_recognized(&self) -> bool {
        !matches!(self, OrderIdentity::Unrecognized(_))
    }

    /// The identifier digits, for grouping recognized records.
    pub fn key(&self) -> Option<&str> {
        match self {
            OrderIdentity::Individual(n) | OrderIdentity::Plate(n) | OrderIdentity::Pcr(n) => {
                Some(n)
            }
            OrderIdentity::Unrecognized(_) => None,
        }
    }
}

/// Everything the pipeline knows about one file, derived from its name alone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleFilenameRecord {
    /// The name as the instrument wrote it.
    pub raw: String,
    /// Canonical comparison identity, see [`normalize`].
    pub normalized: String,
    pub identity: OrderIdentity,
    /// Well token embedded in the name (plate and blank files).
    pub well: Option<WellPosition>,
    /// Bracket annotation contents, in order of appearance.
    pub annotations: Vec<String>,
    /// `{!P}` present: reinject preemptively, regardless of history.
    pub preemptive: bool,
    /// `{<n>_<m>}` reinject dilution annotation, verbatim.
    pub dilution: Option<String>,
}

impl SampleFilenameRecord {
    /// Parse a raw filename. Never fails: names that match no convention
    /// come back with an `Unrecognized` identity and still normalize.
    pub fn parse(raw: &str) -> SampleFilenameRecord {
        let adjusted = adjust_abi_chars(raw);
        let stem = strip_known_extensions(&adjusted);
        let stem = neutralize_suffixes(stem);

        let annotations = extract_annotations(&stem);
        let remainder = strip_annotations(&stem);

        let preemptive = annotations.iter().any(|a| a.eq_ignore_ascii_case("!P"));
        let well = PATTERNS
            .extract("well_location", &stem, 1)
            .and_then(|token| token.parse().ok());
        let dilution = PATTERNS
            .extract("reinject_dilution", &stem, 1)
            .map(String::from);

        let pcr = PATTERNS.extract("pcr_number", &stem, 1);
        let inumber = PATTERNS.extract("inumber", &remainder, 1);
        let pnumber = PATTERNS.extract("pnumber", &remainder, 1);
        // The explicit {pcr…} annotation wins: it is deliberate operator
        // markup, while the I/P conventions are substring matches.
        let identity = match (pcr, inumber, pnumber) {
            (Some(experiment), _, _) => OrderIdentity::Pcr(experiment.to_string()),
            (None, Some(_), Some(_)) => {
                OrderIdentity::Unrecognized(UnrecognizedReason::AmbiguousIdentifier)
            }
            (None, Some(inumber), None) => OrderIdentity::Individual(inumber.to_string()),
            (None, None, Some(pnumber)) => OrderIdentity::Plate(pnumber.to_string()),
            (None, None, None) => {
                OrderIdentity::Unrecognized(UnrecognizedReason::NoIdentifierMatch)
            }
        };

        SampleFilenameRecord {
            raw: raw.to_string(),
            normalized: normalize(raw, true),
            identity,
            well,
            annotations,
            preemptive,
            dilution,
        }
    }
}

/// Canonical comparison identity for a filename: instrument character
/// adjustment, lowercasing, known-extension stripping (optional), neutral
/// suffix removal, and bracket-annotation stripping.
///
/// Stripping one layer can expose another (`x_RTI.ab1`, `x.ab1_RTI`), so the
/// strip steps repeat until stable; `normalize(normalize(x)) == normalize(x)`
/// for every input.
pub fn normalize(raw: &str, strip_extension: bool) -> String {
    let mut name = adjust_abi_chars(raw).to_lowercase();
    loop {
        let mut next = if strip_extension {
            strip_known_extensions(&name).to_string()
        } else {
            name.clone()
        };
        next = neutralize_suffixes(&next);
        next = strip_annotations(&next);
        if next == name {
            return next;
        }
        name = next;
    }
}

/// Mirror the instrument's own filename character rewriting, so operator
/// spellings compare equal to what lands on disk.
pub fn adjust_abi_chars(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '+' => out.push('&'),
            '*' | '|' | '/' | '\\' | ':' | '<' | '>' => out.push('-'),
            '"' | '\'' | '?' | ',' => {}
            c if c.is_whitespace() => {}
            c => out.push(c),
        }
    }
    out
}

/// Strip trailing known extensions, repeatedly (`x.ab1.zip` loses both).
pub fn strip_known_extensions(name: &str) -> &str {
    let mut stem = name;
    while let Some((base, ext)) = stem.rsplit_once('.') {
        if base.is_empty() || !KNOWN_EXTENSIONS.iter().any(|k| ext.eq_ignore_ascii_case(k)) {
            break;
        }
        stem = base;
    }
    stem
}

/// Remove the instrument-appended suffixes, wherever they appear.
pub fn neutralize_suffixes(name: &str) -> String {
    let mut out = String::from(name);
    for suffix in NEUTRAL_SUFFIXES {
        while let Some(pos) = out.to_ascii_lowercase().find(suffix) {
            out.replace_range(pos..pos + suffix.len(), "");
        }
    }
    out
}

/// Byte spans (braces included) of each outermost well-formed `{…}` pair.
///
/// This is the one bracket scanner in the workspace; annotation extraction
/// and stripping are both expressed in terms of it. Nested pairs stay inside
/// their outer span; unmatched braces are literal text.
fn annotation_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push((start, i + 1));
                }
            }
            _ => {}
        }
    }
    spans
}

/// The contents of each outermost well-formed `{…}` pair, in order.
pub fn extract_annotations(text: &str) -> Vec<String> {
    annotation_spans(text)
        .into_iter()
        .map(|(start, end)| text[start + 1..end - 1].to_string())
        .collect()
}

/// Remove every outermost well-formed `{…}` pair (contents included).
/// Malformed brace syntax is left in place rather than raising.
pub fn strip_annotations(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (start, end) in annotation_spans(text) {
        out.push_str(&text[last..start]);
        last = end;
    }
    out.push_str(&text[last..]);
    out
}

/// Individual-order blank/control file, e.g. `{01A}.ab1`.
pub fn is_individual_blank(raw: &str) -> bool {
    PATTERNS.contains("ind_blank_file", raw)
}

/// A plate blank-well file (`01A__.ab1`) marks its well as deliberately
/// unused; returns that well.
pub fn plate_blank_well(raw: &str) -> Option<WellPosition> {
    if !PATTERNS.contains("plate_blank_file", raw) {
        return None;
    }
    raw.get(..3)?.parse().ok()
}
