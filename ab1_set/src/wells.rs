//! Typed well positions on a 96-well plate.

use anyhow::{bail, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A well on the standard 96-well grid: rows `A`-`H`, columns `1`-`12`.
///
/// Parses both the human form (`A1`, `b07`) and the instrument token form
/// with the column first (`01A`, `12h`). Displays as the human form.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(into = "String", try_from = "String")]
pub struct WellPosition {
    row: u8,
    column: u8,
}

impl WellPosition {
    pub const ROWS: u8 = 8;
    pub const COLUMNS: u8 = 12;

    pub fn new(row: char, column: u8) -> Option<WellPosition> {
        let row = row.to_ascii_uppercase();
        if !('A'..='H').contains(&row) || !(1..=Self::COLUMNS).contains(&column) {
            return None;
        }
        Some(WellPosition {
            row: row as u8,
            column,
        })
    }

    pub fn row(&self) -> char {
        self.row as char
    }

    pub fn column(&self) -> u8 {
        self.column
    }

    /// Every well of the grid in row-major order (`A1`, `A2`, .., `H12`).
    pub fn grid() -> impl Iterator<Item = WellPosition> {
        (b'A'..=b'H').flat_map(|row| {
            (1..=Self::COLUMNS).map(move |column| WellPosition { row, column })
        })
    }

    /// The zero-padded, column-first token the instrument embeds in
    /// filenames, e.g. `01A`.
    pub fn instrument_token(&self) -> String {
        format!("{:02}{}", self.column, self.row())
    }
}

impl fmt::Display for WellPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row(), self.column)
    }
}

impl FromStr for WellPosition {
    type Err = Error;

    fn from_str(s: &str) -> Result<WellPosition> {
        let s = s.trim();
        let mut chars = s.chars();
        let parsed = match chars.next() {
            Some(c) if c.is_ascii_alphabetic() => {
                // Human form: row letter then column number.
                s[1..].parse().ok().and_then(|column| WellPosition::new(c, column))
            }
            Some(c) if c.is_ascii_digit() => {
                // Instrument form: column number then row letter.
                match s.chars().last() {
                    Some(row) if row.is_ascii_alphabetic() => s[..s.len() - 1]
                        .parse()
                        .ok()
                        .and_then(|column| WellPosition::new(row, column)),
                    _ => None,
                }
            }
            _ => None,
        };
        match parsed {
            Some(well) => Ok(well),
            None => bail!("'{s}' is not a well position (expected e.g. 'A1' or '01A')"),
        }
    }
}

impl From<WellPosition> for String {
    fn from(well: WellPosition) -> String {
        well.to_string()
    }
}

impl TryFrom<String> for WellPosition {
    type Error = Error;

    fn try_from(s: String) -> Result<WellPosition> {
        s.parse()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_both_token_forms() {
        let well: WellPosition = "A1".parse().unwrap();
        assert_eq!((well.row(), well.column()), ('A', 1));
        assert_eq!("01A".parse::<WellPosition>().unwrap(), well);
        assert_eq!("a01".parse::<WellPosition>().unwrap(), well);
        assert_eq!("1a".parse::<WellPosition>().unwrap(), well);
        assert_eq!("12H".parse::<WellPosition>().unwrap().to_string(), "H12");
    }

    #[test]
    fn reject_off_grid_positions() {
        assert!("I1".parse::<WellPosition>().is_err());
        assert!("A13".parse::<WellPosition>().is_err());
        assert!("A0".parse::<WellPosition>().is_err());
        assert!("".parse::<WellPosition>().is_err());
        assert!("07".parse::<WellPosition>().is_err());
    }

    #[test]
    fn grid_covers_96_wells() {
        let wells: Vec<_> = WellPosition::grid().collect();
        assert_eq!(wells.len(), 96);
        assert_eq!(wells[0].to_string(), "A1");
        assert_eq!(wells[95].to_string(), "H12");
    }

    #[test]
    fn instrument_token_is_zero_padded() {
        let well: WellPosition = "A1".parse().unwrap();
        assert_eq!(well.instrument_token(), "01A");
        let well: WellPosition = "H12".parse().unwrap();
        assert_eq!(well.instrument_token(), "12H");
    }
}
