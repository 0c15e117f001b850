//! A1-notation addressing: `<sheet>!<start>:<end>`.
//!
//! Column numbers are 1-indexed and converted to letters with bijective base-26, so that
//! `1 -> A`, `26 -> Z`, `27 -> AA`, `52 -> AZ` and `703 -> AAA`. There is no zero digit.

use anyhow::{bail, Context};
use std::fmt;
use std::str::FromStr;

/// Converts a 1-indexed column number into its letter form. Returns an empty string for `0`.
pub fn column_letter(column: usize) -> String {
    let mut n = column;
    let mut letters = Vec::new();
    while n > 0 {
        let remainder = (n - 1) % 26;
        letters.push(b'A' + remainder as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Converts column letters (case-insensitive) back into a 1-indexed column number.
pub fn column_number(letters: &str) -> anyhow::Result<usize> {
    if letters.is_empty() {
        bail!("A column reference cannot be empty");
    }
    letters.chars().try_fold(0usize, |acc, c| {
        if !c.is_ascii_alphabetic() {
            bail!("Invalid character '{c}' in column reference '{letters}'");
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        acc.checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .with_context(|| format!("Column reference '{letters}' is too large"))
    })
}

/// Quotes a sheet title for use in A1 notation when it is not a plain identifier. Embedded single
/// quotes are doubled.
pub fn quote_sheet_name(name: &str) -> String {
    let plain = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if plain {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

fn unquote_sheet_name(s: &str) -> String {
    match s.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => s.to_string(),
    }
}

/// One end of a range. Either component may be open: `A` is a whole column, `2` a whole row.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Cell {
    /// 1-indexed column.
    pub col: Option<usize>,
    /// 1-indexed row.
    pub row: Option<usize>,
}

impl Cell {
    pub fn new(col: usize, row: usize) -> Self {
        Self {
            col: Some(col),
            row: Some(row),
        }
    }

    pub fn column(col: usize) -> Self {
        Self {
            col: Some(col),
            row: None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = self.col {
            write!(f, "{}", column_letter(col))?;
        }
        if let Some(row) = self.row {
            write!(f, "{row}")?;
        }
        Ok(())
    }
}

impl FromStr for Cell {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s.find(|c: char| c.is_ascii_digit()).unwrap_or(s.len());
        let (letters, digits) = s.split_at(split);
        let col = if letters.is_empty() {
            None
        } else {
            Some(column_number(letters)?)
        };
        let row = if digits.is_empty() {
            None
        } else {
            Some(
                digits
                    .parse::<usize>()
                    .with_context(|| format!("Invalid row in cell reference '{s}'"))?,
            )
        };
        if col.is_none() && row.is_none() {
            bail!("Empty cell reference");
        }
        Ok(Self { col, row })
    }
}

/// A range within a named sheet, e.g. `'November 2025'!A2:G`.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Range {
    sheet: String,
    start: Cell,
    end: Option<Cell>,
}

impl Range {
    pub fn new(sheet: impl Into<String>, start: Cell, end: Option<Cell>) -> Self {
        Self {
            sheet: sheet.into(),
            start,
            end,
        }
    }

    /// A rectangular range, e.g. `A1:C4`.
    pub fn rect(sheet: impl Into<String>, start: Cell, end: Cell) -> Self {
        Self::new(sheet, start, Some(end))
    }

    /// Rows `first_row..` of columns `1..=cols`, open-ended downwards, e.g. `A2:G`.
    pub fn rows_from(sheet: impl Into<String>, first_row: usize, cols: usize) -> Self {
        Self::new(
            sheet,
            Cell::new(1, first_row),
            Some(Cell::column(cols)),
        )
    }

    /// Whole columns `1..=cols`, e.g. `A:G`.
    pub fn columns(sheet: impl Into<String>, cols: usize) -> Self {
        Self::new(sheet, Cell::column(1), Some(Cell::column(cols)))
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn start(&self) -> Cell {
        self.start
    }

    pub fn end(&self) -> Option<Cell> {
        self.end
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", quote_sheet_name(&self.sheet), self.start)?;
        if let Some(end) = self.end {
            write!(f, ":{end}")?;
        }
        Ok(())
    }
}

impl FromStr for Range {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bang = s
            .rfind('!')
            .with_context(|| format!("Range '{s}' is missing a sheet name"))?;
        let (sheet, cells) = (&s[..bang], &s[bang + 1..]);
        if sheet.is_empty() {
            bail!("Range '{s}' has an empty sheet name");
        }
        let mut parts = cells.split(':');
        let start: Cell = parts
            .next()
            .with_context(|| format!("Range '{s}' has no cells"))?
            .parse()?;
        let end = parts.next().map(Cell::from_str).transpose()?;
        if parts.next().is_some() {
            bail!("Range '{s}' has too many ':' separators");
        }
        Ok(Self::new(unquote_sheet_name(sheet), start, end))
    }
}
