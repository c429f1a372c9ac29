//! A1-style cell references and ranges

use std::cmp::Ordering;
use std::fmt;

/// Cell reference (e.g., A1, B2), stored 0-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellReference {
    pub row: u32,
    pub col: u32,
}

impl CellReference {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse a reference like "G1" or "$K$2"
    pub fn parse(cell_ref: &str) -> Option<Self> {
        let mut col = 0u32;
        let mut row_str = String::new();

        for ch in cell_ref.chars() {
            if ch == '$' {
                continue;
            } else if ch.is_ascii_alphabetic() && row_str.is_empty() {
                col = col * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
            } else if ch.is_ascii_digit() {
                row_str.push(ch);
            } else {
                return None;
            }
        }

        let row = row_str.parse::<u32>().ok()?;
        if row == 0 || col == 0 {
            return None;
        }
        Some(Self::new(row - 1, col - 1))
    }

    /// Convert to Excel-style reference (e.g., "A1")
    pub fn to_excel_ref(&self) -> String {
        format!("{}{}", Self::col_to_letter(self.col), self.row + 1)
    }

    /// Convert column number to letter (0 -> A, 1 -> B, etc.)
    pub fn col_to_letter(mut col: u32) -> String {
        let mut result = String::new();
        loop {
            result.insert(0, (b'A' + (col % 26) as u8) as char);
            if col < 26 {
                break;
            }
            col = col / 26 - 1;
        }
        result
    }
}

impl PartialOrd for CellReference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellReference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.row.cmp(&other.row).then_with(|| self.col.cmp(&other.col))
    }
}

impl fmt::Display for CellReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_excel_ref())
    }
}

/// Rectangular range, both corners inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start: CellReference,
    pub end: CellReference,
}

impl CellRange {
    pub fn new(start: CellReference, end: CellReference) -> Self {
        Self {
            start: CellReference::new(start.row.min(end.row), start.col.min(end.col)),
            end: CellReference::new(start.row.max(end.row), start.col.max(end.col)),
        }
    }

    /// Parse "K2:L10" or a single cell "C2"
    pub fn parse(range: &str) -> Option<Self> {
        match range.split_once(':') {
            Some((start, end)) => Some(Self::new(
                CellReference::parse(start)?,
                CellReference::parse(end)?,
            )),
            None => {
                let cell = CellReference::parse(range)?;
                Some(Self::new(cell, cell))
            }
        }
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        (self.start.row..=self.end.row).contains(&row)
            && (self.start.col..=self.end.col).contains(&col)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}
