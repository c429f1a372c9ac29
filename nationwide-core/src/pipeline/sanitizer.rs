//! Numeric clean-up of projected rows and the MSRP plausibility check

use super::projector::ProjectedRow;
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Marker written instead of an implausible MSRP
pub const NOT_AVAILABLE: &str = "n/a";

/// Shortest MSRP text accepted by default ("$10,000")
pub const DEFAULT_MSRP_MIN_LEN: usize = 7;

static CURRENCY_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s$,]").expect("valid currency regex"));

/// MSRP after sanitization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Msrp {
    Amount(i64),
    NotAvailable,
}

/// A sorted output row with numeric fields parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub state: String,
    pub city: String,
    pub year: i64,
    pub make: String,
    pub model: String,
    pub trim: String,
    pub drive: String,
    pub vin: String,
    pub color: String,
    pub miles: i64,
    pub price: i64,
    pub msrp: Msrp,
    pub notes: String,
    pub notes2: String,
}

/// Count of non-blank fields that failed to parse and were written as zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseWarnings {
    pub year: usize,
    pub miles: usize,
    pub price: usize,
    pub msrp: usize,
}

impl ParseWarnings {
    pub fn total(&self) -> usize {
        self.year + self.miles + self.price + self.msrp
    }
}

/// Replace an implausibly short MSRP with [`NOT_AVAILABLE`].
///
/// Text is measured as written. A `numeric` source cell has no display format
/// left, so it is measured as it displays in the sheet, e.g. `52000` as
/// `$52,000`. Returns true when the value was replaced.
pub fn check_msrp_plausibility(row: &mut ProjectedRow, min_len: usize, numeric: bool) -> bool {
    let shown = if numeric {
        display_currency(&row.msrp)
    } else {
        Cow::Borrowed(row.msrp.trim())
    };
    if shown.chars().count() >= min_len {
        return false;
    }
    row.msrp = NOT_AVAILABLE.to_string();
    true
}

fn display_currency(text: &str) -> Cow<'_, str> {
    let trimmed = text.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Cow::Borrowed(trimmed);
    }

    let digits = trimmed.trim_start_matches('0');
    let digits = if digits.is_empty() { "0" } else { digits };
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    grouped.push('$');
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    Cow::Owned(grouped)
}

/// Strip currency symbol, grouping separators and whitespace
pub fn normalize_currency(text: &str) -> String {
    CURRENCY_NOISE.replace_all(text, "").into_owned()
}

/// Parse an integer field. Blank text is zero; `None` means unparseable.
fn parse_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return Some(0);
    }
    if let Ok(value) = text.parse::<i64>() {
        return Some(value);
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| f.round() as i64)
}

/// Converts projected rows to their numeric form, counting lossy parses
#[derive(Debug, Default)]
pub struct CellSanitizer {
    warnings: ParseWarnings,
}

impl CellSanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> ParseWarnings {
        self.warnings
    }

    pub fn sanitize(&mut self, row: ProjectedRow) -> ReportRow {
        let year = parse_field(&row.year, "year", &row.vin, &mut self.warnings.year);
        let miles = parse_field(&row.miles, "miles", &row.vin, &mut self.warnings.miles);
        let price = parse_field(
            &normalize_currency(&row.price),
            "price",
            &row.vin,
            &mut self.warnings.price,
        );
        let msrp = if row.msrp == NOT_AVAILABLE {
            Msrp::NotAvailable
        } else {
            Msrp::Amount(parse_field(
                &normalize_currency(&row.msrp),
                "msrp",
                &row.vin,
                &mut self.warnings.msrp,
            ))
        };

        ReportRow {
            state: row.state,
            city: row.city,
            year,
            make: row.make,
            model: row.model,
            trim: row.trim,
            drive: row.drive,
            vin: row.vin,
            color: row.color,
            miles,
            price,
            msrp,
            notes: row.notes,
            notes2: row.notes2,
        }
    }
}

fn parse_field(text: &str, field: &str, vin: &str, counter: &mut usize) -> i64 {
    match parse_integer(text) {
        Some(value) => value,
        None => {
            tracing::debug!(field, vin, value = text, "Unparseable number, using 0");
            *counter += 1;
            0
        }
    }
}
