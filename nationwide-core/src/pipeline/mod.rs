//! Row transformation stages: scan, dedup, project, ledger, sort, sanitize

pub mod dedup;
pub mod ledger;
pub mod projector;
pub mod sanitizer;
pub mod sorter;

use crate::directory::LocationDirectory;
use crate::reader::{self, RawRow, SheetRows};
use crate::writer::{CellData, CellRange, CellReference, NumberStyle, SheetEdits};
use dedup::Deduplicator;
use ledger::{UnresolvedEntry, UnresolvedLedger};
use projector::{ProjectedRow, RowProjector};
use sanitizer::{CellSanitizer, Msrp, NOT_AVAILABLE, ParseWarnings, ReportRow};

/// Index of the first data row (after date, blank and header rows)
pub const DATA_START_ROW: usize = 3;

/// Header cell renamed from "Body Type"
pub const DRIVE_HEADER_CELL: CellReference = CellReference { row: 0, col: 6 };
pub const DRIVE_HEADER: &str = "Drive";

/// 0-based output columns that receive number styles
const YEAR_COL: u32 = 2;
const MILES_COL: u32 = 9;
const PRICE_COL: u32 = 10;
const MSRP_COL: u32 = 11;

/// Counters collected while scanning input rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Non-blank data rows
    pub input_rows: usize,
    pub blank: usize,
    pub malformed: usize,
    pub duplicates: usize,
    pub msrp_not_available: usize,
}

/// Result of scanning the input sheet
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub report_date: Option<String>,
    pub rows: Vec<ProjectedRow>,
    pub ledger: UnresolvedLedger,
    pub stats: ScanStats,
}

/// First non-empty cell of the date row
pub fn report_date(rows: &[RawRow]) -> Option<String> {
    rows.first()?
        .iter()
        .map(|cell| cell.trim())
        .find(|cell| !cell.is_empty())
        .map(str::to_string)
}

/// Route every data row to the output buffer or the unresolved ledger.
///
/// Rows are checked in order: blank, length, duplicate identifier, location
/// lookup. A duplicate is dropped whether or not its first occurrence
/// resolved.
pub fn scan_rows(sheet: &SheetRows, directory: &LocationDirectory, msrp_min_len: usize) -> ScanOutcome {
    let projector = RowProjector::new(directory);
    let mut dedup = Deduplicator::new();
    let mut outcome = ScanOutcome {
        report_date: report_date(&sheet.rows),
        ..Default::default()
    };

    for (index, row) in sheet.rows.iter().enumerate().skip(DATA_START_ROW) {
        let row_number = index + 1;

        if reader::is_blank(row) {
            tracing::debug!(row = row_number, "Skipping blank row");
            outcome.stats.blank += 1;
            continue;
        }
        outcome.stats.input_rows += 1;

        if let Err(e) = projector::validate_row(row, row_number) {
            tracing::warn!("{}", e);
            outcome.stats.malformed += 1;
            continue;
        }

        let vin = projector::identifier(row);
        if dedup.seen(vin) {
            tracing::debug!(row = row_number, vin, "Dropping duplicate");
            outcome.stats.duplicates += 1;
            continue;
        }
        dedup.mark(vin);

        match projector.project(row) {
            Some(mut projected) => {
                let numeric = sheet.is_numeric(index, projector::MSRP_COL);
                if sanitizer::check_msrp_plausibility(&mut projected, msrp_min_len, numeric) {
                    outcome.stats.msrp_not_available += 1;
                }
                outcome.rows.push(projected);
            }
            None => {
                tracing::debug!(
                    row = row_number,
                    code = projector::location_code(row),
                    "Unresolved location code"
                );
                outcome.ledger.record(UnresolvedEntry::from_row(row));
            }
        }
    }

    outcome
}

/// Sort the buffer and convert numeric fields
pub fn finalize_rows(mut rows: Vec<ProjectedRow>) -> (Vec<ReportRow>, ParseWarnings) {
    sorter::sort_rows(&mut rows);

    let mut sanitizer = CellSanitizer::new();
    let rows = rows.into_iter().map(|row| sanitizer.sanitize(row)).collect();
    (rows, sanitizer.warnings())
}

fn row_values(row: &ReportRow) -> Vec<Option<CellData>> {
    let text = |value: &str| Some(CellData::from(value));
    let optional = |value: &str| (!value.is_empty()).then(|| CellData::from(value));
    let msrp = match row.msrp {
        Msrp::Amount(amount) => CellData::from(amount),
        Msrp::NotAvailable => CellData::from(NOT_AVAILABLE),
    };

    vec![
        text(&row.state),
        text(&row.city),
        Some(CellData::from(row.year)),
        text(&row.make),
        text(&row.model),
        text(&row.trim),
        text(&row.drive),
        text(&row.vin),
        text(&row.color),
        Some(CellData::from(row.miles)),
        Some(CellData::from(row.price)),
        Some(msrp),
        optional(&row.notes),
        optional(&row.notes2),
    ]
}

/// Cell writes and styles for the output sheet. Rows start at sheet row 2.
pub fn report_edits(rows: &[ReportRow]) -> SheetEdits {
    let mut edits = SheetEdits::new();
    edits.set_cell(DRIVE_HEADER_CELL, DRIVE_HEADER);

    for (offset, row) in rows.iter().enumerate() {
        let sheet_row = offset as u32 + 1;
        for (col, value) in row_values(row).into_iter().enumerate() {
            if let Some(value) = value {
                edits.set_cell(CellReference::new(sheet_row, col as u32), value);
            }
        }
    }

    if let Some(last) = rows.len().checked_sub(1).map(|n| n as u32 + 1) {
        let column = |first: u32, last_col: u32| {
            CellRange::new(CellReference::new(1, first), CellReference::new(last, last_col))
        };
        edits.set_style(column(YEAR_COL, YEAR_COL), NumberStyle::Integer);
        edits.set_style(column(MILES_COL, MILES_COL), NumberStyle::Integer);
        edits.set_style(column(PRICE_COL, MSRP_COL), NumberStyle::Currency);
    }

    edits
}
