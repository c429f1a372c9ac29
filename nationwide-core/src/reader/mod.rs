//! Workbook row reader using calamine

use anyhow::{Context, Result};
use calamine::{Data, Range, Reader, Sheets, open_workbook_auto};
use std::collections::HashSet;
use std::path::Path;

/// One spreadsheet row as positional text cells
pub type RawRow = Vec<String>;

/// Text rows of a sheet plus the positions of cells that held numbers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRows {
    pub rows: Vec<RawRow>,
    numeric: HashSet<(usize, usize)>,
}

impl SheetRows {
    /// True when the cell at (`row`, `col`) was a number, not text
    pub fn is_numeric(&self, row: usize, col: usize) -> bool {
        self.numeric.contains(&(row, col))
    }

    pub fn mark_numeric(&mut self, row: usize, col: usize) {
        self.numeric.insert((row, col));
    }
}

impl From<Vec<RawRow>> for SheetRows {
    fn from(rows: Vec<RawRow>) -> Self {
        Self {
            rows,
            numeric: HashSet::new(),
        }
    }
}

/// Read every row of a sheet as text.
///
/// Rows and columns are absolute: `rows[0][0]` is cell A1 even when the used
/// range starts further down or to the right. When `sheet` is `None` the first
/// sheet of the workbook is used.
pub fn read_sheet_rows<P: AsRef<Path>>(path: P, sheet: Option<&str>) -> Result<Vec<RawRow>> {
    read_sheet(path, sheet).map(|sheet| sheet.rows)
}

/// Like [`read_sheet_rows`], also recording which cells were numeric
pub fn read_sheet<P: AsRef<Path>>(path: P, sheet: Option<&str>) -> Result<SheetRows> {
    let path = path.as_ref();
    let mut excel: Sheets<_> = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => excel
            .sheet_names()
            .first()
            .cloned()
            .with_context(|| format!("Workbook has no sheets: {}", path.display()))?,
    };

    let range = excel
        .worksheet_range(&sheet_name)
        .with_context(|| format!("Failed to read sheet '{}' of {}", sheet_name, path.display()))?;

    Ok(range_to_sheet(&range))
}

fn range_to_sheet(range: &Range<Data>) -> SheetRows {
    let mut sheet = SheetRows::default();
    let Some((start_row, start_col)) = range.start() else {
        return sheet;
    };
    let (start_row, start_col) = (start_row as usize, start_col as usize);

    sheet.rows = (0..start_row).map(|_| Vec::new()).collect();
    for (offset, row) in range.rows().enumerate() {
        let mut cells = vec![String::new(); start_col];
        for (col, data) in row.iter().enumerate() {
            if matches!(data, Data::Int(_) | Data::Float(_)) {
                sheet.mark_numeric(start_row + offset, start_col + col);
            }
            cells.push(cell_to_text(data));
        }
        sheet.rows.push(cells);
    }
    sheet
}

/// Render a cell the way it reads in the sheet, minus number formatting
pub fn cell_to_text(data: &Data) -> String {
    match data {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_number(*f),
        Data::Bool(true) => "TRUE".to_string(),
        Data::Bool(false) => "FALSE".to_string(),
        Data::DateTime(dt) if dt.is_datetime() => match dt.as_datetime() {
            Some(value) if dt.as_f64().fract() == 0.0 => value.format("%Y-%m-%d").to_string(),
            Some(value) => value.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => format_number(dt.as_f64()),
        },
        Data::DateTime(dt) => format_number(dt.as_f64()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#{:?}", e),
    }
}

fn format_number(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// True when every cell is empty or whitespace
pub fn is_blank(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}
