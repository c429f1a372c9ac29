//! Projects raw inventory rows into the nationwide column layout

use crate::directory::LocationDirectory;
use crate::error::MalformedRowError;
use crate::reader::RawRow;

pub const ZONE_DESC_COL: usize = 2;
pub const DISTRICT_DESC_COL: usize = 3;
pub const RENTAL_DESC_COL: usize = 4;
pub const CODE_COL: usize = 5;
pub const VIN_COL: usize = 8;
pub const MSRP_COL: usize = 19;

/// Source columns copied after (state, city), in output order:
/// year, make, model, trim, drive, vin, color, miles, price, msrp
pub const DATA_COLUMNS: [usize; 10] = [9, 10, 11, 12, 18, VIN_COL, 17, 13, 20, MSRP_COL];

/// Minimum number of cells a data row must have
pub const REQUIRED_LEN: usize = 21;

/// A row in output column order, numeric fields still as text
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectedRow {
    pub state: String,
    pub city: String,
    pub year: String,
    pub make: String,
    pub model: String,
    pub trim: String,
    pub drive: String,
    pub vin: String,
    pub color: String,
    pub miles: String,
    pub price: String,
    pub msrp: String,
    pub notes: String,
    pub notes2: String,
}

/// Reject rows that do not reach every referenced column
pub fn validate_row(row: &[String], row_number: usize) -> Result<(), MalformedRowError> {
    if row.len() < REQUIRED_LEN {
        return Err(MalformedRowError {
            row: row_number,
            len: row.len(),
            required: REQUIRED_LEN,
        });
    }
    Ok(())
}

/// The location code of a raw row
pub fn location_code(row: &[String]) -> &str {
    row.get(CODE_COL).map(|c| c.trim()).unwrap_or_default()
}

/// The unique identifier (VIN) of a raw row
pub fn identifier(row: &[String]) -> &str {
    row.get(VIN_COL).map(|c| c.trim()).unwrap_or_default()
}

pub struct RowProjector<'a> {
    directory: &'a LocationDirectory,
}

impl<'a> RowProjector<'a> {
    pub fn new(directory: &'a LocationDirectory) -> Self {
        Self { directory }
    }

    /// Project a row, or `None` when its location code is not in the directory
    pub fn project(&self, row: &RawRow) -> Option<ProjectedRow> {
        let location = self.directory.lookup(location_code(row))?;
        let [year, make, model, trim, drive, vin, color, miles, price, msrp] =
            DATA_COLUMNS.map(|col| row.get(col).cloned().unwrap_or_default());

        Some(ProjectedRow {
            state: location.state.clone(),
            city: location.city.clone(),
            year,
            make,
            model,
            trim,
            drive,
            vin,
            color,
            miles,
            price,
            msrp,
            notes: String::new(),
            notes2: String::new(),
        })
    }
}
