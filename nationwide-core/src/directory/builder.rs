//! Builds a location directory from the reference workbook rows

use super::{LocationDirectory, LocationRecord};
use crate::reader::RawRow;

const CODE_COL: usize = 1;
const CITY_COL: usize = 2;
const STATE_COL: usize = 3;

/// Counters gathered while building
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Rows whose code replaced an earlier row's entry
    pub overwritten: usize,
    /// Rows too short or without a code
    pub skipped: usize,
}

pub struct DirectoryBuilder;

impl DirectoryBuilder {
    /// Build a directory from reference rows.
    ///
    /// Row 0 is the header and is skipped without inspection. Duplicate codes
    /// are last-write-wins and counted in [`BuildStats::overwritten`].
    pub fn build(rows: &[RawRow]) -> (LocationDirectory, BuildStats) {
        let mut directory = LocationDirectory::default();
        let mut stats = BuildStats::default();

        for (index, row) in rows.iter().enumerate().skip(1) {
            if row.len() <= STATE_COL || row[CODE_COL].trim().is_empty() {
                if !crate::reader::is_blank(row) {
                    tracing::debug!(row = index + 1, "Skipping unusable reference row");
                    stats.skipped += 1;
                }
                continue;
            }

            let record = LocationRecord::new(
                row[CODE_COL].trim(),
                row[CITY_COL].trim(),
                row[STATE_COL].trim(),
            );
            if let Some(previous) = directory.insert(record) {
                tracing::debug!(code = %previous.code, row = index + 1, "Location code overwritten");
                stats.overwritten += 1;
            }
        }

        (directory, stats)
    }
}
