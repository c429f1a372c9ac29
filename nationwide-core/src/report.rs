//! Summary of one report generation run

use crate::pipeline::ScanStats;
use crate::pipeline::sanitizer::ParseWarnings;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Text of the input's date row, if any
    pub report_date: Option<String>,
    /// Non-blank data rows read
    pub input_rows: usize,
    pub written_rows: usize,
    pub duplicates: usize,
    pub unresolved: usize,
    pub malformed: usize,
    pub blank: usize,
    pub msrp_not_available: usize,
    pub parse_warnings: ParseWarnings,
}

impl RunReport {
    pub(crate) fn new(
        input: PathBuf,
        output: PathBuf,
        report_date: Option<String>,
        stats: ScanStats,
        unresolved: usize,
        written_rows: usize,
        parse_warnings: ParseWarnings,
    ) -> Self {
        Self {
            input,
            output,
            report_date,
            input_rows: stats.input_rows,
            written_rows,
            duplicates: stats.duplicates,
            unresolved,
            malformed: stats.malformed,
            blank: stats.blank,
            msrp_not_available: stats.msrp_not_available,
            parse_warnings,
        }
    }

    /// True when some rows were dropped or lossily converted
    pub fn has_warnings(&self) -> bool {
        self.malformed > 0 || self.unresolved > 0 || self.parse_warnings.total() > 0
    }
}
