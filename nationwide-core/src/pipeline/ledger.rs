//! Append-only CSV ledger of location codes the directory could not resolve

use super::projector::{CODE_COL, DISTRICT_DESC_COL, RENTAL_DESC_COL, ZONE_DESC_COL};
use crate::error::PersistError;
use std::fs::{self, OpenOptions};
use std::path::Path;

pub const LEDGER_HEADER: [&str; 4] = [
    "Airport Code",
    "Rental Desc",
    "District Desc",
    "Rental Zone Desc",
];

/// A row whose location code failed lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedEntry {
    pub code: String,
    pub rental_desc: String,
    pub district_desc: String,
    pub zone_desc: String,
}

impl UnresolvedEntry {
    pub fn from_row(row: &[String]) -> Self {
        let cell = |col: usize| row.get(col).cloned().unwrap_or_default();
        Self {
            code: cell(CODE_COL),
            rental_desc: cell(RENTAL_DESC_COL),
            district_desc: cell(DISTRICT_DESC_COL),
            zone_desc: cell(ZONE_DESC_COL),
        }
    }

    fn as_record(&self) -> [&str; 4] {
        [
            self.code.as_str(),
            self.rental_desc.as_str(),
            self.district_desc.as_str(),
            self.zone_desc.as_str(),
        ]
    }
}

/// Unresolved entries accumulated during one run
#[derive(Debug, Default)]
pub struct UnresolvedLedger {
    entries: Vec<UnresolvedEntry>,
}

impl UnresolvedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: UnresolvedEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[UnresolvedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append every entry to the CSV file at `destination`.
    ///
    /// The header is written only when the file is created. Existing content
    /// is never rewritten.
    pub fn flush(&self, destination: &Path) -> Result<(), PersistError> {
        let open_err = |source| PersistError::Open {
            path: destination.to_path_buf(),
            source,
        };
        let write_err = |source| PersistError::Write {
            path: destination.to_path_buf(),
            source,
        };

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(open_err)?;
        }

        let is_new = !destination.exists();
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(destination)
            .map_err(open_err)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file);

        if is_new {
            writer.write_record(LEDGER_HEADER).map_err(write_err)?;
        }
        for entry in &self.entries {
            writer.write_record(entry.as_record()).map_err(write_err)?;
        }
        writer
            .flush()
            .map_err(|e| write_err(csv::Error::from(e)))?;

        Ok(())
    }
}
