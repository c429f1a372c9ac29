//! Location directory: airport/location code to (city, state)

mod builder;

pub use builder::{BuildStats, DirectoryBuilder};

use crate::error::{BuildError, LoadError};
use crate::reader;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, ErrorKind};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Name of the single entry inside the cache archive
const CACHE_ENTRY: &str = "locations.json";
const CACHE_FORMAT_VERSION: u32 = 1;

/// A resolved location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub code: String,
    pub city: String,
    pub state: String,
}

impl LocationRecord {
    pub fn new(code: impl Into<String>, city: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            city: city.into(),
            state: state.into(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct CacheDocument {
    format_version: u32,
    records: Vec<LocationRecord>,
}

/// Read-only lookup table used for the duration of a run
#[derive(Debug, Clone, Default)]
pub struct LocationDirectory {
    records: HashMap<String, LocationRecord>,
}

impl LocationDirectory {
    /// Look up a location code (exact match)
    pub fn lookup(&self, code: &str) -> Option<&LocationRecord> {
        self.records.get(code)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert a record, returning the one it replaced
    fn insert(&mut self, record: LocationRecord) -> Option<LocationRecord> {
        self.records.insert(record.code.clone(), record)
    }

    /// Load a directory from its cache file. Never repairs a bad cache.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let corrupt = |reason: String| LoadError::Corrupt {
            path: path.to_path_buf(),
            reason,
        };

        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LoadError::Missing(path.to_path_buf()));
            }
            Err(source) => {
                return Err(LoadError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let mut archive =
            ZipArchive::new(BufReader::new(file)).map_err(|e| corrupt(e.to_string()))?;
        let entry = archive
            .by_name(CACHE_ENTRY)
            .map_err(|e| corrupt(format!("{}: {}", CACHE_ENTRY, e)))?;
        let document: CacheDocument =
            serde_json::from_reader(entry).map_err(|e| corrupt(e.to_string()))?;

        if document.format_version != CACHE_FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported format version {}",
                document.format_version
            )));
        }

        let mut directory = Self::default();
        for record in document.records {
            directory.insert(record);
        }
        Ok(directory)
    }

    /// Persist the directory as a compressed cache file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let mut records: Vec<_> = self.records.values().cloned().collect();
        records.sort_by(|a, b| a.code.cmp(&b.code));
        let document = CacheDocument {
            format_version: CACHE_FORMAT_VERSION,
            records,
        };

        let file = File::create(path)
            .with_context(|| format!("Failed to create cache file: {}", path.display()))?;
        let mut zip = ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(CACHE_ENTRY, options)?;
        serde_json::to_writer(&mut zip, &document)?;
        let file = zip.finish()?;
        file.sync_all()
            .with_context(|| format!("Failed to sync cache file: {}", path.display()))?;
        Ok(())
    }
}

impl FromIterator<LocationRecord> for LocationDirectory {
    fn from_iter<I: IntoIterator<Item = LocationRecord>>(iter: I) -> Self {
        let mut directory = Self::default();
        for record in iter {
            directory.insert(record);
        }
        directory
    }
}

/// Load the cached directory, rebuilding it from the reference workbook when
/// the cache is missing or unusable.
pub fn ensure_directory(
    cache_path: &Path,
    reference_path: &Path,
    reference_sheet: Option<&str>,
) -> Result<LocationDirectory, BuildError> {
    match LocationDirectory::load(cache_path) {
        Ok(directory) => {
            tracing::info!(
                codes = directory.len(),
                cache = %cache_path.display(),
                "Loaded location directory"
            );
            return Ok(directory);
        }
        Err(LoadError::Missing(_)) => {
            tracing::info!(cache = %cache_path.display(), "No location cache found, building one");
        }
        Err(e) => {
            tracing::warn!(error = %e, "Location cache unusable, rebuilding");
        }
    }

    let rows = reader::read_sheet_rows(reference_path, reference_sheet).map_err(|e| {
        BuildError::Read {
            path: reference_path.to_path_buf(),
            source: e.into(),
        }
    })?;

    let (directory, stats) = DirectoryBuilder::build(&rows);
    if directory.is_empty() {
        return Err(BuildError::NoDataRows(reference_path.to_path_buf()));
    }
    if stats.overwritten > 0 {
        tracing::warn!(
            overwritten = stats.overwritten,
            "Reference workbook repeats location codes, later rows win"
        );
    }
    if stats.skipped > 0 {
        tracing::warn!(skipped = stats.skipped, "Skipped unusable reference rows");
    }

    directory
        .save(cache_path)
        .map_err(|e| BuildError::Persist {
            path: cache_path.to_path_buf(),
            source: e.into(),
        })?;

    tracing::info!(
        codes = directory.len(),
        cache = %cache_path.display(),
        "Location directory created"
    );
    Ok(directory)
}
