//! nationwide-core: dealer inventory workbooks to the nationwide report
//!
//! Resolves location codes to city and state through a cached directory,
//! projects and deduplicates inventory rows, records unresolved codes in an
//! append-only ledger, then writes the sorted and formatted rows into a
//! template workbook.

pub mod config;
pub mod directory;
pub mod error;
pub mod pipeline;
pub mod reader;
pub mod report;
pub mod writer;

use anyhow::{Context, Result};
use std::path::Path;

pub use config::PipelineConfig;
pub use directory::{LocationDirectory, LocationRecord, ensure_directory};
pub use error::{BuildError, LoadError, MalformedRowError, PersistError};
pub use report::RunReport;

/// Report generator holding a loaded location directory
pub struct Pipeline {
    config: PipelineConfig,
    directory: LocationDirectory,
}

impl Pipeline {
    /// Create a pipeline with an already loaded directory
    pub fn new(config: PipelineConfig, directory: LocationDirectory) -> Self {
        Self { config, directory }
    }

    /// Validate `config` and load its location directory, rebuilding the
    /// cache from the reference workbook when needed
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        tracing::info!("Loading location directory");
        let directory = ensure_directory(
            &config.cache_path,
            &config.reference_path,
            config.reference_sheet.as_deref(),
        )?;
        Ok(Self::new(config, directory))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn directory(&self) -> &LocationDirectory {
        &self.directory
    }

    /// Transform the inventory workbook at `input` into a report at `output`
    pub fn generate<P: AsRef<Path>>(&self, input: P, output: P) -> Result<RunReport> {
        let input = input.as_ref();
        let output = output.as_ref();
        let config = &self.config;

        writer::copy_template(&config.template_path, &config.template_copy_path)?;

        tracing::info!(input = %input.display(), "Generating nationwide report");
        let sheet = reader::read_sheet(input, config.input_sheet.as_deref())
            .with_context(|| format!("Failed to read inventory: {}", input.display()))?;

        let outcome = pipeline::scan_rows(&sheet, &self.directory, config.msrp_min_len);
        if let Some(date) = &outcome.report_date {
            tracing::info!(date = %date, "Inventory report date");
        }
        if outcome.stats.malformed > 0 {
            tracing::warn!(rows = outcome.stats.malformed, "Skipped malformed rows");
        }

        tracing::info!(
            entries = outcome.ledger.len(),
            ledger = %config.ledger_path.display(),
            "Recording unresolved location codes"
        );
        outcome.ledger.flush(&config.ledger_path)?;

        tracing::info!(rows = outcome.rows.len(), "Sorting report rows");
        let (report_rows, parse_warnings) = pipeline::finalize_rows(outcome.rows);
        if parse_warnings.total() > 0 {
            tracing::warn!(
                year = parse_warnings.year,
                miles = parse_warnings.miles,
                price = parse_warnings.price,
                msrp = parse_warnings.msrp,
                "Unparseable numbers written as 0"
            );
        }

        tracing::info!(output = %output.display(), "Saving report");
        let edits = pipeline::report_edits(&report_rows);
        writer::apply_sheet_edits(
            config.template_copy_path.as_path(),
            output,
            Some(config.template_sheet.as_str()),
            &edits,
        )
        .with_context(|| format!("Failed to write report: {}", output.display()))?;

        Ok(RunReport::new(
            input.to_path_buf(),
            output.to_path_buf(),
            outcome.report_date,
            outcome.stats,
            outcome.ledger.len(),
            report_rows.len(),
            parse_warnings,
        ))
    }
}

/// Load the directory for `config` and generate one report
pub fn generate<P: AsRef<Path>>(config: PipelineConfig, input: P, output: P) -> Result<RunReport> {
    Pipeline::from_config(config)?.generate(input, output)
}
