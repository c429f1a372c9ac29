//! Configuration for asset locations and pipeline thresholds

use crate::pipeline::sanitizer::DEFAULT_MSRP_MIN_LEN;
use anyhow::Result;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// `<home>/.nationwide/assets`, or `./assets` when no home directory exists
static ASSETS_DIR: LazyLock<PathBuf> = LazyLock::new(|| match BaseDirs::new() {
    Some(dirs) => dirs.home_dir().join(".nationwide").join("assets"),
    None => PathBuf::from("assets"),
});

pub const DEFAULT_TEMPLATE_SHEET: &str = "Sheet1";
pub const DEFAULT_LEDGER_PATH: &str = "assets/airport_codes_to_update.csv";

/// Pipeline configuration, usually loaded from `nationwide.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Persisted location directory
    pub cache_path: PathBuf,
    /// Reference workbook the directory is rebuilt from
    pub reference_path: PathBuf,
    /// Sheet of the reference workbook; the first sheet when unset
    pub reference_sheet: Option<String>,
    /// Sheet of the inventory workbook; the first sheet when unset
    pub input_sheet: Option<String>,
    pub template_path: PathBuf,
    /// Working copy written before each run
    pub template_copy_path: PathBuf,
    pub template_sheet: String,
    /// Append-only CSV of unresolved location codes
    pub ledger_path: PathBuf,
    /// Shortest MSRP text considered plausible
    pub msrp_min_len: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let assets = ASSETS_DIR.as_path();
        Self {
            cache_path: assets.join("airport_code_map.bin"),
            reference_path: assets.join("Airport_Codes.xlsx"),
            reference_sheet: Some("Sheet1".to_string()),
            input_sheet: None,
            template_path: assets.join("nationwide_template.xlsx"),
            template_copy_path: assets.join("nationwide_template_copy.xlsx"),
            template_sheet: DEFAULT_TEMPLATE_SHEET.to_string(),
            ledger_path: PathBuf::from(DEFAULT_LEDGER_PATH),
            msrp_min_len: DEFAULT_MSRP_MIN_LEN,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file. Missing keys take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Directory holding the default assets
    pub fn assets_dir() -> &'static Path {
        ASSETS_DIR.as_path()
    }

    pub fn validate(&self) -> Result<()> {
        if self.template_copy_path == self.template_path {
            anyhow::bail!(
                "Configuration error: template_copy_path must differ from template_path ({})",
                self.template_path.display()
            );
        }
        if self.msrp_min_len == 0 {
            anyhow::bail!("Configuration error: msrp_min_len must be at least 1");
        }
        if self.template_sheet.trim().is_empty() {
            anyhow::bail!("Configuration error: template_sheet must not be empty");
        }
        Ok(())
    }
}
