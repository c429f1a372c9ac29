use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use nationwide_core::{Pipeline, PipelineConfig};
use std::path::PathBuf;

mod formatter;
mod logging;

#[derive(Parser)]
#[command(name = "nationwide")]
#[command(about = "Turn a dealer inventory workbook into the nationwide report", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the inventory workbook
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Where to save the report
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Summary format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON output for scripting
    Json,
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    if let Some(config_path) = path {
        return PipelineConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()));
    }

    // Try to load default config from current directory if it exists
    let default_config_path = PathBuf::from("nationwide.toml");
    if default_config_path.exists() {
        PipelineConfig::from_file(&default_config_path).with_context(|| {
            format!(
                "Failed to load config from {}",
                default_config_path.display()
            )
        })
    } else {
        Ok(PipelineConfig::default())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = logging::LogConfig::from_verbosity(cli.verbose, cli.quiet)
        .with_ansi(matches!(cli.format, OutputFormat::Human));
    logging::init_logging(&log_config);

    let config = load_config(cli.config.as_ref())?;

    let pipeline = Pipeline::from_config(config)?;
    let report = pipeline
        .generate(&cli.input, &cli.output)
        .with_context(|| format!("Failed to generate report from {}", cli.input.display()))?;

    match cli.format {
        OutputFormat::Human => formatter::print_human(&report),
        OutputFormat::Json => formatter::print_json(&report)?,
    }

    Ok(())
}
