//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::MissingPolicy;
use clap::Parser;
use std::path::PathBuf;

/// GenderLens - gender-stratified statistical analysis of tabular data
///
/// Summarizes each variable by gender, selects and runs the appropriate
/// hypothesis test, reports effect sizes and flags potential gender bias.
///
/// Examples:
///   genderlens --data survey.csv --continuous age,income --categorical region
///   genderlens --data survey.csv --inspect
///   genderlens --data survey.csv --continuous income --fdr --format json -o report.json
///   genderlens --data survey.csv --continuous income --export-dir exports/
///   genderlens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// CSV dataset to analyze
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub data: Option<PathBuf>,

    /// Column holding gender labels
    #[arg(short, long, value_name = "COLUMN", env = "GENDERLENS_GENDER_COL")]
    pub gender_col: Option<String>,

    /// Continuous variables to analyze (comma-separated)
    ///
    /// Example: --continuous age,income
    #[arg(long, value_name = "VARS", value_delimiter = ',')]
    pub continuous: Option<Vec<String>>,

    /// Categorical variables to analyze (comma-separated)
    #[arg(long, value_name = "VARS", value_delimiter = ',')]
    pub categorical: Option<Vec<String>>,

    /// Survey weight column for weighted means and standard deviations
    #[arg(long, value_name = "COLUMN")]
    pub weight_col: Option<String>,

    /// How rows with missing values are handled
    #[arg(long, value_name = "POLICY")]
    pub missing_policy: Option<PolicyArg>,

    /// Minimum group size shown in tables; smaller groups are suppressed
    #[arg(long, value_name = "N")]
    pub suppress_threshold: Option<usize>,

    /// Apply Benjamini-Hochberg false discovery rate correction
    #[arg(long)]
    pub fdr: bool,

    /// Skip the gender bias assessment
    #[arg(long)]
    pub no_bias: bool,

    /// Output file path for the report
    ///
    /// Defaults to the config file setting or genderlens_report.md
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Directory for wide/long CSV and metadata JSON exports
    #[arg(long, value_name = "DIR")]
    pub export_dir: Option<PathBuf>,

    /// Largest dataset accepted, in megabytes
    #[arg(long, value_name = "MB")]
    pub max_file_size_mb: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .genderlens.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Print inferred column types and gender column candidates, then exit
    #[arg(long)]
    pub inspect: bool,

    /// Exit with code 2 when any statistical disparity is found
    ///
    /// Useful for CI pipelines.
    #[arg(long)]
    pub fail_on_disparity: bool,

    /// Generate a default .genderlens.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Missing-data policy for --missing-policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PolicyArg {
    /// Drop rows with any missing value
    Listwise,
    /// Use all available values per variable
    Pairwise,
    /// Keep rows and report missing categories explicitly
    Flag,
}

impl From<PolicyArg> for MissingPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Listwise => MissingPolicy::Listwise,
            PolicyArg::Pairwise => MissingPolicy::Pairwise,
            PolicyArg::Flag => MissingPolicy::Flag,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        match self.data {
            Some(ref path) if !path.exists() => {
                return Err(format!("Dataset does not exist: {}", path.display()));
            }
            Some(ref path) if !path.is_file() => {
                return Err(format!("Dataset is not a file: {}", path.display()));
            }
            Some(_) => {}
            None => return Err("A dataset is required (--data)".to_string()),
        }

        if self.suppress_threshold == Some(0) {
            return Err("Suppression threshold must be at least 1".to_string());
        }

        if self.max_file_size_mb == Some(0) {
            return Err("Max file size must be at least 1MB".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
