//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.genderlens.toml` files.

use crate::dataset::gender::default_mappings;
use crate::models::{
    AnalysisRequest, GenderCategory, GenderMapping, ImputeConfig, MissingPolicy,
};
use crate::report::MarkdownOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".genderlens.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Analysis request settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Session registry settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Largest dataset accepted, in megabytes.
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
            max_file_size_mb: default_max_file_size_mb(),
        }
    }
}

fn default_output() -> String {
    "genderlens_report.md".to_string()
}

fn default_max_file_size_mb() -> u64 {
    50
}

/// What to analyse and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Column holding the raw gender labels.
    #[serde(default = "default_gender_col")]
    pub gender_col: String,

    /// Order in which categories are reported and compared.
    #[serde(default = "default_categories_order")]
    pub categories_order: Vec<GenderCategory>,

    /// Continuous variables to analyse.
    #[serde(default)]
    pub continuous: Vec<String>,

    /// Categorical variables to analyse.
    #[serde(default)]
    pub categorical: Vec<String>,

    /// Optional survey weight column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_col: Option<String>,

    #[serde(default)]
    pub missing_policy: MissingPolicy,

    /// Groups smaller than this are suppressed in reported tables.
    #[serde(default = "default_suppress_threshold")]
    pub suppress_threshold: usize,

    /// Apply Benjamini-Hochberg correction.
    #[serde(default)]
    pub fdr: bool,

    /// Run the gender bias assessment.
    #[serde(default = "default_true")]
    pub assess_bias: bool,

    /// Raw label mappings. Empty means the built-in map.
    #[serde(default)]
    pub gender_map: Vec<GenderMapping>,

    /// Per-variable imputation.
    #[serde(default)]
    pub impute: ImputeConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            gender_col: default_gender_col(),
            categories_order: default_categories_order(),
            continuous: Vec::new(),
            categorical: Vec::new(),
            weight_col: None,
            missing_policy: MissingPolicy::default(),
            suppress_threshold: default_suppress_threshold(),
            fdr: false,
            assess_bias: true,
            gender_map: Vec::new(),
            impute: ImputeConfig::default(),
        }
    }
}

fn default_gender_col() -> String {
    "gender".to_string()
}

fn default_categories_order() -> Vec<GenderCategory> {
    GenderCategory::ALL.to_vec()
}

fn default_suppress_threshold() -> usize {
    5
}

/// Session registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle time after which a session expires.
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: i64,

    /// Interval between expiry sweeps.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_ttl_minutes(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

fn default_ttl_minutes() -> i64 {
    60
}

fn default_cleanup_interval() -> u64 {
    300
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include normality and multiple-testing diagnostics.
    #[serde(default = "default_true")]
    pub include_diagnostics: bool,

    /// Include the bias assessment section.
    #[serde(default = "default_true")]
    pub include_bias: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_diagnostics: true,
            include_bias: true,
        }
    }
}

impl From<&ReportConfig> for MarkdownOptions {
    fn from(config: &ReportConfig) -> Self {
        Self {
            include_diagnostics: config.include_diagnostics,
            include_bias: config.include_bias,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(max) = args.max_file_size_mb {
            self.general.max_file_size_mb = max;
        }

        let analysis = &mut self.analysis;
        if let Some(ref col) = args.gender_col {
            analysis.gender_col = col.clone();
        }
        if let Some(ref vars) = args.continuous {
            analysis.continuous = vars.clone();
        }
        if let Some(ref vars) = args.categorical {
            analysis.categorical = vars.clone();
        }
        if let Some(ref weight) = args.weight_col {
            analysis.weight_col = Some(weight.clone());
        }
        if let Some(policy) = args.missing_policy {
            analysis.missing_policy = policy.into();
        }
        if let Some(threshold) = args.suppress_threshold {
            analysis.suppress_threshold = threshold;
        }

        // Flags always override
        if args.fdr {
            analysis.fdr = true;
        }
        if args.no_bias {
            analysis.assess_bias = false;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Build the analysis request. The built-in gender map is used when
    /// none is configured.
    pub fn to_request(&self) -> AnalysisRequest {
        let a = &self.analysis;
        let gender_map = if a.gender_map.is_empty() {
            default_mappings()
        } else {
            a.gender_map.clone()
        };

        AnalysisRequest {
            gender_col: a.gender_col.clone(),
            gender_map,
            categories_order: a.categories_order.clone(),
            vars_continuous: a.continuous.clone(),
            vars_categorical: a.categorical.clone(),
            weight_col: a.weight_col.clone(),
            missing_policy: a.missing_policy,
            impute: (!a.impute.is_empty()).then(|| a.impute.clone()),
            suppress_threshold: a.suppress_threshold,
            fdr: a.fdr,
            assess_bias: a.assess_bias,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.max_file_size_mb, 50);
        assert_eq!(config.analysis.gender_col, "gender");
        assert_eq!(config.analysis.suppress_threshold, 5);
        assert_eq!(config.analysis.categories_order.len(), 4);
        assert_eq!(config.session.ttl_minutes, 60);
        assert!(config.report.include_bias);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "custom_report.md"
verbose = true

[analysis]
gender_col = "Sex"
continuous = ["age", "income"]
categorical = ["region"]
missing_policy = "pairwise"
fdr = true

[[analysis.gender_map]]
from = "1"
to = "female"

[[analysis.gender_map]]
from = "2"
to = "male"

[analysis.impute]
median = ["income"]

[session]
ttl_minutes = 15
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "custom_report.md");
        assert!(config.general.verbose);
        assert_eq!(config.analysis.continuous, vec!["age", "income"]);
        assert_eq!(config.analysis.missing_policy, MissingPolicy::Pairwise);
        assert_eq!(config.analysis.gender_map.len(), 2);
        assert_eq!(config.analysis.gender_map[1].to, GenderCategory::Male);
        assert_eq!(config.session.ttl_minutes, 15);
        assert_eq!(config.session.cleanup_interval_secs, 300);

        let request = config.to_request();
        assert_eq!(request.gender_col, "Sex");
        assert_eq!(request.gender_map.len(), 2);
        assert!(request.fdr);
        assert_eq!(request.impute.unwrap().median, vec!["income"]);
    }

    #[test]
    fn test_request_uses_default_gender_map() {
        let request = Config::default().to_request();
        assert_eq!(request.gender_map, default_mappings());
        assert!(request.impute.is_none());
        assert!(request.assess_bias);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[analysis]"));
        assert!(toml_str.contains("[session]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.analysis.suppress_threshold, 5);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[report]\ninclude_bias = false\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert!(!config.report.include_bias);
        assert!(config.report.include_diagnostics);
        assert!(Config::load(&dir.path().join("absent.toml")).is_err());
    }
}
