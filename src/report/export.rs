//! Flat CSV and JSON exports of a report.
//!
//! Three files are written per session: `<session>_wide.csv` with one row
//! per continuous group, `<session>_long.csv` with every group and level
//! row, and `<session>_metadata.json` with the settings and full results.

use crate::models::{AnalysisReport, VariableKind};
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Paths of the files written by [`write_exports`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPaths {
    pub wide_csv: PathBuf,
    pub long_csv: PathBuf,
    pub metadata_json: PathBuf,
}

#[derive(Debug, Serialize)]
struct WideRow<'a> {
    variable: &'a str,
    gender: &'a str,
    n: String,
    mean: String,
    sd: String,
    median: String,
    iqr: String,
    min: String,
    max: String,
}

#[derive(Debug, Default, Serialize)]
struct LongRow<'a> {
    variable: &'a str,
    variable_type: String,
    gender: &'a str,
    level: &'a str,
    n: String,
    pct: String,
    mean: String,
    sd: String,
    median: String,
    iqr: String,
    min: String,
    max: String,
}

#[derive(Debug, Serialize)]
struct ExportMetadata<'a> {
    session_id: &'a str,
    dataset: &'a str,
    analysis_settings: &'a crate::models::AnalysisRequest,
    continuous_results: &'a [crate::models::ContinuousResult],
    categorical_results: &'a [crate::models::CategoricalResult],
    export_timestamp: String,
}

/// Write the wide CSV, long CSV and metadata JSON into `dir`.
pub fn write_exports(report: &AnalysisReport, dir: &Path) -> Result<ExportPaths> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;

    let session = report.metadata.session_id.as_str();
    let paths = ExportPaths {
        wide_csv: dir.join(format!("{}_wide.csv", session)),
        long_csv: dir.join(format!("{}_long.csv", session)),
        metadata_json: dir.join(format!("{}_metadata.json", session)),
    };

    write_wide(report, &paths.wide_csv)?;
    write_long(report, &paths.long_csv)?;
    write_metadata(report, &paths.metadata_json)?;

    debug!("Exports written to {}", dir.display());
    Ok(paths)
}

fn write_wide(report: &AnalysisReport, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    for result in &report.results.continuous {
        for s in &result.table {
            writer.serialize(WideRow {
                variable: &result.var,
                gender: s.gender.as_str(),
                n: s.n.to_string(),
                mean: s.mean.to_string(),
                sd: s.sd.to_string(),
                median: s.median.to_string(),
                iqr: s.iqr.to_string(),
                min: s.min.to_string(),
                max: s.max.to_string(),
            })?;
        }
    }

    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn write_long(report: &AnalysisReport, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    for result in &report.results.continuous {
        for s in &result.table {
            writer.serialize(LongRow {
                variable: &result.var,
                variable_type: VariableKind::Continuous.to_string(),
                gender: s.gender.as_str(),
                n: s.n.to_string(),
                mean: s.mean.to_string(),
                sd: s.sd.to_string(),
                median: s.median.to_string(),
                iqr: s.iqr.to_string(),
                min: s.min.to_string(),
                max: s.max.to_string(),
                ..Default::default()
            })?;
        }
    }

    for result in &report.results.categorical {
        for row in &result.table {
            writer.serialize(LongRow {
                variable: &result.var,
                variable_type: VariableKind::Categorical.to_string(),
                gender: row.gender.as_str(),
                level: &row.level,
                n: row.n.to_string(),
                pct: row.pct.to_string(),
                ..Default::default()
            })?;
        }
    }

    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn write_metadata(report: &AnalysisReport, path: &Path) -> Result<()> {
    let metadata = ExportMetadata {
        session_id: &report.metadata.session_id,
        dataset: &report.metadata.dataset,
        analysis_settings: &report.settings,
        continuous_results: &report.results.continuous,
        categorical_results: &report.results.categorical,
        export_timestamp: Utc::now().to_rfc3339(),
    };
    let json = serde_json::to_string_pretty(&metadata)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
