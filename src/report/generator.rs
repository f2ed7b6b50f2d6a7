//! Markdown and JSON report generation.
//!
//! This module renders an [`AnalysisReport`] as a Markdown document or as
//! pretty-printed JSON.

use crate::models::{
    AnalysisReport, BiasAssessment, CategoricalResult, ContinuousResult, Diagnostics, EffectSize,
    GenderSummary, MissingnessInfo, ReportMetadata, RepresentationGap, TestResult,
};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Optional Markdown sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkdownOptions {
    pub include_diagnostics: bool,
    pub include_bias: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            include_diagnostics: true,
            include_bias: true,
        }
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &AnalysisReport, options: &MarkdownOptions) -> String {
    let results = &report.results;
    let bias = results
        .gender_bias
        .as_ref()
        .filter(|_| options.include_bias);

    let mut output = String::new();

    output.push_str("# GenderLens Analysis Report\n\n");
    output.push_str(&generate_metadata_section(report));
    output.push_str(&generate_table_of_contents(report, options, bias.is_some()));
    output.push_str(&generate_composition_section(&results.by_gender));
    output.push_str(&generate_continuous_section(&results.continuous));
    output.push_str(&generate_categorical_section(&results.categorical));
    output.push_str(&generate_missingness_section(&results.missingness));

    if options.include_diagnostics {
        output.push_str(&generate_diagnostics_section(&results.diagnostics));
    }

    if let Some(bias) = bias {
        output.push_str(&generate_bias_section(bias));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(report: &AnalysisReport) -> String {
    let metadata: &ReportMetadata = &report.metadata;
    let settings = &report.settings;
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Dataset:** {}\n", metadata.dataset));
    section.push_str(&format!("- **Session:** `{}`\n", metadata.session_id));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Rows Loaded:** {}\n", metadata.rows_loaded));
    section.push_str(&format!(
        "- **Rows Analyzed:** {}\n",
        report.results.rows_analyzed
    ));
    section.push_str(&format!("- **Gender Column:** `{}`\n", settings.gender_col));
    section.push_str(&format!(
        "- **Missing-Data Policy:** {}\n",
        settings.missing_policy
    ));
    if let Some(ref weight) = settings.weight_col {
        section.push_str(&format!("- **Weight Column:** `{}`\n", weight));
    }
    section.push_str(&format!(
        "- **Suppression Threshold:** {}\n",
        settings.suppress_threshold
    ));
    section.push_str(&format!(
        "- **FDR Correction:** {}\n",
        if settings.fdr { "Benjamini-Hochberg" } else { "none" }
    ));
    section.push_str(&format!(
        "- **Analysis Duration:** {:.2}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(
    report: &AnalysisReport,
    options: &MarkdownOptions,
    has_bias: bool,
) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Sample Composition](#sample-composition)\n");

    if !report.results.continuous.is_empty() {
        toc.push_str("- [Continuous Variables](#continuous-variables)\n");
        for result in &report.results.continuous {
            toc.push_str(&format!("  - [{}](#{})\n", result.var, anchor(&result.var)));
        }
    }
    if !report.results.categorical.is_empty() {
        toc.push_str("- [Categorical Variables](#categorical-variables)\n");
        for result in &report.results.categorical {
            toc.push_str(&format!("  - [{}](#{})\n", result.var, anchor(&result.var)));
        }
    }

    toc.push_str("- [Missing Data](#missing-data)\n");
    if options.include_diagnostics {
        toc.push_str("- [Diagnostics](#diagnostics)\n");
    }
    if has_bias {
        toc.push_str("- [Gender Bias Assessment](#gender-bias-assessment)\n");
    }
    toc.push('\n');

    toc
}

fn anchor(name: &str) -> String {
    name.replace(['/', '.', ' ', '_'], "-").to_lowercase()
}

/// Generate the sample composition section.
fn generate_composition_section(by_gender: &[GenderSummary]) -> String {
    let mut section = String::new();

    section.push_str("## Sample Composition\n\n");
    if by_gender.is_empty() {
        section.push_str("No rows remained after missing-data handling.\n\n");
        return section;
    }

    section.push_str("| Gender | n | % of Sample | % Incomplete |\n");
    section.push_str("|:---|:---:|:---:|:---:|\n");
    for g in by_gender {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            g.gender.title(),
            g.n,
            g.pct,
            g.missing_pct
        ));
    }
    section.push('\n');

    section
}

/// One-line description of a test result.
fn describe_test(test: &TestResult) -> String {
    let mut line = format!("**Test:** {}", test.name);
    if test.p_value().is_some() {
        line.push_str(&format!(" | statistic = {}", test.statistic));
        if let Some(df) = test.df {
            line.push_str(&format!(" | df = {}", df));
        }
        line.push_str(&format!(" | p = {}", test.p));
        if let Some(p_fdr) = test.p_fdr {
            line.push_str(&format!(" | p (FDR) = {:.4}", p_fdr));
        }
    }
    if !test.assumptions_met && test.p_value().is_some() {
        line.push_str(" | ⚠️ assumptions not met");
    }
    line.push_str("\n\n");

    if let Some(ref note) = test.note {
        line.push_str(&format!("*{}*\n\n", note));
    }
    line
}

fn describe_effects(effects: &[EffectSize]) -> String {
    if effects.is_empty() {
        return String::new();
    }

    let mut block = String::from("**Effect sizes:**\n\n");
    for e in effects {
        block.push_str(&format!("- {} = {} ({})", e.name, e.value, e.interpretation));
        if let (Some(lo), Some(hi)) = (e.ci_lower, e.ci_upper) {
            block.push_str(&format!(", 95% CI [{}, {}]", lo, hi));
        }
        block.push('\n');
    }
    block.push('\n');
    block
}

/// Generate the continuous variables section.
fn generate_continuous_section(results: &[ContinuousResult]) -> String {
    if results.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Continuous Variables\n\n");

    for result in results {
        section.push_str(&format!("### {}\n\n", result.var));

        if !result.table.is_empty() {
            section.push_str("| Gender | n | Mean | SD | Median | IQR | Min | Max |\n");
            section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|:---:|:---:|\n");
            for s in &result.table {
                section.push_str(&format!(
                    "| {} | {} | {} | {} | {} | {} | {} | {} |\n",
                    s.gender.title(),
                    s.n,
                    s.mean,
                    s.sd,
                    s.median,
                    s.iqr,
                    s.min,
                    s.max
                ));
            }
            section.push('\n');
        }

        section.push_str(&describe_test(&result.test));
        section.push_str(&describe_effects(&result.effects));
    }

    section
}

/// Generate the categorical variables section.
fn generate_categorical_section(results: &[CategoricalResult]) -> String {
    if results.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Categorical Variables\n\n");

    for result in results {
        section.push_str(&format!("### {}\n\n", result.var));

        if !result.table.is_empty() {
            section.push_str("| Level | Gender | n | % within Gender |\n");
            section.push_str("|:---|:---|:---:|:---:|\n");
            for row in &result.table {
                section.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    row.level,
                    row.gender.title(),
                    row.n,
                    row.pct
                ));
            }
            section.push('\n');
        }

        section.push_str(&describe_test(&result.test));
        section.push_str(&describe_effects(&result.effects));
    }

    section
}

/// Generate the missing data section.
fn generate_missingness_section(missingness: &[MissingnessInfo]) -> String {
    let mut section = String::new();

    section.push_str("## Missing Data\n\n");
    if missingness.is_empty() {
        section.push_str("No requested variables were found in the dataset.\n\n");
        return section;
    }

    section.push_str("| Variable | Gender | Missing n | Missing % |\n");
    section.push_str("|:---|:---|:---:|:---:|\n");
    for m in missingness {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            m.var,
            m.gender.title(),
            m.missing_n,
            m.missing_pct
        ));
    }
    section.push('\n');

    section
}

/// Generate the diagnostics section.
fn generate_diagnostics_section(diagnostics: &Diagnostics) -> String {
    let mut section = String::new();

    section.push_str("## Diagnostics\n\n");

    section.push_str("### Normality\n\n");
    if diagnostics.normality.is_empty() {
        section.push_str("No group had enough observations for a normality test.\n\n");
    } else {
        section.push_str("| Variable | Gender | Test | Statistic | p |\n");
        section.push_str("|:---|:---|:---|:---:|:---:|\n");
        for n in &diagnostics.normality {
            let statistic = n.statistic.map_or("N/A".to_string(), |s| s.to_string());
            let p = n.p.map_or("N/A".to_string(), |p| p.to_string());
            section.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                n.var,
                n.gender.title(),
                n.test,
                statistic,
                p
            ));
        }
        section.push('\n');
    }

    let mt = &diagnostics.multiple_testing;
    section.push_str("### Multiple Testing\n\n");
    if !mt.adjusted {
        section.push_str("P-values are not adjusted for multiple comparisons.\n\n");
        return section;
    }

    section.push_str(&format!(
        "Method: **{}** (continuous and categorical families corrected separately)\n\n",
        mt.fdr_method
    ));
    section.push_str("| Family | Tests | Significant (raw) | Significant (FDR) |\n");
    section.push_str("|:---|:---:|:---:|:---:|\n");
    if let Some(ref summary) = mt.summary {
        section.push_str(&format!(
            "| Continuous | {} | {} | {} |\n",
            mt.continuous_tests_corrected, summary.continuous_sig_raw, summary.continuous_sig_fdr
        ));
        section.push_str(&format!(
            "| Categorical | {} | {} | {} |\n",
            mt.categorical_tests_corrected,
            summary.categorical_sig_raw,
            summary.categorical_sig_fdr
        ));
    }
    section.push('\n');

    section
}

/// Generate the bias assessment section.
fn generate_bias_section(bias: &BiasAssessment) -> String {
    let mut section = String::new();

    section.push_str("## Gender Bias Assessment\n\n");
    section.push_str(&bias.overall_summary);
    section.push_str("\n\n");

    if !bias.statistical_disparities.is_empty() {
        section.push_str("### Statistical Disparities\n\n");
        section.push_str("| Variable | Type | p | Effect | Severity |\n");
        section.push_str("|:---|:---|:---:|:---:|:---:|\n");
        for d in &bias.statistical_disparities {
            let effect = d.effect_size.map_or("N/A".to_string(), |e| e.to_string());
            section.push_str(&format!(
                "| {} | {} | {:.4} | {} | {} {} |\n",
                d.variable,
                d.kind,
                d.p_value,
                effect,
                d.severity.emoji(),
                d.severity
            ));
        }
        section.push('\n');
        for d in &bias.statistical_disparities {
            section.push_str(&format!("- {}\n", d.interpretation));
        }
        section.push('\n');
    }

    if !bias.representation_gaps.is_empty() {
        section.push_str("### Representation Gaps\n\n");
        for gap in &bias.representation_gaps {
            let label = match gap {
                RepresentationGap::RepresentationImbalance { .. } => "Sample",
                RepresentationGap::LevelRepresentation { .. } => "Level",
            };
            section.push_str(&format!("- **{}:** {}\n", label, gap.interpretation()));
        }
        section.push('\n');
    }

    if !bias.missing_data_bias.is_empty() {
        section.push_str("### Missing Data Bias\n\n");
        for m in &bias.missing_data_bias {
            section.push_str(&format!("- {}\n", m.interpretation));
        }
        section.push('\n');
    }

    if !bias.practical_significance.is_empty() {
        section.push_str("### Practical Significance\n\n");
        for p in &bias.practical_significance {
            section.push_str(&format!("- {}\n", p.interpretation));
        }
        section.push('\n');
    }

    if !bias.recommendations.is_empty() {
        section.push_str("### Recommendations\n\n");
        for (i, rec) in bias.recommendations.iter().enumerate() {
            section.push_str(&format!("{}. {}\n", i + 1, rec));
        }
        section.push('\n');
    }

    if !bias.insights.is_empty() {
        section.push_str("### Insights\n\n");
        for insight in &bias.insights {
            section.push_str(&format!("> {}\n\n", insight));
        }
    }

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by GenderLens v{}. Cells shown as `<n` are suppressed to protect small groups.*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered report content to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create report file {}", path.display()))?;
    file.write_all(content.as_bytes())?;

    Ok(())
}
