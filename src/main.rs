//! GenderLens - gender-stratified statistical analysis
//!
//! A CLI tool that loads a tabular dataset, summarizes each variable by
//! gender, runs the appropriate hypothesis tests and reports effect
//! sizes alongside a gender bias assessment.
//!
//! Exit codes:
//!   0 - Success (no disparities, or no --fail-on-disparity set)
//!   1 - Runtime error (unreadable dataset, bad config, invalid request, etc.)
//!   2 - Statistical disparities found with --fail-on-disparity

mod analysis;
mod cli;
mod config;
mod dataset;
mod models;
mod report;
mod session;
mod stats;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use models::AnalysisResults;
use session::{InMemorySessionStore, SessionMetadata, SessionStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("GenderLens v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_analysis(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .genderlens.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set variables, gender mappings, imputation and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings. Returns false when a
/// subscriber was already installed; the run continues either way.
fn init_logging(args: &Args) -> bool {
    let level = LevelFilter::from_level(args.log_level());

    // RUST_LOG takes precedence over --verbose/--quiet
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    match tracing::subscriber::set_global_default(subscriber) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("⚠️  Logging not initialized: {}", e);
            false
        }
    }
}

/// Run the complete analysis workflow. Returns exit code (0 or 2).
async fn run_analysis(args: Args) -> Result<i32> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let data_path = args
        .data
        .clone()
        .context("A dataset is required (--data)")?;

    // Step 1: Load the dataset
    println!("📥 Loading dataset: {}", data_path.display());
    let dataset = dataset::load_csv(&data_path, config.general.max_file_size_mb)
        .with_context(|| format!("Failed to load dataset {}", data_path.display()))?;
    info!(
        "Loaded {} rows x {} columns",
        dataset.n_rows(),
        dataset.n_columns()
    );

    // Handle --inspect: print the inferred schema and exit
    if args.inspect {
        return handle_inspect(&dataset);
    }

    // Step 2: Register a session
    let store = Arc::new(InMemorySessionStore::with_ttl_minutes(
        config.session.ttl_minutes,
    ));
    let reaper = session::spawn_reaper(
        store.clone(),
        std::time::Duration::from_secs(config.session.cleanup_interval_secs.max(1)),
    );

    let metadata = SessionMetadata::for_dataset(&dataset);
    let session_id = store.create(dataset, metadata);
    debug!("Session {} created", session_id);

    let request = config.to_request();
    if request.vars_continuous.is_empty() && request.vars_categorical.is_empty() {
        warn!("No variables selected; only the gender composition will be reported");
    }

    // Step 3: Run the analysis
    println!("\n🔬 Running analysis...");
    println!("   Gender column: {}", request.gender_col);
    println!("   Missing-data policy: {}", request.missing_policy);
    println!(
        "   Variables: {} continuous, {} categorical",
        request.vars_continuous.len(),
        request.vars_categorical.len()
    );

    let pb = progress_bar(request.all_variables().len() as u64, args.quiet);
    let analyzed = analysis::analyze_session(&*store, &session_id, &request, |var| {
        pb.set_message(var.to_string());
        pb.inc(1);
    });
    pb.finish_and_clear();
    let report = analyzed.context("Analysis did not complete")?;

    // Step 4: Generate and save the report
    println!("\n📝 Generating report...");
    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(
            &report,
            &report::MarkdownOptions::from(&config.report),
        ),
    };

    let output_path = PathBuf::from(&config.general.output);
    report::write_report(&output, &output_path)?;

    if let Some(ref dir) = args.export_dir {
        let paths = report::write_exports(&report, dir)?;
        println!("   Exported {}", paths.wide_csv.display());
        println!("   Exported {}", paths.long_csv.display());
        println!("   Exported {}", paths.metadata_json.display());
    }

    print_summary(&report.results, report.metadata.duration_seconds);
    println!(
        "\n✅ Analysis complete! Report saved to: {}",
        output_path.display()
    );

    let purged = store.purge_all();
    debug!("Purged {} session(s)", purged);
    reaper.abort();

    // Check --fail-on-disparity
    if args.fail_on_disparity {
        let disparities = count_disparities(&report.results);
        if disparities > 0 {
            eprintln!(
                "\n⛔ {} statistical disparit{} found. Failing (exit code 2).",
                disparities,
                if disparities == 1 { "y" } else { "ies" }
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Handle --inspect: print column types and gender candidates, exit.
fn handle_inspect(dataset: &dataset::Dataset) -> Result<i32> {
    let schema = dataset::schema::infer_schema(dataset);

    println!("\n🔍 Inspecting {} ({} rows)\n", dataset.name, schema.rows);
    for var in &schema.variables {
        println!(
            "   📄 {} [{}] {} unique, {:.2}% missing, e.g. {}",
            var.name,
            var.variable_type,
            var.unique_n,
            var.missing_pct,
            var.sample_values
                .iter()
                .take(3)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    if schema.gender_candidates.is_empty() {
        println!("\n   No likely gender columns found.");
    } else {
        println!(
            "\n   Likely gender columns: {}",
            schema.gender_candidates.join(", ")
        );
    }

    println!("\n✅ Inspection complete. No analysis was run.");
    Ok(0)
}

fn progress_bar(len: u64, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

fn print_summary(results: &AnalysisResults, duration: f64) {
    println!("\n📊 Analysis Summary:");
    println!("   Rows analyzed: {}", results.rows_analyzed);
    for group in &results.by_gender {
        println!(
            "   - {}: {} ({:.2}%)",
            group.gender.title(),
            group.n,
            group.pct
        );
    }
    println!(
        "   Tests: {} continuous, {} categorical",
        results.continuous.len(),
        results.categorical.len()
    );

    if let Some(ref bias) = results.gender_bias {
        println!("   {}", bias.overall_summary);
        for d in &bias.statistical_disparities {
            println!("   {} {} (p={})", d.severity.emoji(), d.variable, d.p_value);
        }
    }
    println!("   Duration: {:.1}s", duration);
}

/// Significant tests, using adjusted p-values when present.
fn count_disparities(results: &AnalysisResults) -> usize {
    if let Some(ref bias) = results.gender_bias {
        return bias.statistical_disparities.len();
    }
    let significant = |p: Option<f64>| matches!(p, Some(p) if p < stats::fdr::ALPHA);
    results
        .continuous
        .iter()
        .filter(|r| significant(r.test.decision_p()))
        .count()
        + results
            .categorical
            .iter()
            .filter(|r| significant(r.test.decision_p()))
            .count()
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::generator::tests::create_test_report;
    use clap::Parser;

    #[test]
    fn test_init_logging_twice_does_not_panic() {
        let args = Args::try_parse_from(["genderlens", "--init-config", "--quiet"]).unwrap();
        init_logging(&args);
        assert!(!init_logging(&args));
    }

    #[test]
    fn test_count_disparities_prefers_bias_block() {
        let report = create_test_report();
        let expected = report
            .results
            .gender_bias
            .as_ref()
            .map(|b| b.statistical_disparities.len())
            .unwrap_or(0);
        assert_eq!(count_disparities(&report.results), expected);
    }

    #[test]
    fn test_count_disparities_without_bias_block() {
        let mut report = create_test_report();
        report.results.gender_bias = None;
        let manual = report
            .results
            .continuous
            .iter()
            .map(|r| &r.test)
            .chain(report.results.categorical.iter().map(|r| &r.test))
            .filter(|t| matches!(t.decision_p(), Some(p) if p < 0.05))
            .count();
        assert_eq!(count_disparities(&report.results), manual);
    }
}
