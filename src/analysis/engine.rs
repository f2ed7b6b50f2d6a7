//! Analysis orchestration.
//!
//! Runs one request against one dataset: normalize genders, apply the
//! missing-data policy, then summarize and test every requested variable
//! independently. A variable that cannot be analysed yields a result with
//! an explanatory note; it never aborts the run.

use super::bias::assess_bias;
use super::groups::{GenderGroups, GroupSample};
use super::normality::{any_rejects, assess_normality};
use super::selector::{run_categorical, run_continuous};
use super::summarizer::{
    analyze_missingness, summarize_by_gender, summarize_categorical, summarize_continuous,
};
use crate::dataset::{apply_missing_policy, Dataset, GenderNormalizer};
use crate::models::{
    AnalysisReport, AnalysisRequest, AnalysisResults, CategoricalResult, ContinuousResult,
    Diagnostics, MultipleTesting, ReportMetadata, TestResult,
};
use crate::session::{SessionError, SessionStore};
use crate::stats::effects::{categorical_effects, continuous_effects};
use crate::stats::fdr::apply_fdr;
use chrono::Utc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Conditions that stop a run before any variable is analysed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("gender column '{0}' not found in dataset")]
    GenderColumnMissing(String),
}

fn not_found_note(var: &str) -> TestResult {
    TestResult::insufficient(&format!("Variable '{}' not found in dataset", var))
}

/// Analyse `dataset` as described by `request`. `on_variable` is called
/// with each variable name before it is analysed.
pub fn analyze<F>(
    dataset: &Dataset,
    request: &AnalysisRequest,
    mut on_variable: F,
) -> Result<AnalysisResults, AnalysisError>
where
    F: FnMut(&str),
{
    let request = request.normalized();
    request.validate().map_err(AnalysisError::InvalidRequest)?;

    let gender_col = request.gender_col.as_str();
    let normalized = GenderNormalizer::new(&request.gender_map)
        .apply(dataset, gender_col)
        .ok_or_else(|| AnalysisError::GenderColumnMissing(gender_col.to_string()))?;

    let working = apply_missing_policy(
        &normalized,
        request.missing_policy,
        request.impute.as_ref(),
        &request.vars_categorical,
    );
    // Same rows as `working`, but without flagged levels or imputed cells,
    // so missingness stays observable.
    let observed = apply_missing_policy(&normalized, request.missing_policy, None, &[]);
    info!(
        "Analysing {} of {} rows ({} policy)",
        working.n_rows(),
        dataset.n_rows(),
        request.missing_policy
    );

    let groups = GenderGroups::new(&working, gender_col)
        .ok_or_else(|| AnalysisError::GenderColumnMissing(gender_col.to_string()))?;
    let order = request.categories_order.as_slice();
    let threshold = request.suppress_threshold;
    let variables = request.all_variables();

    let weights = match request.weight_col.as_deref() {
        Some(name) => {
            let column = working.column(name);
            if column.is_none() {
                warn!("Weight column '{}' not found, using unweighted statistics", name);
            }
            column
        }
        None => None,
    };

    let by_gender = summarize_by_gender(&observed, &groups, order, &variables);
    let mut normality = Vec::new();

    let mut continuous = Vec::with_capacity(request.vars_continuous.len());
    for var in &request.vars_continuous {
        on_variable(var);
        let Some(column) = working.column(var) else {
            warn!("Continuous variable '{}' not found", var);
            continuous.push(ContinuousResult {
                var: var.clone(),
                table: Vec::new(),
                test: not_found_note(var),
                effects: Vec::new(),
            });
            continue;
        };

        let samples: Vec<GroupSample> = groups.continuous_samples(column, order, weights);
        let tests = assess_normality(var, &samples);
        let normal = !any_rejects(var, &tests);
        normality.extend(tests);

        let test = run_continuous(&samples, normal);
        debug!("{}: {} selected", var, test.name);
        let values: Vec<&[f64]> = samples.iter().map(|s| s.values.as_slice()).collect();
        continuous.push(ContinuousResult {
            var: var.clone(),
            table: summarize_continuous(&samples, threshold),
            test,
            effects: continuous_effects(&values),
        });
    }

    let mut categorical = Vec::with_capacity(request.vars_categorical.len());
    for var in &request.vars_categorical {
        on_variable(var);
        let Some(column) = working.column(var) else {
            warn!("Categorical variable '{}' not found", var);
            categorical.push(CategoricalResult {
                var: var.clone(),
                table: Vec::new(),
                test: not_found_note(var),
                effects: Vec::new(),
            });
            continue;
        };

        let table = groups.contingency(column, order);
        let test = run_categorical(&table);
        debug!("{}: {} selected", var, test.name);
        categorical.push(CategoricalResult {
            var: var.clone(),
            table: summarize_categorical(column, &groups, order, threshold),
            test,
            effects: categorical_effects(&table),
        });
    }

    let multiple_testing = if request.fdr {
        apply_fdr(&mut continuous, &mut categorical)
    } else {
        MultipleTesting::unadjusted()
    };

    let mut results = AnalysisResults {
        rows_analyzed: working.n_rows(),
        by_gender,
        continuous,
        categorical,
        missingness: analyze_missingness(&observed, &groups, order, &variables),
        diagnostics: Diagnostics {
            normality,
            multiple_testing,
        },
        gender_bias: None,
    };

    if request.assess_bias {
        results.gender_bias = Some(assess_bias(&results));
    }

    Ok(results)
}

/// Analyse the dataset held by a session and store the report on it.
pub fn analyze_session<S, F>(
    store: &S,
    session_id: &str,
    request: &AnalysisRequest,
    on_variable: F,
) -> Result<AnalysisReport, SessionError>
where
    S: SessionStore + ?Sized,
    F: FnMut(&str),
{
    let session = store.get(session_id)?;
    let analysis_date = Utc::now();
    let started = Instant::now();

    let results = analyze(&session.dataset, request, on_variable)?;

    let report = AnalysisReport {
        metadata: ReportMetadata {
            session_id: session_id.to_string(),
            dataset: session.metadata.dataset_name.clone(),
            rows_loaded: session.dataset.n_rows(),
            analysis_date,
            duration_seconds: started.elapsed().as_secs_f64(),
        },
        settings: request.normalized(),
        results,
    };
    store.update(session_id, report.clone())?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::gender::default_mappings;
    use crate::dataset::loader::parse_csv;
    use crate::models::{EffectKind, GenderCategory, MissingPolicy, Reported, TestKind};
    use crate::session::{InMemorySessionStore, SessionMetadata};
    use statrs::distribution::{ContinuousCDF, Normal};

    fn normal_quantiles(n: usize, mean: f64, sd: f64) -> Vec<f64> {
        let dist = Normal::new(0.0, 1.0).unwrap();
        (0..n)
            .map(|i| mean + sd * dist.inverse_cdf((i as f64 + 0.5) / n as f64))
            .collect()
    }

    fn csv_of(groups: &[(&str, Vec<f64>)]) -> Dataset {
        let mut text = String::from("Gender,Score\n");
        for (label, values) in groups {
            for v in values {
                text.push_str(&format!("{},{}\n", label, v));
            }
        }
        parse_csv("scores.csv", &text).unwrap()
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            gender_map: default_mappings(),
            vars_continuous: vec!["score".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_two_normal_groups_use_welch() {
        let ds = csv_of(&[
            ("F", normal_quantiles(50, 10.0, 2.0)),
            ("M", normal_quantiles(50, 12.0, 2.0)),
        ]);
        let results = analyze(&ds, &request(), |_| {}).unwrap();
        let score = &results.continuous[0];

        assert_eq!(score.test.name, TestKind::WelchTTest);
        assert!(score.test.assumptions_met);
        assert!(score.test.p_value().unwrap() < 0.001);
        assert_eq!(score.table.len(), 2);
        assert_eq!(score.effects[0].name, EffectKind::CohensD);
        assert!(score.effects[0].value < -0.8);
        assert_eq!(results.diagnostics.normality.len(), 2);
        assert!(results.diagnostics.normality.iter().all(|n| !n.rejects_normality()));
        assert_eq!(results.rows_analyzed, 100);
    }

    #[test]
    fn test_small_group_is_suppressed_but_tested() {
        let ds = csv_of(&[
            ("female", normal_quantiles(50, 10.0, 2.0)),
            ("male", vec![12.0, 13.0, 14.0, 15.0]),
        ]);
        let results = analyze(&ds, &request(), |_| {}).unwrap();
        let score = &results.continuous[0];

        assert!(!score.table[0].is_suppressed());
        assert!(score.table[1].is_suppressed());
        assert_eq!(score.table[1].mean.to_string(), "<5");
        assert_eq!(score.test.name, TestKind::WelchTTest);
        assert!(score.test.p_value().is_some());
        assert!(!score.effects.is_empty());
    }

    #[test]
    fn test_sparse_two_by_two_uses_fisher() {
        let mut text = String::from("gender,smoker\n");
        for (g, level, n) in [("f", "yes", 3), ("f", "no", 7), ("m", "yes", 3), ("m", "no", 7)] {
            for _ in 0..n {
                text.push_str(&format!("{},{}\n", g, level));
            }
        }
        let ds = parse_csv("t.csv", &text).unwrap();
        let request = AnalysisRequest {
            gender_map: default_mappings(),
            vars_categorical: vec!["Smoker".to_string()],
            ..Default::default()
        };
        let results = analyze(&ds, &request, |_| {}).unwrap();
        let smoker = &results.categorical[0];

        assert_eq!(smoker.test.name, TestKind::FisherExact);
        assert_eq!(smoker.test.p, Reported::Value(1.0));
        assert_eq!(smoker.table.len(), 4);
        let or = smoker
            .effects
            .iter()
            .find(|e| e.name == EffectKind::OddsRatio)
            .unwrap();
        assert_eq!(or.value, 1.0);
    }

    #[test]
    fn test_non_normal_group_selects_kruskal_wallis() {
        let mut skewed = vec![1.0; 9];
        skewed.push(50.0);
        let ds = csv_of(&[
            ("female", normal_quantiles(20, 10.0, 2.0)),
            ("male", normal_quantiles(20, 11.0, 2.0)),
            ("non-binary", skewed),
        ]);
        let results = analyze(&ds, &request(), |_| {}).unwrap();
        let score = &results.continuous[0];

        assert_eq!(score.test.name, TestKind::KruskalWallis);
        assert_eq!(score.table.len(), 3);
        assert_eq!(score.table[2].gender, GenderCategory::Other);
        let kinds: Vec<EffectKind> = score.effects.iter().map(|e| e.name).collect();
        assert_eq!(kinds, vec![EffectKind::EtaSquared, EffectKind::EpsilonSquared]);
    }

    #[test]
    fn test_missing_variable_is_reported_not_fatal() {
        let ds = csv_of(&[("f", vec![1.0, 2.0, 3.0]), ("m", vec![2.0, 3.0, 4.0])]);
        let request = AnalysisRequest {
            vars_continuous: vec!["height".to_string(), "score".to_string()],
            ..request()
        };
        let mut seen = Vec::new();
        let results = analyze(&ds, &request, |v| seen.push(v.to_string())).unwrap();

        assert_eq!(seen, vec!["height", "score"]);
        let height = &results.continuous[0];
        assert_eq!(height.test.name, TestKind::InsufficientData);
        assert_eq!(
            height.test.note.as_deref(),
            Some("Variable 'height' not found in dataset")
        );
        assert!(height.table.is_empty());
        assert_eq!(results.continuous[1].test.name, TestKind::WelchTTest);
    }

    #[test]
    fn test_missing_gender_column_is_an_error() {
        let ds = csv_of(&[("f", vec![1.0])]);
        let request = AnalysisRequest {
            gender_col: "sex".to_string(),
            ..request()
        };
        assert_eq!(
            analyze(&ds, &request, |_| {}),
            Err(AnalysisError::GenderColumnMissing("sex".to_string()))
        );
    }

    #[test]
    fn test_listwise_and_pairwise_row_counts() {
        let ds = parse_csv(
            "t.csv",
            "gender,score,group\nf,1,a\nf,,a\nm,3,\nm,4,b\nf,5,b\nm,6,a\n",
        )
        .unwrap();
        let listwise = analyze(&ds, &request(), |_| {}).unwrap();
        assert_eq!(listwise.rows_analyzed, 4);

        let pairwise = AnalysisRequest {
            missing_policy: MissingPolicy::Pairwise,
            ..request()
        };
        let results = analyze(&ds, &pairwise, |_| {}).unwrap();
        assert_eq!(results.rows_analyzed, 6);
        let female = results
            .missingness
            .iter()
            .find(|m| m.gender == GenderCategory::Female)
            .unwrap();
        assert_eq!(female.missing_n, 1);
    }

    #[test]
    fn test_flag_policy_adds_missing_level() {
        let ds = parse_csv(
            "t.csv",
            "gender,region\nf,north\nf,\nm,south\nm,north\n",
        )
        .unwrap();
        let request = AnalysisRequest {
            gender_map: default_mappings(),
            vars_categorical: vec!["region".to_string()],
            missing_policy: MissingPolicy::Flag,
            suppress_threshold: 1,
            ..Default::default()
        };
        let results = analyze(&ds, &request, |_| {}).unwrap();
        assert!(results.categorical[0]
            .table
            .iter()
            .any(|row| row.level == "missing" && row.gender == GenderCategory::Female));
    }

    #[test]
    fn test_flag_policy_keeps_missingness_observable() {
        let mut text = String::from("gender,region\n");
        for i in 0..20 {
            let region = if i % 2 == 0 { "" } else { "north" };
            text.push_str(&format!("female,{}\n", region));
        }
        for _ in 0..20 {
            text.push_str("male,north\n");
        }
        let ds = parse_csv("t.csv", &text).unwrap();
        let request = AnalysisRequest {
            gender_map: default_mappings(),
            vars_categorical: vec!["region".to_string()],
            missing_policy: MissingPolicy::Flag,
            ..Default::default()
        };
        let results = analyze(&ds, &request, |_| {}).unwrap();

        let female = results
            .missingness
            .iter()
            .find(|m| m.var == "region" && m.gender == GenderCategory::Female)
            .unwrap();
        assert_eq!(female.missing_n, 10);
        assert_eq!(female.missing_pct, 50.0);
        assert_eq!(results.by_gender[0].missing_pct, 50.0);
        assert_eq!(results.by_gender[1].missing_pct, 0.0);

        // the explicit level is still reported
        assert!(results.categorical[0]
            .table
            .iter()
            .any(|row| row.level == "missing" && row.n == Reported::Value(10)));

        let bias = results.gender_bias.unwrap();
        assert_eq!(bias.missing_data_bias.len(), 1);
        assert_eq!(bias.missing_data_bias[0].max_missing_gender, GenderCategory::Female);
    }

    #[test]
    fn test_pairwise_level_percentages_use_group_total() {
        let mut text = String::from("gender,region\n");
        for i in 0..10 {
            let region = if i < 2 { "" } else { "north" };
            text.push_str(&format!("female,{}\n", region));
        }
        for _ in 0..10 {
            text.push_str("male,south\n");
        }
        let ds = parse_csv("t.csv", &text).unwrap();
        let request = AnalysisRequest {
            gender_map: default_mappings(),
            vars_categorical: vec!["region".to_string()],
            missing_policy: MissingPolicy::Pairwise,
            ..Default::default()
        };
        let results = analyze(&ds, &request, |_| {}).unwrap();
        let north = results.categorical[0]
            .table
            .iter()
            .find(|row| row.level == "north" && row.gender == GenderCategory::Female)
            .unwrap();
        assert_eq!(north.n, Reported::Value(8));
        assert_eq!(north.pct, Reported::Value(80.0));
    }

    #[test]
    fn test_skewed_group_selects_mann_whitney() {
        let mut skewed = vec![1.0; 9];
        skewed.push(50.0);
        let ds = csv_of(&[("female", normal_quantiles(30, 10.0, 2.0)), ("male", skewed)]);
        let results = analyze(&ds, &request(), |_| {}).unwrap();
        let score = &results.continuous[0];

        assert_eq!(score.test.name, TestKind::MannWhitney);
        assert!(score.test.p_value().is_some());
        assert!(results
            .diagnostics
            .normality
            .iter()
            .any(|n| n.gender == GenderCategory::Male && n.rejects_normality()));
        let kinds: Vec<EffectKind> = score.effects.iter().map(|e| e.name).collect();
        assert_eq!(kinds, vec![EffectKind::CohensD, EffectKind::HedgesG]);
    }

    #[test]
    fn test_fdr_and_bias_blocks() {
        let ds = csv_of(&[
            ("f", normal_quantiles(50, 10.0, 2.0)),
            ("m", normal_quantiles(50, 14.0, 2.0)),
        ]);
        let with_fdr = AnalysisRequest {
            fdr: true,
            ..request()
        };
        let results = analyze(&ds, &with_fdr, |_| {}).unwrap();
        let mt = &results.diagnostics.multiple_testing;
        assert!(mt.adjusted);
        assert_eq!(mt.continuous_tests_corrected, 1);
        assert_eq!(results.continuous[0].test.fdr_method.as_deref(), Some("BH"));

        let bias = results.gender_bias.unwrap();
        assert_eq!(bias.statistical_disparities.len(), 1);
        assert_eq!(bias.practical_significance.len(), 1);

        let without_bias = AnalysisRequest {
            assess_bias: false,
            ..request()
        };
        let results = analyze(&ds, &without_bias, |_| {}).unwrap();
        assert!(results.gender_bias.is_none());
        assert!(!results.diagnostics.multiple_testing.adjusted);
    }

    #[test]
    fn test_analyze_session_stores_report() {
        let store = InMemorySessionStore::with_ttl_minutes(10);
        let ds = csv_of(&[("f", vec![1.0, 2.0, 3.0]), ("m", vec![4.0, 5.0, 6.0])]);
        let metadata = SessionMetadata::for_dataset(&ds);
        let id = store.create(ds, metadata);

        let report = analyze_session(&store, &id, &request(), |_| {}).unwrap();
        assert_eq!(report.metadata.session_id, id);
        assert_eq!(report.metadata.dataset, "scores.csv");
        assert_eq!(report.metadata.rows_loaded, 6);
        assert!(store.get(&id).unwrap().report.is_some());

        assert!(matches!(
            analyze_session(&store, "missing", &request(), |_| {}),
            Err(SessionError::NotFound(_))
        ));
    }
}
