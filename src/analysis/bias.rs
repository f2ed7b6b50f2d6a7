//! Gender bias assessment.
//!
//! Pure aggregation over the results of one run. Every finding is
//! triggered by a fixed threshold; recommendations and insights are
//! template text selected by which finding lists are non-empty.

use crate::models::{
    AnalysisResults, BiasAssessment, CategoricalResult, ContinuousResult, Disparity, EffectKind,
    EffectSize, GenderCategory, GenderSummary, MissingDataBias, MissingnessInfo,
    PracticalSignificance, RepresentationGap, Severity, VariableKind,
};
use crate::stats::fdr::ALPHA;
use crate::stats::round_to;

/// Share of the whole sample above which one gender is over-represented.
pub const REPRESENTATION_PCT: f64 = 60.0;

/// Share of one categorical level above which one gender dominates it.
pub const LEVEL_REPRESENTATION_PCT: f64 = 70.0;

/// Missing-percentage spread across genders that counts as differential.
pub const MISSING_DIFF_PCT: f64 = 10.0;

/// Relative difference in group means that counts as practically relevant.
pub const PRACTICAL_DIFF_PCT: f64 = 20.0;

/// Build the full assessment from computed results.
pub fn assess_bias(results: &AnalysisResults) -> BiasAssessment {
    let mut assessment = BiasAssessment {
        statistical_disparities: statistical_disparities(&results.continuous, &results.categorical),
        representation_gaps: representation_gaps(&results.by_gender, &results.categorical),
        missing_data_bias: missing_data_bias(&results.missingness),
        practical_significance: practical_significance(&results.continuous),
        ..Default::default()
    };
    assessment.recommendations = recommendations(&assessment);
    assessment.insights = insights(
        &assessment,
        results.continuous.len() + results.categorical.len(),
    );
    assessment.overall_summary = overall_summary(&assessment);
    assessment
}

fn find_effect<'a>(effects: &'a [EffectSize], kinds: &[EffectKind]) -> Option<&'a EffectSize> {
    effects.iter().find(|e| kinds.contains(&e.name))
}

/// Severity of a significant continuous result. Two-group results are
/// banded on |d| (0.5 / 0.8), multi-group results on eta-squared
/// (0.06 / 0.14). Without an effect size the disparity is moderate.
fn continuous_severity(effect: Option<&EffectSize>) -> Severity {
    match effect {
        Some(e) if matches!(e.name, EffectKind::CohensD | EffectKind::HedgesG) => {
            match e.value.abs() {
                x if x >= 0.8 => Severity::Large,
                x if x >= 0.5 => Severity::Moderate,
                _ => Severity::Small,
            }
        }
        Some(e) => match e.value {
            x if x >= 0.14 => Severity::Large,
            x if x >= 0.06 => Severity::Moderate,
            _ => Severity::Small,
        },
        None => Severity::Moderate,
    }
}

/// Severity of a significant categorical result, banded on Cramér's V.
fn categorical_severity(effect: Option<&EffectSize>) -> Severity {
    match effect {
        Some(e) => match e.value {
            x if x >= 0.5 => Severity::Large,
            x if x >= 0.3 => Severity::Moderate,
            _ => Severity::Small,
        },
        None => Severity::Moderate,
    }
}

fn effect_sentence(effect: Option<&EffectSize>, fallback: &str) -> String {
    match effect {
        Some(e) => format!("{} = {} ({} effect).", e.name, e.value, e.interpretation),
        None => fallback.to_string(),
    }
}

/// Every test significant at alpha = 0.05, using the FDR-adjusted
/// p-value when one is present.
pub fn statistical_disparities(
    continuous: &[ContinuousResult],
    categorical: &[CategoricalResult],
) -> Vec<Disparity> {
    let mut disparities = Vec::new();

    for result in continuous {
        let Some(p) = result.test.decision_p().filter(|&p| p < ALPHA) else {
            continue;
        };
        let effect = find_effect(
            &result.effects,
            &[EffectKind::CohensD, EffectKind::HedgesG, EffectKind::EtaSquared],
        );
        disparities.push(Disparity {
            variable: result.var.clone(),
            kind: VariableKind::Continuous,
            p_value: p,
            effect_size: effect.map(|e| e.value),
            effect_interpretation: effect.map(|e| e.interpretation.clone()),
            severity: continuous_severity(effect),
            interpretation: format!(
                "Statistically significant difference found in {} (p={:.4}). {}",
                result.var,
                p,
                effect_sentence(effect, "Effect size indicates practical significance.")
            ),
        });
    }

    for result in categorical {
        let Some(p) = result.test.decision_p().filter(|&p| p < ALPHA) else {
            continue;
        };
        let effect = find_effect(&result.effects, &[EffectKind::CramersV]);
        disparities.push(Disparity {
            variable: result.var.clone(),
            kind: VariableKind::Categorical,
            p_value: p,
            effect_size: effect.map(|e| e.value),
            effect_interpretation: effect.map(|e| e.interpretation.clone()),
            severity: categorical_severity(effect),
            interpretation: format!(
                "Statistically significant association found between {} and gender (p={:.4}). {}",
                result.var,
                p,
                effect_sentence(
                    effect,
                    "This indicates gender-based differences in distribution."
                )
            ),
        });
    }

    disparities
}

/// Overall imbalance (>60% of the sample) and per-level dominance (>70%
/// of a level's unsuppressed counts).
pub fn representation_gaps(
    by_gender: &[GenderSummary],
    categorical: &[CategoricalResult],
) -> Vec<RepresentationGap> {
    let mut gaps = Vec::new();

    let total: usize = by_gender.iter().map(|g| g.n).sum();
    if total == 0 {
        return gaps;
    }

    for summary in by_gender.iter().filter(|g| g.pct > REPRESENTATION_PCT) {
        gaps.push(RepresentationGap::RepresentationImbalance {
            gender: summary.gender,
            percentage: summary.pct,
            interpretation: format!(
                "{} participants represent {:.1}% of the sample, indicating potential sampling bias \
                 or population characteristics that may limit generalizability.",
                summary.gender.title(),
                summary.pct
            ),
        });
    }

    for result in categorical {
        let mut levels: Vec<&str> = Vec::new();
        for row in &result.table {
            if !levels.contains(&row.level.as_str()) {
                levels.push(&row.level);
            }
        }

        for level in levels {
            let counts: Vec<(GenderCategory, usize)> = result
                .table
                .iter()
                .filter(|r| r.level == level)
                .filter_map(|r| r.n.value().map(|n| (r.gender, n)))
                .collect();
            let level_total: usize = counts.iter().map(|(_, n)| n).sum();
            if level_total == 0 {
                continue;
            }
            for (gender, n) in counts {
                let pct = n as f64 / level_total as f64 * 100.0;
                if pct > LEVEL_REPRESENTATION_PCT {
                    gaps.push(RepresentationGap::LevelRepresentation {
                        variable: result.var.clone(),
                        level: level.to_string(),
                        gender,
                        percentage: round_to(pct, 1),
                        interpretation: format!(
                            "In {}, the level '{}' shows {} representation of {:.1}%, indicating \
                             potential gender-based differences in this category.",
                            result.var,
                            level,
                            gender.title(),
                            pct
                        ),
                    });
                }
            }
        }
    }

    gaps
}

/// Variables whose missing percentage differs by more than ten points
/// between the most and least affected gender.
pub fn missing_data_bias(missingness: &[MissingnessInfo]) -> Vec<MissingDataBias> {
    let mut variables: Vec<&str> = Vec::new();
    for info in missingness {
        if !variables.contains(&info.var.as_str()) {
            variables.push(&info.var);
        }
    }

    variables
        .into_iter()
        .filter_map(|var| {
            let rows: Vec<&MissingnessInfo> =
                missingness.iter().filter(|m| m.var == var).collect();
            if rows.len() < 2 {
                return None;
            }
            let max = rows
                .iter()
                .copied()
                .reduce(|best, m| if m.missing_pct > best.missing_pct { m } else { best })?;
            let min_pct = rows
                .iter()
                .map(|m| m.missing_pct)
                .fold(f64::INFINITY, f64::min);
            let difference = max.missing_pct - min_pct;
            if difference <= MISSING_DIFF_PCT {
                return None;
            }
            Some(MissingDataBias {
                variable: var.to_string(),
                max_missing_gender: max.gender,
                max_missing_pct: max.missing_pct,
                min_missing_pct: min_pct,
                difference: round_to(difference, 2),
                interpretation: format!(
                    "Differential missing data pattern in {}: {} group has {:.1}% missing data \
                     compared to {:.1}% in other groups. This {:.1} percentage point difference may \
                     indicate systematic data collection or response patterns that could introduce bias.",
                    var,
                    max.gender.title(),
                    max.missing_pct,
                    min_pct,
                    difference
                ),
            })
        })
        .collect()
}

/// Continuous variables whose largest and smallest reported group means
/// differ by more than 20% of the smaller mean. Suppressed rows do not
/// contribute.
pub fn practical_significance(continuous: &[ContinuousResult]) -> Vec<PracticalSignificance> {
    continuous
        .iter()
        .filter_map(|result| {
            let means: Vec<f64> = result.table.iter().filter_map(|s| s.mean.value()).collect();
            if means.len() < 2 {
                return None;
            }
            let max = means.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let min = means.iter().copied().fold(f64::INFINITY, f64::min);
            if min == 0.0 {
                return None;
            }
            let relative = (max - min) / min.abs() * 100.0;
            (relative > PRACTICAL_DIFF_PCT).then(|| PracticalSignificance {
                variable: result.var.clone(),
                kind: VariableKind::Continuous,
                relative_difference: round_to(relative, 2),
                interpretation: format!(
                    "Substantial practical difference in {}: {:.1}% relative difference between \
                     gender groups. This may have meaningful implications for policy or \
                     programmatic interventions.",
                    result.var, relative
                ),
            })
        })
        .collect()
}

/// Actionable recommendations. The last three are always included.
pub fn recommendations(assessment: &BiasAssessment) -> Vec<String> {
    let mut recs = Vec::new();

    if assessment
        .statistical_disparities
        .iter()
        .any(|d| d.severity == Severity::Large)
    {
        recs.push(
            "Consider conducting intersectional analysis to understand how gender interacts with \
             other social determinants (e.g., age, education, socioeconomic status) to produce \
             observed differences."
                .to_string(),
        );
        recs.push(
            "Engage with affected communities to understand the root causes of observed gender \
             differences and co-design interventions that address structural barriers."
                .to_string(),
        );
    }

    if !assessment.representation_gaps.is_empty() {
        recs.push(
            "Review sampling and recruitment strategies to ensure equitable representation across \
             gender groups, particularly for underrepresented populations."
                .to_string(),
        );
    }

    if !assessment.missing_data_bias.is_empty() {
        recs.push(
            "Investigate reasons for differential missing data patterns and implement strategies \
             to improve data collection completeness across all gender groups."
                .to_string(),
        );
    }

    recs.push(
        "Use gender-transformative approaches that address root causes of gender inequality \
         rather than focusing solely on individual-level differences."
            .to_string(),
    );
    recs.push(
        "Consider power dynamics, social norms, and structural barriers that may contribute to \
         observed patterns, beyond statistical associations."
            .to_string(),
    );
    recs.push(
        "Ensure data collection and analysis processes are inclusive and respect diverse gender \
         identities and expressions."
            .to_string(),
    );

    recs
}

/// Narrative insights. `variables_analyzed` counts continuous and
/// categorical results together.
pub fn insights(assessment: &BiasAssessment, variables_analyzed: usize) -> Vec<String> {
    let mut out = Vec::new();

    let disparities = assessment.statistical_disparities.len();
    if disparities > 0 {
        out.push(format!(
            "The analysis identified {} variable(s) with statistically significant gender \
             differences. These differences may reflect structural inequalities, social norms, or \
             differential access to resources and opportunities. A gender-transformative approach \
             would examine the underlying power relations and systemic barriers that produce these \
             patterns.",
            disparities
        ));
    }

    let gaps = assessment.representation_gaps.len();
    if gaps > 0 {
        out.push(format!(
            "Representation gaps were identified in {} area(s), suggesting potential sampling \
             biases or population characteristics. These gaps may limit the generalizability of \
             findings and should be addressed through inclusive data collection strategies.",
            gaps
        ));
    }

    if variables_analyzed > 0 {
        out.push(
            "Gender analysis requires moving beyond descriptive statistics to understand the \
             social, economic, and political contexts that shape gender relations. Consider \
             complementing quantitative findings with qualitative research to understand lived \
             experiences and the mechanisms through which gender differences emerge."
                .to_string(),
        );
    }

    out.push(
        "Gender-transformative analysis recognizes that gender is not a binary construct and that \
         individuals may experience multiple forms of discrimination and privilege \
         simultaneously. Intersectional approaches are essential for comprehensive understanding."
            .to_string(),
    );

    out
}

/// One-paragraph summary of the finding counts.
pub fn overall_summary(assessment: &BiasAssessment) -> String {
    let disparities = assessment.statistical_disparities.len();
    let gaps = assessment.representation_gaps.len();
    let missing = assessment.missing_data_bias.len();
    let practical = assessment.practical_significance.len();

    let mut summary = String::new();
    if disparities == 0 && gaps == 0 && missing == 0 {
        summary.push_str(
            "The analysis did not identify significant gender-based statistical disparities, \
             representation gaps, or missing data bias. ",
        );
    } else {
        if disparities > 0 {
            summary.push_str(&format!(
                "{} variable(s) showed statistically significant gender differences. ",
                disparities
            ));
        }
        if gaps > 0 {
            summary.push_str(&format!("{} representation gap(s) were identified. ", gaps));
        }
        if missing > 0 {
            summary.push_str(&format!(
                "{} variable(s) showed differential missing data patterns by gender. ",
                missing
            ));
        }
    }

    if practical > 0 {
        summary.push_str(&format!(
            "{} variable(s) showed substantial practical differences (>20% relative difference) \
             that may warrant programmatic attention. ",
            practical
        ));
    }

    summary.push_str(
        "These findings should be interpreted within the broader social, economic, and political \
         context, using gender-transformative approaches that address root causes of inequality.",
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Diagnostics, GroupStatistics, LevelStatistics, MultipleTesting, Reported, TestKind,
        TestResult,
    };

    fn test_with_p(kind: TestKind, p: f64) -> TestResult {
        let mut test = TestResult::failed(kind, String::new());
        test.p = Reported::Value(p);
        test.note = None;
        test
    }

    fn effect(name: EffectKind, value: f64, interpretation: &str) -> EffectSize {
        EffectSize {
            name,
            value,
            ci_lower: None,
            ci_upper: None,
            interpretation: interpretation.to_string(),
        }
    }

    fn stats_row(gender: GenderCategory, mean: Reported<f64>) -> GroupStatistics {
        GroupStatistics {
            gender,
            n: Reported::Value(10),
            mean,
            sd: Reported::Value(1.0),
            median: Reported::Value(1.0),
            iqr: Reported::Value(1.0),
            min: Reported::Value(0.0),
            max: Reported::Value(2.0),
        }
    }

    fn continuous(var: &str, p: f64, d: Option<f64>, means: [f64; 2]) -> ContinuousResult {
        ContinuousResult {
            var: var.to_string(),
            table: vec![
                stats_row(GenderCategory::Female, Reported::Value(means[0])),
                stats_row(GenderCategory::Male, Reported::Value(means[1])),
            ],
            test: test_with_p(TestKind::WelchTTest, p),
            effects: d
                .map(|d| vec![effect(EffectKind::CohensD, d, "large")])
                .unwrap_or_default(),
        }
    }

    fn summary(gender: GenderCategory, n: usize, pct: f64) -> GenderSummary {
        GenderSummary {
            gender,
            n,
            pct,
            missing_pct: 0.0,
        }
    }

    #[test]
    fn test_disparity_severity_bands() {
        let results = vec![
            continuous("a", 0.01, Some(0.9), [1.0, 1.0]),
            continuous("b", 0.01, Some(-0.6), [1.0, 1.0]),
            continuous("c", 0.01, Some(0.2), [1.0, 1.0]),
            continuous("d", 0.01, None, [1.0, 1.0]),
            continuous("e", 0.2, Some(2.0), [1.0, 1.0]),
        ];
        let disparities = statistical_disparities(&results, &[]);
        let severities: Vec<Severity> = disparities.iter().map(|d| d.severity).collect();
        assert_eq!(
            severities,
            vec![Severity::Large, Severity::Moderate, Severity::Small, Severity::Moderate]
        );
        assert!(disparities[0]
            .interpretation
            .starts_with("Statistically significant difference found in a (p=0.0100)."));
    }

    #[test]
    fn test_disparities_use_adjusted_p() {
        let mut result = continuous("a", 0.04, Some(0.9), [1.0, 1.0]);
        result.test.p_fdr = Some(0.08);
        assert!(statistical_disparities(&[result], &[]).is_empty());
    }

    #[test]
    fn test_categorical_severity_from_cramers_v() {
        let result = CategoricalResult {
            var: "region".to_string(),
            table: Vec::new(),
            test: test_with_p(TestKind::ChiSquare, 0.001),
            effects: vec![effect(EffectKind::CramersV, 0.35, "medium")],
        };
        let disparities = statistical_disparities(&[], &[result]);
        assert_eq!(disparities[0].severity, Severity::Moderate);
        assert_eq!(disparities[0].kind, VariableKind::Categorical);
        assert_eq!(disparities[0].effect_size, Some(0.35));
    }

    #[test]
    fn test_representation_imbalance_threshold() {
        let balanced = vec![
            summary(GenderCategory::Female, 60, 60.0),
            summary(GenderCategory::Male, 40, 40.0),
        ];
        assert!(representation_gaps(&balanced, &[]).is_empty());

        let skewed = vec![
            summary(GenderCategory::Female, 61, 61.0),
            summary(GenderCategory::Male, 39, 39.0),
        ];
        let gaps = representation_gaps(&skewed, &[]);
        assert_eq!(gaps.len(), 1);
        assert!(gaps[0].interpretation().starts_with("Female participants represent 61.0%"));
    }

    #[test]
    fn test_level_representation_ignores_suppressed_cells() {
        let level = |level: &str, gender, n: Reported<usize>| LevelStatistics {
            level: level.to_string(),
            gender,
            n,
            pct: Reported::Value(0.0),
        };
        let result = CategoricalResult {
            var: "role".to_string(),
            table: vec![
                level("lead", GenderCategory::Female, Reported::Value(8)),
                level("staff", GenderCategory::Female, Reported::Value(10)),
                level("lead", GenderCategory::Male, Reported::Value(2)),
                level("staff", GenderCategory::Male, Reported::suppressed(5)),
            ],
            test: TestResult::insufficient("x"),
            effects: Vec::new(),
        };
        let gaps = representation_gaps(&[summary(GenderCategory::Female, 1, 50.0)], &[result]);
        assert_eq!(gaps.len(), 2);
        match &gaps[0] {
            RepresentationGap::LevelRepresentation {
                level,
                gender,
                percentage,
                ..
            } => {
                assert_eq!(level, "lead");
                assert_eq!(*gender, GenderCategory::Female);
                assert_eq!(*percentage, 80.0);
            }
            other => panic!("unexpected gap {:?}", other),
        }
    }

    #[test]
    fn test_missing_data_bias() {
        let info = |var: &str, gender, pct| MissingnessInfo {
            var: var.to_string(),
            gender,
            missing_n: 0,
            missing_pct: pct,
        };
        let missingness = vec![
            info("income", GenderCategory::Female, 25.0),
            info("income", GenderCategory::Male, 5.0),
            info("age", GenderCategory::Female, 10.0),
            info("age", GenderCategory::Male, 0.0),
        ];
        let findings = missing_data_bias(&missingness);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].variable, "income");
        assert_eq!(findings[0].max_missing_gender, GenderCategory::Female);
        assert_eq!(findings[0].difference, 20.0);
    }

    #[test]
    fn test_practical_significance() {
        let results = vec![
            continuous("wage", 0.5, None, [100.0, 125.0]),
            continuous("hours", 0.5, None, [100.0, 110.0]),
            continuous("zero", 0.5, None, [0.0, 10.0]),
        ];
        let findings = practical_significance(&results);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].variable, "wage");
        assert_eq!(findings[0].relative_difference, 25.0);
    }

    #[test]
    fn test_recommendations_and_summary() {
        let empty = BiasAssessment::default();
        assert_eq!(recommendations(&empty).len(), 3);
        assert_eq!(insights(&empty, 0).len(), 1);
        assert!(overall_summary(&empty).starts_with("The analysis did not identify"));

        let results = AnalysisResults {
            rows_analyzed: 100,
            by_gender: vec![
                summary(GenderCategory::Female, 80, 80.0),
                summary(GenderCategory::Male, 20, 20.0),
            ],
            continuous: vec![continuous("wage", 0.001, Some(1.2), [10.0, 20.0])],
            categorical: Vec::new(),
            missingness: Vec::new(),
            diagnostics: Diagnostics {
                normality: Vec::new(),
                multiple_testing: MultipleTesting::unadjusted(),
            },
            gender_bias: None,
        };
        let assessment = assess_bias(&results);
        assert_eq!(assessment.statistical_disparities.len(), 1);
        assert_eq!(assessment.representation_gaps.len(), 1);
        assert_eq!(assessment.practical_significance.len(), 1);
        // large disparity (2) + representation (1) + always-on (3)
        assert_eq!(assessment.recommendations.len(), 6);
        assert_eq!(assessment.insights.len(), 4);
        assert!(assessment
            .overall_summary
            .starts_with("1 variable(s) showed statistically significant gender differences."));
    }
}
