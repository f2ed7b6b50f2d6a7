//! Data models for the analysis engine.
//!
//! This module contains the request, result and assessment structures
//! shared by the engine, the session registry and the report writers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical gender category used for all group-wise computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenderCategory {
    Female,
    Male,
    Other,
    Missing,
}

impl GenderCategory {
    /// All categories in canonical order.
    pub const ALL: [GenderCategory; 4] = [
        GenderCategory::Female,
        GenderCategory::Male,
        GenderCategory::Other,
        GenderCategory::Missing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GenderCategory::Female => "female",
            GenderCategory::Male => "male",
            GenderCategory::Other => "other",
            GenderCategory::Missing => "missing",
        }
    }

    /// Label with a leading capital, used in narrative text.
    pub fn title(&self) -> &'static str {
        match self {
            GenderCategory::Female => "Female",
            GenderCategory::Male => "Male",
            GenderCategory::Other => "Other",
            GenderCategory::Missing => "Missing",
        }
    }

    /// Parse a canonical label (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "female" => Some(GenderCategory::Female),
            "male" => Some(GenderCategory::Male),
            "other" => Some(GenderCategory::Other),
            "missing" => Some(GenderCategory::Missing),
            _ => None,
        }
    }
}

impl fmt::Display for GenderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One raw-value → canonical-category pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenderMapping {
    /// Value as it appears in the dataset.
    pub from: String,
    /// Canonical category it maps to.
    pub to: GenderCategory,
}

impl GenderMapping {
    pub fn new(from: &str, to: GenderCategory) -> Self {
        Self {
            from: from.to_string(),
            to,
        }
    }
}

/// How incomplete rows are treated before analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPolicy {
    /// Drop every row with a missing value in any column.
    #[default]
    Listwise,
    /// Keep all rows; each statistic uses its own non-missing subset.
    Pairwise,
    /// Keep all rows and expose missingness as an explicit category.
    Flag,
}

impl fmt::Display for MissingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingPolicy::Listwise => write!(f, "listwise"),
            MissingPolicy::Pairwise => write!(f, "pairwise"),
            MissingPolicy::Flag => write!(f, "flag"),
        }
    }
}

/// Per-variable imputation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImputeMethod {
    Mean,
    Median,
    Mode,
}

/// Variables to impute, grouped by method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImputeConfig {
    #[serde(default)]
    pub mean: Vec<String>,
    #[serde(default)]
    pub median: Vec<String>,
    #[serde(default)]
    pub mode: Vec<String>,
}

impl ImputeConfig {
    /// Flatten into (variable, method) pairs in mean → median → mode order.
    pub fn assignments(&self) -> Vec<(String, ImputeMethod)> {
        let mut out = Vec::new();
        for (vars, method) in [
            (&self.mean, ImputeMethod::Mean),
            (&self.median, ImputeMethod::Median),
            (&self.mode, ImputeMethod::Mode),
        ] {
            out.extend(vars.iter().map(|v| (v.to_lowercase(), method)));
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty() && self.median.is_empty() && self.mode.is_empty()
    }
}

/// Immutable configuration of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub gender_col: String,
    pub gender_map: Vec<GenderMapping>,
    pub categories_order: Vec<GenderCategory>,
    pub vars_continuous: Vec<String>,
    pub vars_categorical: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_col: Option<String>,
    pub missing_policy: MissingPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impute: Option<ImputeConfig>,
    pub suppress_threshold: usize,
    pub fdr: bool,
    pub assess_bias: bool,
}

impl Default for AnalysisRequest {
    fn default() -> Self {
        Self {
            gender_col: "gender".to_string(),
            gender_map: Vec::new(),
            categories_order: GenderCategory::ALL.to_vec(),
            vars_continuous: Vec::new(),
            vars_categorical: Vec::new(),
            weight_col: None,
            missing_policy: MissingPolicy::Listwise,
            impute: None,
            suppress_threshold: 5,
            fdr: false,
            assess_bias: true,
        }
    }
}

impl AnalysisRequest {
    /// Returns a copy with every column reference lowercased, matching the
    /// case-normalized dataset columns.
    pub fn normalized(&self) -> Self {
        let lower = |vars: &[String]| vars.iter().map(|v| v.trim().to_lowercase()).collect();
        Self {
            gender_col: self.gender_col.trim().to_lowercase(),
            vars_continuous: lower(&self.vars_continuous),
            vars_categorical: lower(&self.vars_categorical),
            weight_col: self.weight_col.as_ref().map(|w| w.trim().to_lowercase()),
            ..self.clone()
        }
    }

    /// Validate invariants that cannot be recovered from per variable.
    pub fn validate(&self) -> Result<(), String> {
        if self.suppress_threshold == 0 {
            return Err("Suppression threshold must be at least 1".to_string());
        }
        if self.gender_col.trim().is_empty() {
            return Err("Gender column must be set".to_string());
        }
        if self.categories_order.is_empty() {
            return Err("Category order must list at least one category".to_string());
        }
        Ok(())
    }

    /// All requested variables, continuous first.
    pub fn all_variables(&self) -> Vec<String> {
        self.vars_continuous
            .iter()
            .chain(self.vars_categorical.iter())
            .cloned()
            .collect()
    }
}

/// A number, or a string marker standing in for it (suppression, undefined).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reported<T> {
    Value(T),
    Marker(String),
}

/// Marker used when a statistic could not be computed.
pub const NOT_AVAILABLE: &str = "N/A";

impl<T: Copy> Reported<T> {
    pub fn value(&self) -> Option<T> {
        match self {
            Reported::Value(v) => Some(*v),
            Reported::Marker(_) => None,
        }
    }

    /// The suppression marker for a threshold, e.g. `<5`.
    pub fn suppressed(threshold: usize) -> Self {
        Reported::Marker(format!("<{}", threshold))
    }

    pub fn not_available() -> Self {
        Reported::Marker(NOT_AVAILABLE.to_string())
    }

    pub fn is_marker(&self) -> bool {
        matches!(self, Reported::Marker(_))
    }
}

impl Reported<f64> {
    /// Wrap a float, turning non-finite values into markers.
    pub fn from_f64(v: f64) -> Self {
        if v.is_finite() {
            Reported::Value(v)
        } else if v.is_nan() {
            Reported::not_available()
        } else if v > 0.0 {
            Reported::Marker("inf".to_string())
        } else {
            Reported::Marker("-inf".to_string())
        }
    }
}

impl<T: fmt::Display> fmt::Display for Reported<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reported::Value(v) => write!(f, "{}", v),
            Reported::Marker(m) => write!(f, "{}", m),
        }
    }
}

/// Descriptive statistics for one gender group of a continuous variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStatistics {
    pub gender: GenderCategory,
    pub n: Reported<usize>,
    pub mean: Reported<f64>,
    pub sd: Reported<f64>,
    pub median: Reported<f64>,
    pub iqr: Reported<f64>,
    pub min: Reported<f64>,
    pub max: Reported<f64>,
}

impl GroupStatistics {
    /// A row with every field replaced by the suppression marker.
    pub fn suppressed(gender: GenderCategory, threshold: usize) -> Self {
        Self {
            gender,
            n: Reported::suppressed(threshold),
            mean: Reported::suppressed(threshold),
            sd: Reported::suppressed(threshold),
            median: Reported::suppressed(threshold),
            iqr: Reported::suppressed(threshold),
            min: Reported::suppressed(threshold),
            max: Reported::suppressed(threshold),
        }
    }

    pub fn is_suppressed(&self) -> bool {
        self.n.is_marker()
    }
}

/// Count and within-gender percentage of one (level, gender) cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelStatistics {
    pub level: String,
    pub gender: GenderCategory,
    pub n: Reported<usize>,
    pub pct: Reported<f64>,
}

/// The fixed set of hypothesis tests the selector can choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    #[serde(rename = "welch_ttest")]
    WelchTTest,
    MannWhitney,
    WelchAnova,
    KruskalWallis,
    ChiSquare,
    FisherExact,
    InsufficientData,
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestKind::WelchTTest => write!(f, "Welch's t-test"),
            TestKind::MannWhitney => write!(f, "Mann-Whitney U"),
            TestKind::WelchAnova => write!(f, "Welch's ANOVA"),
            TestKind::KruskalWallis => write!(f, "Kruskal-Wallis"),
            TestKind::ChiSquare => write!(f, "Chi-square"),
            TestKind::FisherExact => write!(f, "Fisher's exact"),
            TestKind::InsufficientData => write!(f, "Insufficient data"),
        }
    }
}

/// Degrees of freedom; Welch's ANOVA reports a numerator/denominator pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DegreesOfFreedom {
    Single(f64),
    Pair(f64, f64),
}

impl fmt::Display for DegreesOfFreedom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegreesOfFreedom::Single(d) => write!(f, "{}", d),
            DegreesOfFreedom::Pair(d1, d2) => write!(f, "{}, {}", d1, d2),
        }
    }
}

/// Outcome of one hypothesis test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub name: TestKind,
    pub p: Reported<f64>,
    pub statistic: Reported<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub df: Option<DegreesOfFreedom>,
    pub assumptions_met: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_fdr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fdr_method: Option<String>,
}

impl TestResult {
    /// A test that was not run because the data did not support it.
    pub fn insufficient(note: &str) -> Self {
        Self {
            name: TestKind::InsufficientData,
            p: Reported::not_available(),
            statistic: Reported::not_available(),
            df: None,
            assumptions_met: false,
            note: Some(note.to_string()),
            p_fdr: None,
            fdr_method: None,
        }
    }

    /// A test that was selected but failed numerically.
    pub fn failed(name: TestKind, note: String) -> Self {
        Self {
            name,
            p: Reported::not_available(),
            statistic: Reported::not_available(),
            df: None,
            assumptions_met: false,
            note: Some(note),
            p_fdr: None,
            fdr_method: None,
        }
    }

    /// Raw p-value, if one was computed.
    pub fn p_value(&self) -> Option<f64> {
        self.p.value()
    }

    /// The p-value significance decisions use: FDR-adjusted when present.
    pub fn decision_p(&self) -> Option<f64> {
        self.p_fdr.or_else(|| self.p_value())
    }
}

/// Effect size measures the calculator can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    #[serde(rename = "Cohen's d")]
    CohensD,
    #[serde(rename = "Hedges' g")]
    HedgesG,
    #[serde(rename = "Eta-squared")]
    EtaSquared,
    #[serde(rename = "Epsilon-squared")]
    EpsilonSquared,
    #[serde(rename = "Cramér's V")]
    CramersV,
    #[serde(rename = "Odds Ratio")]
    OddsRatio,
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EffectKind::CohensD => "Cohen's d",
            EffectKind::HedgesG => "Hedges' g",
            EffectKind::EtaSquared => "Eta-squared",
            EffectKind::EpsilonSquared => "Epsilon-squared",
            EffectKind::CramersV => "Cramér's V",
            EffectKind::OddsRatio => "Odds Ratio",
        };
        write!(f, "{}", name)
    }
}

/// A standardized effect magnitude with its qualitative band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSize {
    pub name: EffectKind,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_lower: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_upper: Option<f64>,
    pub interpretation: String,
}

/// Sample composition for one canonical category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenderSummary {
    pub gender: GenderCategory,
    pub n: usize,
    pub pct: f64,
    pub missing_pct: f64,
}

/// Missing values of one variable within one gender group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingnessInfo {
    pub var: String,
    pub gender: GenderCategory,
    pub missing_n: usize,
    pub missing_pct: f64,
}

/// Which normality test was applied to a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalityKind {
    #[serde(rename = "Shapiro-Wilk")]
    ShapiroWilk,
    #[serde(rename = "D'Agostino")]
    DAgostinoPearson,
}

impl fmt::Display for NormalityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalityKind::ShapiroWilk => write!(f, "Shapiro-Wilk"),
            NormalityKind::DAgostinoPearson => write!(f, "D'Agostino"),
        }
    }
}

/// Normality test outcome for one (variable, gender) group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalityTest {
    pub var: String,
    pub gender: GenderCategory,
    pub test: NormalityKind,
    pub statistic: Option<f64>,
    pub p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl NormalityTest {
    /// Whether this group's test rejected normality at alpha = 0.05.
    pub fn rejects_normality(&self) -> bool {
        matches!(self.p, Some(p) if p < 0.05)
    }
}

/// Significant-result counts before and after FDR correction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FdrSummary {
    pub continuous_sig_raw: usize,
    pub continuous_sig_fdr: usize,
    pub categorical_sig_raw: usize,
    pub categorical_sig_fdr: usize,
}

/// Multiple-testing metadata for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipleTesting {
    pub fdr_method: String,
    pub adjusted: bool,
    pub continuous_tests_corrected: usize,
    pub categorical_tests_corrected: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<FdrSummary>,
}

impl MultipleTesting {
    pub fn unadjusted() -> Self {
        Self {
            fdr_method: "none".to_string(),
            adjusted: false,
            continuous_tests_corrected: 0,
            categorical_tests_corrected: 0,
            summary: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub normality: Vec<NormalityTest>,
    pub multiple_testing: MultipleTesting,
}

/// Results for one continuous variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuousResult {
    pub var: String,
    pub table: Vec<GroupStatistics>,
    pub test: TestResult,
    pub effects: Vec<EffectSize>,
}

/// Results for one categorical variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalResult {
    pub var: String,
    pub table: Vec<LevelStatistics>,
    pub test: TestResult,
    pub effects: Vec<EffectSize>,
}

/// Kind of variable a finding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    Continuous,
    Categorical,
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableKind::Continuous => write!(f, "continuous"),
            VariableKind::Categorical => write!(f, "categorical"),
        }
    }
}

/// Severity band of a statistical disparity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Small,
    Moderate,
    Large,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Small => write!(f, "Small"),
            Severity::Moderate => write!(f, "Moderate"),
            Severity::Large => write!(f, "Large"),
        }
    }
}

impl Severity {
    pub fn emoji(&self) -> &'static str {
        match self {
            Severity::Small => "🟢",
            Severity::Moderate => "🟡",
            Severity::Large => "🔴",
        }
    }
}

/// A significant test result with its severity band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disparity {
    pub variable: String,
    #[serde(rename = "type")]
    pub kind: VariableKind,
    pub p_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect_interpretation: Option<String>,
    pub severity: Severity,
    pub interpretation: String,
}

/// Over-representation of one gender overall or within one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RepresentationGap {
    RepresentationImbalance {
        gender: GenderCategory,
        percentage: f64,
        interpretation: String,
    },
    LevelRepresentation {
        variable: String,
        level: String,
        gender: GenderCategory,
        percentage: f64,
        interpretation: String,
    },
}

impl RepresentationGap {
    pub fn interpretation(&self) -> &str {
        match self {
            RepresentationGap::RepresentationImbalance { interpretation, .. }
            | RepresentationGap::LevelRepresentation { interpretation, .. } => interpretation,
        }
    }
}

/// Differential missingness of one variable across gender groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingDataBias {
    pub variable: String,
    pub max_missing_gender: GenderCategory,
    pub max_missing_pct: f64,
    pub min_missing_pct: f64,
    pub difference: f64,
    pub interpretation: String,
}

/// A large relative difference in group means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticalSignificance {
    pub variable: String,
    #[serde(rename = "type")]
    pub kind: VariableKind,
    pub relative_difference: f64,
    pub interpretation: String,
}

/// Aggregate findings over all results of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiasAssessment {
    pub overall_summary: String,
    pub statistical_disparities: Vec<Disparity>,
    pub representation_gaps: Vec<RepresentationGap>,
    pub missing_data_bias: Vec<MissingDataBias>,
    pub practical_significance: Vec<PracticalSignificance>,
    pub recommendations: Vec<String>,
    pub insights: Vec<String>,
}

/// Everything the engine computes for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub rows_analyzed: usize,
    pub by_gender: Vec<GenderSummary>,
    pub continuous: Vec<ContinuousResult>,
    pub categorical: Vec<CategoricalResult>,
    pub missingness: Vec<MissingnessInfo>,
    pub diagnostics: Diagnostics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender_bias: Option<BiasAssessment>,
}

/// Metadata about the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Session the analysis ran in.
    pub session_id: String,
    /// Name of the analysed dataset (file name).
    pub dataset: String,
    /// Rows in the dataset as loaded.
    pub rows_loaded: usize,
    /// Date and time of the analysis.
    pub analysis_date: DateTime<Utc>,
    /// Duration of the analysis in seconds.
    pub duration_seconds: f64,
}

/// The complete analysis report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    pub settings: AnalysisRequest,
    #[serde(flatten)]
    pub results: AnalysisResults,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_category_parse() {
        assert_eq!(GenderCategory::parse("Female"), Some(GenderCategory::Female));
        assert_eq!(GenderCategory::parse(" MALE "), Some(GenderCategory::Male));
        assert_eq!(GenderCategory::parse("nb"), None);
        assert_eq!(GenderCategory::Missing.to_string(), "missing");
    }

    #[test]
    fn test_reported_markers() {
        let suppressed: Reported<f64> = Reported::suppressed(5);
        assert_eq!(suppressed.to_string(), "<5");
        assert_eq!(suppressed.value(), None);

        assert_eq!(Reported::from_f64(1.5), Reported::Value(1.5));
        assert_eq!(Reported::from_f64(f64::NAN).to_string(), "N/A");
        assert_eq!(Reported::from_f64(f64::INFINITY).to_string(), "inf");
    }

    #[test]
    fn test_reported_serializes_untagged() {
        let json = serde_json::to_string(&Reported::<usize>::Value(12)).unwrap();
        assert_eq!(json, "12");
        let json = serde_json::to_string(&Reported::<f64>::suppressed(5)).unwrap();
        assert_eq!(json, "\"<5\"");
    }

    #[test]
    fn test_request_normalized_and_validated() {
        let request = AnalysisRequest {
            gender_col: " Sex ".to_string(),
            vars_continuous: vec!["Age".to_string()],
            weight_col: Some("W".to_string()),
            ..Default::default()
        };
        let normalized = request.normalized();
        assert_eq!(normalized.gender_col, "sex");
        assert_eq!(normalized.vars_continuous, vec!["age"]);
        assert_eq!(normalized.weight_col.as_deref(), Some("w"));
        assert!(normalized.validate().is_ok());

        let bad = AnalysisRequest {
            suppress_threshold: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_test_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&TestKind::WelchTTest).unwrap(),
            "\"welch_ttest\""
        );
        assert_eq!(
            serde_json::to_string(&TestKind::KruskalWallis).unwrap(),
            "\"kruskal_wallis\""
        );
        assert_eq!(
            serde_json::to_string(&EffectKind::CramersV).unwrap(),
            "\"Cramér's V\""
        );
    }

    #[test]
    fn test_decision_p_prefers_adjusted() {
        let mut result = TestResult::failed(TestKind::ChiSquare, "x".to_string());
        assert_eq!(result.decision_p(), None);
        result.p = Reported::Value(0.01);
        assert_eq!(result.decision_p(), Some(0.01));
        result.p_fdr = Some(0.03);
        assert_eq!(result.decision_p(), Some(0.03));
    }

    #[test]
    fn test_impute_assignments() {
        let impute = ImputeConfig {
            mean: vec!["Age".to_string()],
            median: vec![],
            mode: vec!["region".to_string()],
        };
        assert_eq!(
            impute.assignments(),
            vec![
                ("age".to_string(), ImputeMethod::Mean),
                ("region".to_string(), ImputeMethod::Mode)
            ]
        );
    }
}
