use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One composite index declaration.
///
/// Indices are data, not code: each corpus ships a YAML registry of specs
/// and the engine dispatches on the rule shape.
///
/// Example YAML:
/// ```yaml
/// - name: diplomatic_tone
///   range: { min: -1.0, max: 1.0 }
///   rule:
///     type: weighted_mean
///     dimension: emotional_register
///     divisor: 2.0
///     weights:
///       ALARMIST: -2.0
///       NEUTRAL: 0.0
///       CONFIDENT: 1.5
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct IndexSpec {
    pub name: String,
    pub range: OutputRange,
    pub rule: Rule,
}

/// Declared output range of an index, always [-1, 1] or [0, 1] in this
/// domain. Computed values are clamped to it.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputRange {
    pub min: f64,
    pub max: f64,
}

impl OutputRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// The closed set of computation rule shapes.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    WeightedMean(WeightedMeanRule),
    GroupRatio(GroupRatioRule),
    Proportion(ProportionRule),
    Blend(BlendRule),
}

impl Rule {
    /// The dimension this rule draws evidence from, for single-dimension
    /// rules. Blends span several.
    pub fn dimension(&self) -> Option<&str> {
        match self {
            Rule::WeightedMean(rule) => Some(&rule.dimension),
            Rule::GroupRatio(rule) => Some(&rule.dimension),
            Rule::Proportion(rule) => Some(&rule.dimension),
            Rule::Blend(_) => None,
        }
    }
}

/// Mean of per-mention category weights, divided by a normalization
/// divisor intrinsic to the table.
///
/// Every label in the dimension's vocabulary must appear in `weights` or
/// in `exclude`; anything else is a computation error, not a silent zero.
/// Excluded labels contribute no term to the mean (distinct from a 0.0
/// weight, which does).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WeightedMeanRule {
    pub dimension: String,
    /// Entity attribute carrying the category, for sub-entity dimensions
    /// (e.g. "valence" on actor mentions).
    #[serde(default)]
    pub field: Option<String>,
    pub weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub exclude: Vec<String>,
    pub divisor: f64,
}

/// Ratio over two named disjoint category groups. Labels in neither group
/// land in an implicit unclassified bucket and stay out of the ratio.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GroupRatioRule {
    pub dimension: String,
    #[serde(default)]
    pub field: Option<String>,
    pub group_a: Group,
    pub group_b: Group,
    pub kind: RatioKind,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Group {
    pub name: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RatioKind {
    /// `(a - b) / (a + b)`, range [-1, 1].
    Balance,
    /// `a / (a + b)`, range [0, 1].
    Share,
}

/// Fraction of all records satisfying a predicate. The denominator is the
/// full record count, not a filtered subset.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProportionRule {
    pub dimension: String,
    #[serde(default)]
    pub field: Option<String>,
    /// When set, a record counts only if it carries one of these labels;
    /// when absent, any annotation on the dimension counts.
    #[serde(default)]
    pub any_of: Option<Vec<String>>,
}

/// Fixed linear combination of sub-rules with weights summing to 1.
/// If any term has no data, the blend has no data.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BlendRule {
    pub terms: Vec<BlendTerm>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BlendTerm {
    pub weight: f64,
    pub rule: Rule,
}
