use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::{AnalysisConfig, DimensionSchema};
use crate::records::AnnotationRecord;

use super::error::{IndexError, IndexFailure};
use super::resolver::resolve_labels;
use super::spec::{
    BlendRule, GroupRatioRule, IndexSpec, OutputRange, ProportionRule, RatioKind, Rule,
    WeightedMeanRule,
};

/// A computed index value, or the explicit no-data sentinel used when a
/// denominator collapses to zero. The sentinel is a first-class result
/// state: renderers show "no data", never a misleading 0.0 or NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IndexValue {
    Value(f64),
    /// Serializes as null.
    NoData,
}

impl IndexValue {
    pub fn is_no_data(&self) -> bool {
        matches!(self, IndexValue::NoData)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            IndexValue::Value(v) => Some(*v),
            IndexValue::NoData => None,
        }
    }
}

/// The raw counts behind one index value, kept so captions and reports can
/// cite evidence without re-deriving ratios.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Tally {
    /// Records carrying at least one mention for the dimension.
    pub contributing: usize,
    /// Records with no evidence for the dimension. Together with
    /// `contributing` this accounts for every record.
    pub excluded: usize,
    /// Total mentions across contributing records (a record with several
    /// actor mentions counts several times).
    pub mentions: usize,
    /// Mention count per category label.
    pub by_category: BTreeMap<String, usize>,
    /// Named tallies specific to the rule shape: group counts for ratio
    /// rules, the satisfied-record count for proportions.
    pub groups: BTreeMap<String, usize>,
}

impl Tally {
    fn merge(&mut self, other: Tally) {
        self.contributing += other.contributing;
        self.excluded += other.excluded;
        self.mentions += other.mentions;
        for (label, count) in other.by_category {
            *self.by_category.entry(label).or_insert(0) += count;
        }
        for (name, count) in other.groups {
            *self.groups.entry(name).or_insert(0) += count;
        }
    }
}

/// One computed index, fresh per invocation and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexResult {
    pub name: String,
    pub value: IndexValue,
    pub range: OutputRange,
    pub counts: Tally,
}

/// Everything one corpus run produces: results in registry order, per-index
/// failures, and range warnings. A failed index never blocks the others.
#[derive(Debug, Serialize)]
pub struct CorpusResults {
    pub corpus: String,
    pub total_records: usize,
    pub results: Vec<IndexResult>,
    pub failures: Vec<IndexFailure>,
    pub warnings: Vec<String>,
}

impl CorpusResults {
    pub fn get(&self, name: &str) -> Option<&IndexResult> {
        self.results.iter().find(|result| result.name == name)
    }
}

/// Compute every index in the registry over the record sequence.
///
/// Pure function of (records, config): recomputing over unchanged input
/// yields identical results. Only a structurally unusable corpus (no
/// records at all) fails the whole run.
pub fn compute_all(records: &[AnnotationRecord], config: &AnalysisConfig) -> Result<CorpusResults> {
    if records.is_empty() {
        anyhow::bail!(
            "Corpus '{}' has no annotation records to compute over",
            config.corpus
        );
    }

    let mut results = Vec::new();
    let mut failures = Vec::new();
    let mut warnings = Vec::new();

    for spec in &config.indices {
        match compute_index(records, &config.dimensions, spec, &mut warnings) {
            Ok(result) => results.push(result),
            Err(error) => failures.push(IndexFailure {
                index: spec.name.clone(),
                error,
            }),
        }
    }

    Ok(CorpusResults {
        corpus: config.corpus.clone(),
        total_records: records.len(),
        results,
        failures,
        warnings,
    })
}

/// Compute a single index. Out-of-range values signal a spec authoring bug
/// (weights not normalized): they are clamped and reported as a warning,
/// not an error.
pub fn compute_index(
    records: &[AnnotationRecord],
    dimensions: &BTreeMap<String, DimensionSchema>,
    spec: &IndexSpec,
    warnings: &mut Vec<String>,
) -> Result<IndexResult, IndexError> {
    let (value, counts) = evaluate_rule(records, dimensions, &spec.rule)?;

    let value = match value {
        IndexValue::NoData => IndexValue::NoData,
        IndexValue::Value(raw) => {
            if !spec.range.contains(raw) {
                warnings.push(format!(
                    "index '{}': value {:.4} outside [{}, {}], clamped",
                    spec.name, raw, spec.range.min, spec.range.max
                ));
            }
            IndexValue::Value(spec.range.clamp(raw))
        }
    };

    Ok(IndexResult {
        name: spec.name.clone(),
        value,
        range: spec.range,
        counts,
    })
}

fn evaluate_rule(
    records: &[AnnotationRecord],
    dimensions: &BTreeMap<String, DimensionSchema>,
    rule: &Rule,
) -> Result<(IndexValue, Tally), IndexError> {
    match rule {
        Rule::WeightedMean(rule) => weighted_mean(records, dimensions, rule),
        Rule::GroupRatio(rule) => group_ratio(records, dimensions, rule),
        Rule::Proportion(rule) => proportion(records, dimensions, rule),
        Rule::Blend(rule) => blend(records, dimensions, rule),
    }
}

fn schema_for<'a>(
    dimensions: &'a BTreeMap<String, DimensionSchema>,
    dimension: &str,
) -> Result<&'a DimensionSchema, IndexError> {
    dimensions
        .get(dimension)
        .ok_or_else(|| IndexError::UnknownDimension {
            dimension: dimension.to_string(),
        })
}

/// Rule 1: mean of per-mention weights over contributing mentions, divided
/// by the table's normalization divisor. A record with several mentions
/// contributes several terms; a record with none contributes nothing and is
/// tallied as excluded.
fn weighted_mean(
    records: &[AnnotationRecord],
    dimensions: &BTreeMap<String, DimensionSchema>,
    rule: &WeightedMeanRule,
) -> Result<(IndexValue, Tally), IndexError> {
    let schema = schema_for(dimensions, &rule.dimension)?;
    let mut tally = Tally::default();
    let mut sum = 0.0;
    let mut terms = 0usize;

    for record in records {
        let labels = resolve_labels(record, &rule.dimension, rule.field.as_deref(), schema)?;
        if labels.is_empty() {
            tally.excluded += 1;
            continue;
        }
        tally.contributing += 1;
        for label in labels {
            *tally.by_category.entry(label.to_string()).or_insert(0) += 1;
            tally.mentions += 1;
            if rule.exclude.iter().any(|excluded| excluded == label) {
                continue;
            }
            let weight = rule.weights.get(label).ok_or_else(|| IndexError::MissingWeight {
                dimension: rule.dimension.clone(),
                label: label.to_string(),
            })?;
            sum += *weight;
            terms += 1;
        }
    }

    if terms == 0 {
        return Ok((IndexValue::NoData, tally));
    }

    let value = (sum / terms as f64) / rule.divisor;
    Ok((IndexValue::Value(value), tally))
}

/// Rule 2: tally labels into the two named groups; labels in neither group
/// are evidence out of scope for this index and stay in an implicit
/// unclassified bucket, outside both numerator and denominator.
fn group_ratio(
    records: &[AnnotationRecord],
    dimensions: &BTreeMap<String, DimensionSchema>,
    rule: &GroupRatioRule,
) -> Result<(IndexValue, Tally), IndexError> {
    let schema = schema_for(dimensions, &rule.dimension)?;
    let mut tally = Tally::default();
    let mut count_a = 0usize;
    let mut count_b = 0usize;
    let mut unclassified = 0usize;

    for record in records {
        let labels = resolve_labels(record, &rule.dimension, rule.field.as_deref(), schema)?;
        if labels.is_empty() {
            tally.excluded += 1;
            continue;
        }
        tally.contributing += 1;
        for label in labels {
            *tally.by_category.entry(label.to_string()).or_insert(0) += 1;
            tally.mentions += 1;
            if rule.group_a.categories.iter().any(|c| c == label) {
                count_a += 1;
            } else if rule.group_b.categories.iter().any(|c| c == label) {
                count_b += 1;
            } else {
                unclassified += 1;
            }
        }
    }

    tally.groups.insert(rule.group_a.name.clone(), count_a);
    tally.groups.insert(rule.group_b.name.clone(), count_b);
    tally.groups.insert("unclassified".to_string(), unclassified);

    let total = count_a + count_b;
    if total == 0 {
        return Ok((IndexValue::NoData, tally));
    }

    let a = count_a as f64;
    let b = count_b as f64;
    let value = match rule.kind {
        RatioKind::Balance => (a - b) / (a + b),
        RatioKind::Share => a / (a + b),
    };
    Ok((IndexValue::Value(value), tally))
}

/// Rule 3: records satisfying the predicate over the full record count.
/// The denominator is always the whole corpus, unlike the group ratio's
/// group-relative denominator.
fn proportion(
    records: &[AnnotationRecord],
    dimensions: &BTreeMap<String, DimensionSchema>,
    rule: &ProportionRule,
) -> Result<(IndexValue, Tally), IndexError> {
    let schema = schema_for(dimensions, &rule.dimension)?;
    let mut tally = Tally::default();
    let mut satisfied = 0usize;

    // Entity dimensions without an attribute selector reduce to a pure
    // presence test; everything else resolves labels (and so still
    // validates the vocabulary).
    let resolve = rule.field.is_some() || !schema.entity;

    for record in records {
        let labels = if resolve {
            resolve_labels(record, &rule.dimension, rule.field.as_deref(), schema)?
        } else {
            Vec::new()
        };
        let annotated = if resolve {
            !labels.is_empty()
        } else {
            record.has_annotation(&rule.dimension)
        };

        if !annotated {
            tally.excluded += 1;
            continue;
        }
        tally.contributing += 1;
        for label in &labels {
            *tally.by_category.entry((*label).to_string()).or_insert(0) += 1;
            tally.mentions += 1;
        }

        let hit = match &rule.any_of {
            None => true,
            Some(wanted) => labels.iter().any(|label| wanted.iter().any(|w| w == label)),
        };
        if hit {
            satisfied += 1;
        }
    }

    tally.groups.insert("satisfied".to_string(), satisfied);

    let value = satisfied as f64 / records.len() as f64;
    Ok((IndexValue::Value(value), tally))
}

/// Rule 4: fixed linear combination of sub-rules. Every term is evaluated
/// with its own missing-data handling; one no-data term makes the blend
/// no-data rather than substituting zero.
fn blend(
    records: &[AnnotationRecord],
    dimensions: &BTreeMap<String, DimensionSchema>,
    rule: &BlendRule,
) -> Result<(IndexValue, Tally), IndexError> {
    let mut tally = Tally::default();
    let mut acc = 0.0;
    let mut no_data = false;

    for term in &rule.terms {
        let (value, term_tally) = evaluate_rule(records, dimensions, &term.rule)?;
        tally.merge(term_tally);
        match value {
            IndexValue::NoData => no_data = true,
            IndexValue::Value(v) => acc += term.weight * v,
        }
    }

    if no_data {
        Ok((IndexValue::NoData, tally))
    } else {
        Ok((IndexValue::Value(acc), tally))
    }
}
