use std::collections::{BTreeMap, BTreeSet};

use crate::config::{AnalysisConfig, DimensionSchema};
use crate::records::{AnnotationRecord, DimensionValue};

use super::spec::{BlendRule, GroupRatioRule, ProportionRule, Rule, WeightedMeanRule};

const BLEND_WEIGHT_TOLERANCE: f64 = 1e-6;

/// Validate an analysis configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_analysis(config: &AnalysisConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    for (name, schema) in &config.dimensions {
        validate_dimension_schema(name, schema, &mut errors);
    }

    let mut seen_names = BTreeSet::new();
    for spec in &config.indices {
        if !seen_names.insert(spec.name.as_str()) {
            errors.push(format!("index '{}': duplicate index name", spec.name));
        }
        if spec.range.min >= spec.range.max {
            errors.push(format!(
                "index '{}': range [{}, {}] is not increasing",
                spec.name, spec.range.min, spec.range.max
            ));
        }
        validate_rule(&spec.name, &spec.rule, &config.dimensions, 0, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_dimension_schema(name: &str, schema: &DimensionSchema, errors: &mut Vec<String>) {
    if schema.entity {
        if schema.multi {
            errors.push(format!(
                "dimension '{}': entity dimensions are implicitly multi-valued; drop 'multi'",
                name
            ));
        }
        if !schema.values.is_empty() {
            errors.push(format!(
                "dimension '{}': entity dimensions declare 'fields', not 'values'",
                name
            ));
        }
        if schema.fields.is_empty() {
            errors.push(format!(
                "dimension '{}': entity dimension declares no attribute fields",
                name
            ));
        }
        for (field, vocabulary) in &schema.fields {
            if vocabulary.is_empty() {
                errors.push(format!(
                    "dimension '{}': field '{}' has an empty vocabulary",
                    name, field
                ));
            }
        }
    } else {
        if !schema.fields.is_empty() {
            errors.push(format!(
                "dimension '{}': 'fields' requires 'entity: true'",
                name
            ));
        }
        if schema.values.is_empty() {
            errors.push(format!("dimension '{}': empty vocabulary", name));
        }
    }
}

fn validate_rule(
    index: &str,
    rule: &Rule,
    dimensions: &BTreeMap<String, DimensionSchema>,
    depth: usize,
    errors: &mut Vec<String>,
) {
    match rule {
        Rule::WeightedMean(rule) => validate_weighted_mean(index, rule, dimensions, errors),
        Rule::GroupRatio(rule) => validate_group_ratio(index, rule, dimensions, errors),
        Rule::Proportion(rule) => validate_proportion(index, rule, dimensions, errors),
        Rule::Blend(rule) => validate_blend(index, rule, dimensions, depth, errors),
    }
}

/// Look up the vocabulary a rule validates against, reporting config
/// errors for unknown dimensions and bad field selectors.
fn rule_vocabulary<'a>(
    index: &str,
    dimension: &str,
    field: Option<&str>,
    dimensions: &'a BTreeMap<String, DimensionSchema>,
    errors: &mut Vec<String>,
) -> Option<&'a [String]> {
    let Some(schema) = dimensions.get(dimension) else {
        errors.push(format!(
            "index '{}': unknown dimension '{}'",
            index, dimension
        ));
        return None;
    };
    match schema.vocabulary(field) {
        Some(vocabulary) => Some(vocabulary),
        None => {
            match field {
                Some(field) => errors.push(format!(
                    "index '{}': dimension '{}' has no field '{}'",
                    index, dimension, field
                )),
                None => errors.push(format!(
                    "index '{}': entity dimension '{}' needs a 'field' selector",
                    index, dimension
                )),
            }
            None
        }
    }
}

fn validate_weighted_mean(
    index: &str,
    rule: &WeightedMeanRule,
    dimensions: &BTreeMap<String, DimensionSchema>,
    errors: &mut Vec<String>,
) {
    if rule.divisor <= 0.0 {
        errors.push(format!(
            "index '{}': divisor must be positive, got {}",
            index, rule.divisor
        ));
    }

    let Some(vocabulary) =
        rule_vocabulary(index, &rule.dimension, rule.field.as_deref(), dimensions, errors)
    else {
        return;
    };

    for label in rule.weights.keys() {
        if !vocabulary.contains(label) {
            errors.push(format!(
                "index '{}': weight for '{}' is outside the '{}' vocabulary",
                index, label, rule.dimension
            ));
        }
    }
    for label in &rule.exclude {
        if !vocabulary.contains(label) {
            errors.push(format!(
                "index '{}': excluded label '{}' is outside the '{}' vocabulary",
                index, label, rule.dimension
            ));
        }
        if rule.weights.contains_key(label) {
            errors.push(format!(
                "index '{}': label '{}' is both weighted and excluded",
                index, label
            ));
        }
    }

    // Every legal label must be weighted or explicitly excluded; silent
    // fallback to zero is a correctness bug.
    for label in vocabulary {
        if !rule.weights.contains_key(label) && !rule.exclude.contains(label) {
            errors.push(format!(
                "index '{}': category '{}' of dimension '{}' is neither weighted nor excluded",
                index, label, rule.dimension
            ));
        }
    }
}

fn validate_group_ratio(
    index: &str,
    rule: &GroupRatioRule,
    dimensions: &BTreeMap<String, DimensionSchema>,
    errors: &mut Vec<String>,
) {
    if rule.group_a.name == rule.group_b.name {
        errors.push(format!(
            "index '{}': groups must have distinct names, both are '{}'",
            index, rule.group_a.name
        ));
    }

    let Some(vocabulary) =
        rule_vocabulary(index, &rule.dimension, rule.field.as_deref(), dimensions, errors)
    else {
        return;
    };

    for group in [&rule.group_a, &rule.group_b] {
        if group.categories.is_empty() {
            errors.push(format!(
                "index '{}': group '{}' has no categories",
                index, group.name
            ));
        }
        for label in &group.categories {
            if !vocabulary.contains(label) {
                errors.push(format!(
                    "index '{}': group '{}' label '{}' is outside the '{}' vocabulary",
                    index, group.name, label, rule.dimension
                ));
            }
        }
    }

    for label in &rule.group_a.categories {
        if rule.group_b.categories.contains(label) {
            errors.push(format!(
                "index '{}': label '{}' appears in both groups",
                index, label
            ));
        }
    }
}

fn validate_proportion(
    index: &str,
    rule: &ProportionRule,
    dimensions: &BTreeMap<String, DimensionSchema>,
    errors: &mut Vec<String>,
) {
    let Some(schema) = dimensions.get(&rule.dimension) else {
        errors.push(format!(
            "index '{}': unknown dimension '{}'",
            index, rule.dimension
        ));
        return;
    };

    // A bare presence test on an entity dimension needs no field; any
    // label-filtered or field-selected form validates like the others.
    if rule.field.is_none() && rule.any_of.is_none() {
        return;
    }
    if rule.any_of.is_some() && rule.field.is_none() && schema.entity {
        errors.push(format!(
            "index '{}': 'any_of' on entity dimension '{}' needs a 'field' selector",
            index, rule.dimension
        ));
        return;
    }

    let Some(vocabulary) =
        rule_vocabulary(index, &rule.dimension, rule.field.as_deref(), dimensions, errors)
    else {
        return;
    };

    if let Some(wanted) = &rule.any_of {
        if wanted.is_empty() {
            errors.push(format!("index '{}': 'any_of' is empty", index));
        }
        for label in wanted {
            if !vocabulary.contains(label) {
                errors.push(format!(
                    "index '{}': 'any_of' label '{}' is outside the '{}' vocabulary",
                    index, label, rule.dimension
                ));
            }
        }
    }
}

fn validate_blend(
    index: &str,
    rule: &BlendRule,
    dimensions: &BTreeMap<String, DimensionSchema>,
    depth: usize,
    errors: &mut Vec<String>,
) {
    if depth > 0 {
        errors.push(format!("index '{}': blends cannot nest", index));
        return;
    }
    if rule.terms.len() < 2 {
        errors.push(format!(
            "index '{}': a blend needs at least two terms",
            index
        ));
    }

    let sum: f64 = rule.terms.iter().map(|term| term.weight).sum();
    if (sum - 1.0).abs() > BLEND_WEIGHT_TOLERANCE {
        errors.push(format!(
            "index '{}': blend weights sum to {}, expected 1.0",
            index, sum
        ));
    }
    for term in &rule.terms {
        if term.weight <= 0.0 {
            errors.push(format!(
                "index '{}': blend term weight {} is not positive",
                index, term.weight
            ));
        }
        validate_rule(index, &term.rule, dimensions, depth + 1, errors);
    }
}

/// Per-dimension label coverage over a loaded corpus, for the `validate`
/// command. Unknown labels are reported, not raised, so a drifted corpus
/// can be inspected in one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionCoverage {
    /// Dimension name, suffixed with the attribute for entity fields
    /// (e.g. "actors.valence").
    pub dimension: String,
    /// Records carrying at least one label.
    pub annotated: usize,
    /// Records with no evidence for the dimension.
    pub missing: usize,
    /// Mention counts for labels inside the declared vocabulary.
    pub labels: BTreeMap<String, usize>,
    /// Mention counts for labels outside it.
    pub unknown: BTreeMap<String, usize>,
}

/// Scan a corpus against the dimension schemas and report label coverage.
pub fn vocabulary_report(
    records: &[AnnotationRecord],
    dimensions: &BTreeMap<String, DimensionSchema>,
) -> Vec<DimensionCoverage> {
    let mut report = Vec::new();

    for (name, schema) in dimensions {
        let selectors: Vec<Option<&str>> = if schema.entity {
            schema.fields.keys().map(|field| Some(field.as_str())).collect()
        } else {
            vec![None]
        };

        for selector in selectors {
            let vocabulary = schema.vocabulary(selector).unwrap_or(&[]);
            let mut coverage = DimensionCoverage {
                dimension: match selector {
                    Some(field) => format!("{}.{}", name, field),
                    None => name.clone(),
                },
                annotated: 0,
                missing: 0,
                labels: BTreeMap::new(),
                unknown: BTreeMap::new(),
            };

            for record in records {
                let labels = gather_labels(record, name, selector);
                if labels.is_empty() {
                    coverage.missing += 1;
                    continue;
                }
                coverage.annotated += 1;
                for label in labels {
                    let bucket = if vocabulary.iter().any(|known| known == label) {
                        &mut coverage.labels
                    } else {
                        &mut coverage.unknown
                    };
                    *bucket.entry(label.to_string()).or_insert(0) += 1;
                }
            }

            report.push(coverage);
        }
    }

    report
}

/// Like the resolver, but tolerant: out-of-vocabulary labels are returned
/// for reporting instead of raising.
fn gather_labels<'a>(
    record: &'a AnnotationRecord,
    dimension: &str,
    field: Option<&str>,
) -> Vec<&'a str> {
    match record.dimensions.get(dimension) {
        None => Vec::new(),
        Some(DimensionValue::Single(label)) => vec![label.as_str()],
        Some(DimensionValue::Multi(values)) => values.iter().map(String::as_str).collect(),
        Some(DimensionValue::Entities(mentions)) => {
            let Some(field) = field else { return Vec::new() };
            mentions
                .iter()
                .filter_map(|mention| mention.fields.get(field))
                .map(String::as_str)
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::spec::{
        BlendTerm, Group, IndexSpec, OutputRange, RatioKind,
    };

    fn base_dimensions() -> BTreeMap<String, DimensionSchema> {
        let mut dimensions = BTreeMap::new();
        dimensions.insert(
            "tone".to_string(),
            DimensionSchema {
                values: vec!["CONFIDENT".into(), "NEUTRAL".into(), "ALARMIST".into()],
                ..Default::default()
            },
        );
        dimensions
    }

    fn tone_weights() -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("CONFIDENT".to_string(), 1.5),
            ("NEUTRAL".to_string(), 0.0),
            ("ALARMIST".to_string(), -2.0),
        ])
    }

    fn spec_with(rule: Rule) -> AnalysisConfig {
        AnalysisConfig {
            corpus: "test".into(),
            dimensions: base_dimensions(),
            indices: vec![IndexSpec {
                name: "tone_index".into(),
                range: OutputRange { min: -1.0, max: 1.0 },
                rule,
            }],
        }
    }

    #[test]
    fn test_valid_config() {
        let config = spec_with(Rule::WeightedMean(WeightedMeanRule {
            dimension: "tone".into(),
            field: None,
            weights: tone_weights(),
            exclude: vec![],
            divisor: 2.0,
        }));
        assert!(validate_analysis(&config).is_ok());
    }

    #[test]
    fn test_uncovered_category_is_an_error() {
        let mut weights = tone_weights();
        weights.remove("ALARMIST");
        let config = spec_with(Rule::WeightedMean(WeightedMeanRule {
            dimension: "tone".into(),
            field: None,
            weights,
            exclude: vec![],
            divisor: 2.0,
        }));
        let errors = validate_analysis(&config).unwrap_err();
        assert!(errors[0].contains("ALARMIST"));
        assert!(errors[0].contains("neither weighted nor excluded"));
    }

    #[test]
    fn test_excluded_category_covers_the_vocabulary() {
        let mut weights = tone_weights();
        weights.remove("NEUTRAL");
        let config = spec_with(Rule::WeightedMean(WeightedMeanRule {
            dimension: "tone".into(),
            field: None,
            weights,
            exclude: vec!["NEUTRAL".into()],
            divisor: 2.0,
        }));
        assert!(validate_analysis(&config).is_ok());
    }

    #[test]
    fn test_unknown_dimension_is_an_error() {
        let config = spec_with(Rule::Proportion(ProportionRule {
            dimension: "legacy_framing".into(),
            field: None,
            any_of: None,
        }));
        let errors = validate_analysis(&config).unwrap_err();
        assert!(errors[0].contains("unknown dimension 'legacy_framing'"));
    }

    #[test]
    fn test_overlapping_groups_are_an_error() {
        let config = spec_with(Rule::GroupRatio(GroupRatioRule {
            dimension: "tone".into(),
            field: None,
            group_a: Group {
                name: "positive".into(),
                categories: vec!["CONFIDENT".into(), "NEUTRAL".into()],
            },
            group_b: Group {
                name: "negative".into(),
                categories: vec!["ALARMIST".into(), "NEUTRAL".into()],
            },
            kind: RatioKind::Balance,
        }));
        let errors = validate_analysis(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("both groups")));
    }

    #[test]
    fn test_blend_weights_must_sum_to_one() {
        let term_rule = Rule::WeightedMean(WeightedMeanRule {
            dimension: "tone".into(),
            field: None,
            weights: tone_weights(),
            exclude: vec![],
            divisor: 2.0,
        });
        let config = spec_with(Rule::Blend(BlendRule {
            terms: vec![
                BlendTerm {
                    weight: 0.6,
                    rule: term_rule.clone(),
                },
                BlendTerm {
                    weight: 0.6,
                    rule: term_rule,
                },
            ],
        }));
        let errors = validate_analysis(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("sum to 1.2")));
    }

    #[test]
    fn test_nested_blend_is_an_error() {
        let leaf = Rule::WeightedMean(WeightedMeanRule {
            dimension: "tone".into(),
            field: None,
            weights: tone_weights(),
            exclude: vec![],
            divisor: 2.0,
        });
        let inner = Rule::Blend(BlendRule {
            terms: vec![
                BlendTerm {
                    weight: 0.5,
                    rule: leaf.clone(),
                },
                BlendTerm {
                    weight: 0.5,
                    rule: leaf.clone(),
                },
            ],
        });
        let config = spec_with(Rule::Blend(BlendRule {
            terms: vec![
                BlendTerm {
                    weight: 0.5,
                    rule: inner,
                },
                BlendTerm {
                    weight: 0.5,
                    rule: leaf,
                },
            ],
        }));
        let errors = validate_analysis(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("cannot nest")));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = spec_with(Rule::WeightedMean(WeightedMeanRule {
            dimension: "tone".into(),
            field: None,
            weights: tone_weights(),
            exclude: vec![],
            divisor: 0.0, // Error 1
        }));
        config.indices[0].range = OutputRange { min: 1.0, max: -1.0 }; // Error 2
        let errors = validate_analysis(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_vocabulary_report_flags_unknown_labels() {
        use crate::records::AnnotationRecord;

        let dimensions = base_dimensions();
        let records = vec![
            AnnotationRecord {
                position: 1,
                text: None,
                dimensions: BTreeMap::from([(
                    "tone".to_string(),
                    DimensionValue::Single("CONFIDENT".into()),
                )]),
            },
            AnnotationRecord {
                position: 2,
                text: None,
                dimensions: BTreeMap::from([(
                    "tone".to_string(),
                    DimensionValue::Single("EUPHORIC".into()),
                )]),
            },
            AnnotationRecord {
                position: 3,
                text: None,
                dimensions: BTreeMap::new(),
            },
        ];

        let report = vocabulary_report(&records, &dimensions);
        assert_eq!(report.len(), 1);
        let coverage = &report[0];
        assert_eq!(coverage.dimension, "tone");
        assert_eq!(coverage.annotated, 2);
        assert_eq!(coverage.missing, 1);
        assert_eq!(coverage.labels["CONFIDENT"], 1);
        assert_eq!(coverage.unknown["EUPHORIC"], 1);
    }
}
