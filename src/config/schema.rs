use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::index::spec::IndexSpec;

/// Per-corpus analysis configuration: the dimension schemas and the index
/// registry. One file per corpus, since vocabularies and group partitions
/// differ across speeches.
///
/// Example YAML:
/// ```yaml
/// corpus: macron_diplomacy_2026
/// dimensions:
///   emotional_register:
///     values: [ALARMIST, COMBATIVE, NEUTRAL, CONFIDENT]
///   speech_act:
///     multi: true
///     values: [STATING, PROPOSING, COMMITTING]
///   actors:
///     entity: true
///     fields:
///       valence: [POSITIVE, NEUTRAL, NEGATIVE, AMBIGUOUS]
/// indices:
///   - name: diplomatic_tone
///     range: { min: -1.0, max: 1.0 }
///     rule:
///       type: weighted_mean
///       dimension: emotional_register
///       divisor: 2.0
///       weights: { ALARMIST: -2.0, COMBATIVE: -1.5, NEUTRAL: 0.0, CONFIDENT: 1.5 }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    pub corpus: String,
    pub dimensions: BTreeMap<String, DimensionSchema>,
    pub indices: Vec<IndexSpec>,
}

/// Declared shape and vocabulary of one annotation dimension.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DimensionSchema {
    /// List-valued dimension (a record may carry several labels).
    #[serde(default)]
    pub multi: bool,

    /// Sub-entity dimension (mentions with categorical attribute fields).
    #[serde(default)]
    pub entity: bool,

    /// Fixed vocabulary, for single- and list-valued dimensions.
    #[serde(default)]
    pub values: Vec<String>,

    /// Attribute name -> fixed vocabulary, for entity dimensions.
    #[serde(default)]
    pub fields: BTreeMap<String, Vec<String>>,
}

impl DimensionSchema {
    /// The vocabulary a rule over this dimension validates against:
    /// an attribute's vocabulary for entity dimensions, `values` otherwise.
    pub fn vocabulary(&self, field: Option<&str>) -> Option<&[String]> {
        if self.entity {
            field
                .and_then(|name| self.fields.get(name))
                .map(|labels| labels.as_slice())
        } else if field.is_none() {
            Some(&self.values)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::spec::Rule;

    #[test]
    fn test_full_analysis_config_parse() {
        let yaml = r#"
corpus: macron_diplomacy_2026
dimensions:
  emotional_register:
    values: [ALARMIST, NEUTRAL, CONFIDENT]
  geopolitical_frame:
    multi: true
    values: [DISORDER, OPPORTUNITY, NONE]
  actors:
    entity: true
    fields:
      valence: [POSITIVE, NEUTRAL, NEGATIVE]
indices:
  - name: diplomatic_tone
    range: { min: -1.0, max: 1.0 }
    rule:
      type: weighted_mean
      dimension: emotional_register
      divisor: 2.0
      weights: { ALARMIST: -2.0, NEUTRAL: 0.0, CONFIDENT: 1.5 }
"#;
        let config: AnalysisConfig = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(config.corpus, "macron_diplomacy_2026");
        assert_eq!(config.dimensions.len(), 3);
        assert!(config.dimensions["geopolitical_frame"].multi);
        assert!(config.dimensions["actors"].entity);
        assert_eq!(config.indices.len(), 1);
        assert!(matches!(config.indices[0].rule, Rule::WeightedMean(_)));
    }

    #[test]
    fn test_vocabulary_lookup() {
        let mut actors = DimensionSchema {
            entity: true,
            ..Default::default()
        };
        actors
            .fields
            .insert("valence".into(), vec!["POSITIVE".into(), "NEGATIVE".into()]);

        assert_eq!(actors.vocabulary(Some("valence")).unwrap().len(), 2);
        assert!(actors.vocabulary(Some("role")).is_none());
        assert!(actors.vocabulary(None).is_none());

        let register = DimensionSchema {
            values: vec!["NEUTRAL".into()],
            ..Default::default()
        };
        assert_eq!(register.vocabulary(None).unwrap().len(), 1);
        assert!(register.vocabulary(Some("valence")).is_none());
    }
}
