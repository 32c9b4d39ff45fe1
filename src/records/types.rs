use std::collections::BTreeMap;

/// One annotated sentence (or utterance) from a transcript.
///
/// Records are immutable once loaded. A dimension absent from `dimensions`
/// means the annotation is missing for that record; it is never defaulted.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    /// 1-based position in document order.
    pub position: usize,
    /// Source sentence, when the input carries it.
    pub text: Option<String>,
    /// Dimension name -> annotated value(s).
    pub dimensions: BTreeMap<String, DimensionValue>,
}

/// The annotated value a record carries for one dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum DimensionValue {
    /// Single categorical label (e.g. emotional register).
    Single(String),
    /// List of categorical labels (e.g. speech acts).
    Multi(Vec<String>),
    /// Sub-entity mentions, each with its own categorical attributes
    /// (e.g. actors with a valence, policy proposals with a specificity).
    Entities(Vec<EntityMention>),
}

/// One sub-entity mention within a record.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMention {
    /// Named entity, when present (e.g. the actor name).
    pub name: Option<String>,
    /// Categorical attribute fields (e.g. "valence" -> "NEGATIVE").
    pub fields: BTreeMap<String, String>,
}

impl AnnotationRecord {
    /// Whether the record carries any evidence for `dimension`.
    /// An empty list or an empty mention set counts as no evidence.
    pub fn has_annotation(&self, dimension: &str) -> bool {
        match self.dimensions.get(dimension) {
            None => false,
            Some(DimensionValue::Single(_)) => true,
            Some(DimensionValue::Multi(labels)) => !labels.is_empty(),
            Some(DimensionValue::Entities(mentions)) => !mentions.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with(dimension: &str, value: DimensionValue) -> AnnotationRecord {
        let mut dimensions = BTreeMap::new();
        dimensions.insert(dimension.to_string(), value);
        AnnotationRecord {
            position: 1,
            text: None,
            dimensions,
        }
    }

    #[test]
    fn test_missing_dimension_has_no_annotation() {
        let record = record_with("speech_act", DimensionValue::Single("STATING".into()));
        assert!(record.has_annotation("speech_act"));
        assert!(!record.has_annotation("emotional_register"));
    }

    #[test]
    fn test_empty_list_has_no_annotation() {
        let record = record_with("speech_act", DimensionValue::Multi(vec![]));
        assert!(!record.has_annotation("speech_act"));
    }

    #[test]
    fn test_empty_mentions_have_no_annotation() {
        let record = record_with("actors", DimensionValue::Entities(vec![]));
        assert!(!record.has_annotation("actors"));
    }
}
