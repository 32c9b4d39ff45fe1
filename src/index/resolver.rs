use crate::config::DimensionSchema;
use crate::records::{AnnotationRecord, DimensionValue};

use super::error::IndexError;

/// Extract the category labels one record contributes to a dimension.
///
/// A missing dimension yields an empty sequence: the record contributes no
/// evidence and is tallied as excluded by the caller, never as a zero-weight
/// category. Labels outside the declared vocabulary are annotation drift and
/// raise `UnknownCategory` instead of being dropped.
///
/// For entity dimensions, `field` selects the categorical attribute (e.g.
/// "valence" on actor mentions); mentions lacking the attribute contribute
/// nothing. For single- and list-valued dimensions `field` must be None.
pub fn resolve_labels<'a>(
    record: &'a AnnotationRecord,
    dimension: &str,
    field: Option<&str>,
    schema: &DimensionSchema,
) -> Result<Vec<&'a str>, IndexError> {
    let vocabulary = schema.vocabulary(field).ok_or_else(|| IndexError::BadFieldSelector {
        dimension: dimension.to_string(),
        field: field.unwrap_or("(none)").to_string(),
    })?;

    let labels: Vec<&str> = match record.dimensions.get(dimension) {
        None => Vec::new(),
        Some(DimensionValue::Single(label)) => vec![label.as_str()],
        Some(DimensionValue::Multi(values)) => values.iter().map(String::as_str).collect(),
        Some(DimensionValue::Entities(mentions)) => {
            // vocabulary() only succeeds with a field selector here
            let field = field.unwrap_or_default();
            mentions
                .iter()
                .filter_map(|mention| mention.fields.get(field))
                .map(String::as_str)
                .collect()
        }
    };

    for label in &labels {
        if !vocabulary.iter().any(|known| known == label) {
            return Err(IndexError::UnknownCategory {
                dimension: dimension.to_string(),
                label: (*label).to_string(),
            });
        }
    }

    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::EntityMention;
    use std::collections::BTreeMap;

    fn register_schema() -> DimensionSchema {
        DimensionSchema {
            values: vec!["GRATEFUL".into(), "PROUD".into(), "NEUTRAL".into()],
            ..Default::default()
        }
    }

    fn actor_schema() -> DimensionSchema {
        let mut schema = DimensionSchema {
            entity: true,
            ..Default::default()
        };
        schema.fields.insert(
            "valence".into(),
            vec!["POSITIVE".into(), "NEUTRAL".into(), "NEGATIVE".into()],
        );
        schema
    }

    fn record(dimension: &str, value: DimensionValue) -> AnnotationRecord {
        let mut dimensions = BTreeMap::new();
        dimensions.insert(dimension.to_string(), value);
        AnnotationRecord {
            position: 1,
            text: None,
            dimensions,
        }
    }

    #[test]
    fn test_single_value_resolves_to_one_label() {
        let record = record("emotional_register", DimensionValue::Single("PROUD".into()));
        let labels =
            resolve_labels(&record, "emotional_register", None, &register_schema()).unwrap();
        assert_eq!(labels, vec!["PROUD"]);
    }

    #[test]
    fn test_missing_dimension_resolves_empty() {
        let record = record("speech_act", DimensionValue::Single("STATING".into()));
        let labels =
            resolve_labels(&record, "emotional_register", None, &register_schema()).unwrap();
        assert!(labels.is_empty());
    }

    #[test]
    fn test_entity_mentions_resolve_through_field() {
        let mentions = vec![
            EntityMention {
                name: Some("Europe".into()),
                fields: BTreeMap::from([("valence".to_string(), "POSITIVE".to_string())]),
            },
            EntityMention {
                name: Some("Russie".into()),
                fields: BTreeMap::from([("valence".to_string(), "NEGATIVE".to_string())]),
            },
            // No valence annotated: contributes nothing.
            EntityMention {
                name: Some("ONU".into()),
                fields: BTreeMap::new(),
            },
        ];
        let record = record("actors", DimensionValue::Entities(mentions));
        let labels = resolve_labels(&record, "actors", Some("valence"), &actor_schema()).unwrap();
        assert_eq!(labels, vec!["POSITIVE", "NEGATIVE"]);
    }

    #[test]
    fn test_unknown_category_is_an_error() {
        let record = record(
            "emotional_register",
            DimensionValue::Single("EUPHORIC".into()),
        );
        let err =
            resolve_labels(&record, "emotional_register", None, &register_schema()).unwrap_err();
        assert_eq!(
            err,
            IndexError::UnknownCategory {
                dimension: "emotional_register".into(),
                label: "EUPHORIC".into(),
            }
        );
    }

    #[test]
    fn test_undeclared_field_is_an_error() {
        let record = record("actors", DimensionValue::Entities(vec![]));
        let err = resolve_labels(&record, "actors", Some("role"), &actor_schema()).unwrap_err();
        assert!(matches!(err, IndexError::BadFieldSelector { .. }));
    }

    #[test]
    fn test_field_on_plain_dimension_is_an_error() {
        let record = record("emotional_register", DimensionValue::Single("PROUD".into()));
        let err = resolve_labels(
            &record,
            "emotional_register",
            Some("valence"),
            &register_schema(),
        )
        .unwrap_err();
        assert!(matches!(err, IndexError::BadFieldSelector { .. }));
    }
}
