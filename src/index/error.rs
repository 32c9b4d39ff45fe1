use serde::Serializer;
use thiserror::Error;

/// Per-index computation errors. One failing index never aborts the
/// others; the orchestrator collects these alongside successful results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    /// The rule references a dimension the corpus schema does not declare.
    #[error("unknown dimension '{dimension}'")]
    UnknownDimension { dimension: String },

    /// A record carries a label outside the dimension's declared
    /// vocabulary. Annotation drift, surfaced rather than ignored.
    #[error("unknown category '{label}' for dimension '{dimension}'")]
    UnknownCategory { dimension: String, label: String },

    /// A vocabulary label reached a weight table that neither weights nor
    /// excludes it.
    #[error("no weight entry for category '{label}' of dimension '{dimension}'")]
    MissingWeight { dimension: String, label: String },

    /// The rule addresses an entity attribute the schema does not declare,
    /// or omits the attribute on an entity dimension.
    #[error("dimension '{dimension}' has no usable field '{field}'")]
    BadFieldSelector { dimension: String, field: String },
}

/// A failed index paired with its name, as collected by the orchestrator.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct IndexFailure {
    pub index: String,
    #[serde(serialize_with = "serialize_error")]
    pub error: IndexError,
}

fn serialize_error<S: Serializer>(error: &IndexError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_offender() {
        let err = IndexError::UnknownCategory {
            dimension: "emotional_register".into(),
            label: "EUPHORIC".into(),
        };
        assert_eq!(
            err.to_string(),
            "unknown category 'EUPHORIC' for dimension 'emotional_register'"
        );
    }

    #[test]
    fn test_failure_serializes_error_as_message() {
        let failure = IndexFailure {
            index: "tone".into(),
            error: IndexError::MissingWeight {
                dimension: "emotional_register".into(),
                label: "SOLEMN".into(),
            },
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["index"], "tone");
        assert!(json["error"].as_str().unwrap().contains("SOLEMN"));
    }
}
