use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::types::{AnnotationRecord, DimensionValue, EntityMention};

/// Column names that carry the sentence text rather than an annotation.
const TEXT_COLUMNS: [&str; 4] = ["text", "sentence", "segment", "utterance"];

/// Column names that identify the row rather than annotate it.
const ID_COLUMNS: [&str; 4] = ["segment_id", "sentence_id", "id", "position"];

/// Column names under which annotators nest the label object.
const LABEL_COLUMNS: [&str; 3] = ["labels", "annotation", "annotations"];

/// A loaded corpus: the record sequence plus how many rows were dropped
/// as malformed.
#[derive(Debug)]
pub struct LoadedCorpus {
    pub records: Vec<AnnotationRecord>,
    pub dropped: usize,
}

/// Load annotation records from a JSON array or JSONL file.
///
/// Rows that are not objects, or JSONL lines that fail to parse, are
/// dropped and counted rather than aborting the load. A file that yields
/// zero records is an error: the corpus cannot be computed at all.
pub fn load_records(path: &Path) -> Result<LoadedCorpus> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read annotation file at {}", path.display()))?;

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let mut dropped = 0usize;

    let rows: Vec<Value> = match extension {
        "json" => {
            let parsed: Value = serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in {}", path.display()))?;
            match parsed {
                Value::Array(rows) => rows,
                _ => anyhow::bail!(
                    "Expected a JSON array of records in {}",
                    path.display()
                ),
            }
        }
        "jsonl" => content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<Value>(line) {
                Ok(value) => Some(value),
                Err(_) => {
                    dropped += 1;
                    None
                }
            })
            .collect(),
        other => anyhow::bail!("Unsupported annotation file format: .{}", other),
    };

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        match row {
            Value::Object(fields) => {
                records.push(parse_record(fields, records.len() + 1));
            }
            _ => dropped += 1,
        }
    }

    if records.is_empty() {
        anyhow::bail!(
            "No usable annotation records in {} ({} rows dropped)",
            path.display(),
            dropped
        );
    }

    Ok(LoadedCorpus { records, dropped })
}

/// Find the annotation file under `data/` when none was given explicitly.
pub fn find_data_file() -> Result<PathBuf> {
    for pattern in ["data/*.jsonl", "data/*.json"] {
        let mut matches: Vec<PathBuf> = glob::glob(pattern)
            .context("Invalid data glob pattern")?
            .filter_map(|entry| entry.ok())
            .collect();
        matches.sort();
        if let Some(path) = matches.into_iter().next() {
            return Ok(path);
        }
    }
    anyhow::bail!("No annotation file found in data/ (expected *.json or *.jsonl)")
}

fn parse_record(fields: serde_json::Map<String, Value>, position: usize) -> AnnotationRecord {
    let mut text = None;
    let mut dimensions = BTreeMap::new();

    // Nested label objects are flattened into the record's dimension map.
    let mut pending: Vec<(String, Value)> = Vec::new();
    for (key, value) in fields {
        if LABEL_COLUMNS.contains(&key.as_str()) {
            if let Value::Object(nested) = value {
                pending.extend(nested);
            }
        } else {
            pending.push((key, value));
        }
    }

    for (key, value) in pending {
        if TEXT_COLUMNS.contains(&key.as_str()) {
            if let Value::String(s) = value {
                if !s.trim().is_empty() {
                    text = Some(s);
                }
            }
            continue;
        }
        if ID_COLUMNS.contains(&key.as_str()) {
            continue;
        }
        if let Some(parsed) = parse_dimension_value(value) {
            dimensions.insert(key, parsed);
        }
    }

    AnnotationRecord {
        position,
        text,
        dimensions,
    }
}

/// Map one JSON annotation value onto the record model. Returns None for
/// values that carry no evidence (null, absent annotations, empty labels).
fn parse_dimension_value(value: Value) -> Option<DimensionValue> {
    match value {
        Value::String(label) => {
            let label = label.trim().to_string();
            if label.is_empty() {
                None
            } else {
                Some(DimensionValue::Single(label))
            }
        }
        Value::Array(items) => parse_array(items),
        Value::Object(fields) => parse_present_object(fields),
        _ => None,
    }
}

fn parse_array(items: Vec<Value>) -> Option<DimensionValue> {
    if items.is_empty() {
        return None;
    }
    if items.iter().all(|item| item.is_string()) {
        let labels: Vec<String> = items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                _ => None,
            })
            .collect();
        if labels.is_empty() {
            return None;
        }
        return Some(DimensionValue::Multi(labels));
    }

    let mentions: Vec<EntityMention> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(fields) => Some(parse_mention(fields)),
            _ => None,
        })
        .collect();
    if mentions.is_empty() {
        None
    } else {
        Some(DimensionValue::Entities(mentions))
    }
}

/// Annotation objects use `"present": false` to mark inapplicable
/// dimensions; present objects become entity mentions. One list-valued
/// attribute (e.g. a list of justification targets) is exploded into one
/// mention per element, matching how the annotation schema multiplexes
/// repeated sub-entities.
fn parse_present_object(fields: serde_json::Map<String, Value>) -> Option<DimensionValue> {
    if let Some(Value::Bool(false)) = fields.get("present") {
        return None;
    }

    let mut scalar_fields = BTreeMap::new();
    let mut exploded: Option<(String, Vec<String>)> = None;

    for (key, value) in &fields {
        if key == "present" {
            continue;
        }
        match value {
            Value::String(s) if !s.trim().is_empty() => {
                scalar_fields.insert(key.clone(), s.trim().to_string());
            }
            Value::Array(items) if exploded.is_none() => {
                let labels: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.as_str())
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                if !labels.is_empty() {
                    exploded = Some((key.clone(), labels));
                }
            }
            _ => {}
        }
    }

    if scalar_fields.is_empty() && exploded.is_none() {
        return None;
    }

    let mentions = match exploded {
        Some((key, labels)) => labels
            .into_iter()
            .map(|label| {
                let mut mention_fields = scalar_fields.clone();
                mention_fields.insert(key.clone(), label);
                EntityMention {
                    name: None,
                    fields: mention_fields,
                }
            })
            .collect(),
        None => vec![EntityMention {
            name: None,
            fields: scalar_fields,
        }],
    };

    Some(DimensionValue::Entities(mentions))
}

fn parse_mention(fields: serde_json::Map<String, Value>) -> EntityMention {
    let mut name = None;
    let mut mention_fields = BTreeMap::new();

    for (key, value) in fields {
        let Value::String(s) = value else { continue };
        let s = s.trim().to_string();
        if s.is_empty() {
            continue;
        }
        if key == "actor" || key == "name" || key == "entity" {
            name = Some(s);
        } else {
            mention_fields.insert(key, s);
        }
    }

    EntityMention {
        name,
        fields: mention_fields,
    }
}
