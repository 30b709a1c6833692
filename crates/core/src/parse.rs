use serde_json::Value;
use thiserror::Error;

use crate::types::ConceptEntry;

/// Why a group's response yielded no concepts at all.
#[derive(Error, Debug)]
pub enum ParseFailure {
    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("expected a JSON object, got {kind}")]
    NotAnObject { kind: &'static str },
}

#[derive(Debug, Default, PartialEq)]
pub struct ParsedConcepts {
    pub entries: Vec<ConceptEntry>,
    /// Keys whose values were not strings, or that were empty.
    pub skipped: Vec<String>,
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse a sanitized model response of the shape `{"concept": "definition"}`.
///
/// Entries keep the object's key order. Entries that are not string to string
/// are skipped one by one instead of failing the whole response.
pub fn parse_concepts(text: &str) -> Result<ParsedConcepts, ParseFailure> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Object(map) = value else {
        return Err(ParseFailure::NotAnObject {
            kind: kind_of(&value),
        });
    };

    let mut parsed = ParsedConcepts::default();
    for (concept, definition) in map {
        match definition {
            Value::String(definition) if !concept.trim().is_empty() => {
                parsed.entries.push(ConceptEntry {
                    concept,
                    definition,
                });
            }
            _ => parsed.skipped.push(concept),
        }
    }
    Ok(parsed)
}
