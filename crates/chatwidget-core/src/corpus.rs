//! Training corpus records consumed by the matcher.
//!
//! The corpus is fetched and cached by the host; this module only turns the
//! stored payload into typed entries, skipping the ones that are unusable.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Instructions used when no corpus has been supplied at all.
pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful customer service assistant.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    /// Comma-separated keyword list. `null` reads as no keywords.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub keywords: String,
    pub answer: String,
}

impl FaqEntry {
    /// Lower-cased, trimmed keywords.
    pub fn keywords(&self) -> impl Iterator<Item = String> + '_ {
        self.keywords
            .split(',')
            .map(|k| k.trim().to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub title: String,
    #[serde(alias = "answer")]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingCorpus {
    #[serde(default)]
    pub faqs: Vec<FaqEntry>,
    #[serde(default)]
    pub knowledge: Vec<KnowledgeEntry>,
    /// Seeds the system message of the completion call.
    #[serde(default = "default_instructions")]
    pub instructions: String,
}

fn default_instructions() -> String {
    DEFAULT_INSTRUCTIONS.to_string()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Default for TrainingCorpus {
    fn default() -> Self {
        Self {
            faqs: Vec::new(),
            knowledge: Vec::new(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Faq,
    Knowledge,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Faq => write!(f, "faq"),
            EntryKind::Knowledge => write!(f, "knowledge"),
        }
    }
}

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("corpus payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corpus payload must be a JSON object")]
    NotAnObject,
    #[error("skipped {kind} entry #{index}: {reason}")]
    MalformedEntry {
        kind: EntryKind,
        index: usize,
        reason: String,
    },
}

/// A parsed corpus plus the entries that had to be dropped.
#[derive(Debug)]
pub struct CorpusLoad {
    pub corpus: TrainingCorpus,
    pub skipped: Vec<CorpusError>,
}

impl TrainingCorpus {
    pub fn from_json_str(payload: &str) -> Result<CorpusLoad, CorpusError> {
        let value: Value = serde_json::from_str(payload)?;
        Self::from_value(value)
    }

    /// Accepts the object itself or a string holding the serialized object.
    pub fn from_value(value: Value) -> Result<CorpusLoad, CorpusError> {
        let value = match value {
            Value::String(inner) => serde_json::from_str(&inner)?,
            other => other,
        };
        let Value::Object(mut fields) = value else {
            return Err(CorpusError::NotAnObject);
        };

        let mut skipped = Vec::new();
        let faqs = parse_entries(
            fields.remove("faqs"),
            EntryKind::Faq,
            |faq: &FaqEntry| {
                blank_field(&[
                    ("question", faq.question.as_str()),
                    ("answer", faq.answer.as_str()),
                ])
            },
            &mut skipped,
        );
        let knowledge = parse_entries(
            fields.remove("knowledge"),
            EntryKind::Knowledge,
            |item: &KnowledgeEntry| {
                blank_field(&[
                    ("title", item.title.as_str()),
                    ("content", item.content.as_str()),
                ])
            },
            &mut skipped,
        );
        let instructions = match fields.remove("instructions") {
            Some(Value::String(s)) => s,
            _ => default_instructions(),
        };

        for error in &skipped {
            warn!("{}", error);
        }

        Ok(CorpusLoad {
            corpus: TrainingCorpus {
                faqs,
                knowledge,
                instructions,
            },
            skipped,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.faqs.is_empty() && self.knowledge.is_empty()
    }
}

fn blank_field(fields: &[(&'static str, &str)]) -> Option<String> {
    fields
        .iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| format!("`{}` is blank", name))
}

fn parse_entries<T, F>(
    section: Option<Value>,
    kind: EntryKind,
    check: F,
    skipped: &mut Vec<CorpusError>,
) -> Vec<T>
where
    T: serde::de::DeserializeOwned,
    F: Fn(&T) -> Option<String>,
{
    let items = match section {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => return Vec::new(),
        Some(_) => {
            skipped.push(CorpusError::MalformedEntry {
                kind,
                index: 0,
                reason: "section is not an array".to_string(),
            });
            return Vec::new();
        }
    };

    let mut entries = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let entry: T = match serde_json::from_value(item) {
            Ok(entry) => entry,
            Err(e) => {
                skipped.push(CorpusError::MalformedEntry {
                    kind,
                    index,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        if let Some(reason) = check(&entry) {
            skipped.push(CorpusError::MalformedEntry {
                kind,
                index,
                reason,
            });
            continue;
        }
        entries.push(entry);
    }
    entries
}
