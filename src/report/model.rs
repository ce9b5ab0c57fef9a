//! Task records and export metadata

use crate::stream::Metrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::path::Path;

/// A task's weight as the backend sent it
///
/// Numbers are kept as JSON numbers so integers stay integers on export;
/// anything else is kept verbatim and rendered as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeightValue {
    Number(Number),
    Raw(Value),
}

impl Default for WeightValue {
    fn default() -> Self {
        WeightValue::Raw(Value::Null)
    }
}

impl From<f64> for WeightValue {
    fn from(value: f64) -> Self {
        match Number::from_f64(value) {
            Some(n) => WeightValue::Number(n),
            None => WeightValue::Raw(Value::String(value.to_string())),
        }
    }
}

impl fmt::Display for WeightValue {
    /// One decimal place for finite numbers, the raw text otherwise
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightValue::Number(n) => match n.as_f64().filter(|v| v.is_finite()) {
                Some(v) => write!(f, "{v:.1}"),
                None => write!(f, "{n}"),
            },
            WeightValue::Raw(Value::String(s)) => f.write_str(s),
            WeightValue::Raw(other) => write!(f, "{other}"),
        }
    }
}

/// Missing and `null` both read as the type's default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Dependency info attached to a task
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Hierarchy {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<Value>,
}

/// One step of a task's breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailStep {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

/// A single generated microtask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicrotaskRecord {
    pub sequence_id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub work_phase: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub estimated_minutes: i64,
    #[serde(default)]
    pub weight_percentage: WeightValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concepts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_pointer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaffold_tip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hierarchy: Option<Hierarchy>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub decomposed_details: Vec<DetailStep>,
    /// Fields this crate does not know about, kept as received
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MicrotaskRecord {
    #[cfg(test)]
    pub fn new(sequence_id: i64, title: impl Into<String>) -> Self {
        Self {
            sequence_id,
            title: title.into(),
            description: String::new(),
            work_phase: String::new(),
            estimated_minutes: 0,
            weight_percentage: WeightValue::default(),
            concepts: None,
            source_pointer: None,
            scaffold_tip: None,
            hierarchy: None,
            decomposed_details: Vec::new(),
            extra: Map::new(),
        }
    }

    /// `"<minutes> min · <weight>%"`
    pub fn effort_line(&self) -> String {
        format!("{} min · {}%", self.estimated_minutes, self.weight_percentage)
    }
}

/// Metadata about an uploaded assignment file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMeta {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl AttachmentMeta {
    /// Read name and size from disk; the MIME type is guessed from the extension
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = tokio::fs::metadata(path).await?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self {
            name,
            mime_type: mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
            size_bytes: metadata.len(),
        })
    }
}

/// Everything the cover page and bundle need besides the tasks
#[derive(Debug, Clone, PartialEq)]
pub struct ReportMetadata {
    pub title: String,
    pub exported_at: DateTime<Utc>,
    pub course_id: String,
    pub assignment_id: String,
    pub dials: Metrics,
    pub attachment: Option<AttachmentMeta>,
    pub pedagogical_reasoning: Option<String>,
}
