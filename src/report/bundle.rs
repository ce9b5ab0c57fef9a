//! JSON export bundle

use super::model::{AttachmentMeta, ReportMetadata};
use crate::backend::GenerationResponse;
use crate::stream::Metrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything needed to reproduce an export, written as pretty JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub exported_at: DateTime<Utc>,
    pub course_id: String,
    pub assignment_id: String,
    pub dials: Metrics,
    pub attachment: Option<AttachmentMeta>,
    /// Backend response exactly as received
    pub raw_response: Value,
    /// Task entries as received, nulls and empty lists included
    pub microtasks: Vec<Value>,
}

impl ExportBundle {
    pub fn build(metadata: &ReportMetadata, response: &GenerationResponse) -> Self {
        Self {
            exported_at: metadata.exported_at,
            course_id: metadata.course_id.clone(),
            assignment_id: metadata.assignment_id.clone(),
            dials: metadata.dials,
            attachment: metadata.attachment.clone(),
            raw_response: response.raw.clone(),
            microtasks: response.task_values.clone(),
        }
    }

    /// File name stem shared by the bundle and its rendered report
    pub fn file_stem(&self) -> String {
        let sanitize = |s: &str| -> String {
            s.chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
                .collect()
        };
        format!(
            "microtasks-{}-{}-{}",
            sanitize(&self.course_id),
            sanitize(&self.assignment_id),
            self.exported_at.format("%Y%m%dT%H%M%SZ")
        )
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
