use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One persisted chunk part: the unit of storage and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub file_path: String,
    pub file_name: String,
    pub chunk_type: String,
    pub chunk_name: String,
    pub code: String,
    pub description: Option<String>,
    pub start_line: i32,
    pub end_line: i32,
    pub total_lines: i32,
    pub file_size: i32,
    #[serde(skip)]
    pub embedding: Vec<f32>,
    /// JSON-encoded [`RecordMetadata`].
    pub metadata: String,
}

/// Per-part metadata stored as a JSON string alongside each record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub node_type: String,
    pub part_index: usize,
    pub total_parts: usize,
}

impl RecordMetadata {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn from_json(s: &str) -> Option<Self> {
        serde_json::from_str(s).ok()
    }
}

/// Aggregate statistics over the whole table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub total_chunks: usize,
    pub chunk_types: BTreeMap<String, usize>,
    pub files: BTreeMap<String, usize>,
}
