//! Index records as stored in `index.json`.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sr_runner::ScriptItem;

/// One script entry of the index file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRecord {
    pub id: String,
    pub name: String,
    pub file_path: PathBuf,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ScriptRecord {
    pub fn to_item(&self) -> ScriptItem {
        ScriptItem::new(&self.id, &self.name, &self.file_path)
    }
}

impl From<ScriptRecord> for ScriptItem {
    fn from(record: ScriptRecord) -> Self {
        ScriptItem::new(record.id, record.name, record.file_path)
    }
}

/// Content of `index.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptIndex {
    #[serde(default)]
    pub scripts: Vec<ScriptRecord>,
}

impl ScriptIndex {
    pub fn find(&self, id: &str) -> Option<&ScriptRecord> {
        self.scripts.iter().find(|script| script.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_index_written_by_desktop_app() {
        let json = r#"{
          "scripts": [
            {
              "id": "lz4k2a9f1x",
              "name": "hello.py",
              "filePath": "/data/scripts/hello.py",
              "explanation": "Prints a greeting",
              "tags": [],
              "createdAt": "2025-01-02T10:20:30.400Z"
            }
          ]
        }"#;

        let index: ScriptIndex = serde_json::from_str(json).unwrap();
        let record = index.find("lz4k2a9f1x").unwrap();

        assert_eq!(record.name, "hello.py");
        assert_eq!(record.created_at.to_rfc3339(), "2025-01-02T10:20:30.400+00:00");

        let item = record.to_item();
        assert_eq!(item.file_path, PathBuf::from("/data/scripts/hello.py"));
        assert_eq!(item.extension(), Some("py"));
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = r#"{"scripts":[{"id":"a","name":"a.sh","filePath":"/a.sh","createdAt":"2025-01-01T00:00:00Z"}]}"#;
        let index: ScriptIndex = serde_json::from_str(json).unwrap();
        assert_eq!(index.scripts[0].explanation, "");
        assert!(index.scripts[0].tags.is_empty());

        let empty: ScriptIndex = serde_json::from_str("{}").unwrap();
        assert!(empty.scripts.is_empty());
    }
}
