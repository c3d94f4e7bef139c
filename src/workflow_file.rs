//! On-disk workflow documents.
//!
//! A workflow file is arbitrary JSON owned by the engine that exported it.
//! Only a handful of identity fields are read here, and only the `id` field
//! is ever rewritten; everything else passes through the pipeline untouched.

use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tokio::fs;

#[derive(Error, Debug)]
pub enum WorkflowFileError {
    #[error("Failed to read workflow file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Workflow file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Workflow file is not a JSON object")]
    NotAnObject,
}

/// A parsed workflow definition, held as raw JSON.
#[derive(Debug, Clone)]
pub struct WorkflowDoc {
    value: Value,
}

impl WorkflowDoc {
    pub fn from_value(value: Value) -> Result<Self, WorkflowFileError> {
        if !value.is_object() {
            return Err(WorkflowFileError::NotAnObject);
        }
        Ok(WorkflowDoc { value })
    }

    pub fn parse(content: &str) -> Result<Self, WorkflowFileError> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_value(value)
    }

    pub async fn load(path: &Path) -> Result<Self, WorkflowFileError> {
        let content = fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    #[must_use]
    pub fn declared_id(&self) -> Option<&str> {
        self.value.get("id").and_then(Value::as_str)
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.value.get("name").and_then(Value::as_str)
    }

    /// Marker embedded by the exporting instance (`meta.instanceId`).
    #[must_use]
    pub fn instance_marker(&self) -> Option<&str> {
        self.value
            .get("meta")
            .and_then(|meta| meta.get("instanceId"))
            .and_then(Value::as_str)
    }

    pub fn set_id(&mut self, id: &str) {
        if let Some(obj) = self.value.as_object_mut() {
            obj.insert("id".to_string(), Value::String(id.to_string()));
        }
    }

    /// Remove the id entirely so the remote assigns a fresh one on import.
    pub fn clear_id(&mut self) {
        if let Some(obj) = self.value.as_object_mut() {
            obj.remove("id");
        }
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WorkflowDoc {
        WorkflowDoc::parse(
            r#"{
                "id": "aB3dE5fG7hJ9kL1m",
                "name": "Sync Orders",
                "meta": {"instanceId": "inst-1"},
                "nodes": [{"type": "webhook"}]
            }"#,
        )
        .expect("Should parse")
    }

    #[test]
    fn test_field_accessors() {
        let doc = sample();
        assert_eq!(doc.declared_id(), Some("aB3dE5fG7hJ9kL1m"));
        assert_eq!(doc.name(), Some("Sync Orders"));
        assert_eq!(doc.instance_marker(), Some("inst-1"));
    }

    #[test]
    fn test_clear_id_removes_field() {
        let mut doc = sample();
        doc.clear_id();
        assert_eq!(doc.declared_id(), None);
        let json = doc.to_json_string().expect("Should serialize");
        assert!(!json.contains("\"id\""));
    }

    #[test]
    fn test_set_id_overwrites() {
        let mut doc = sample();
        doc.set_id("0000000000000000");
        assert_eq!(doc.declared_id(), Some("0000000000000000"));
    }

    #[test]
    fn test_unrelated_content_survives_rewrite() {
        let mut doc = sample();
        doc.set_id("0000000000000000");
        let json = doc.to_json_string().expect("Should serialize");
        let reparsed = WorkflowDoc::parse(&json).expect("Should reparse");
        assert!(reparsed.as_value().get("nodes").is_some());
        assert_eq!(reparsed.instance_marker(), Some("inst-1"));
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(WorkflowDoc::parse("[1, 2]").is_err());
        assert!(WorkflowDoc::parse("\"just a string\"").is_err());
    }

    #[test]
    fn test_non_string_id_is_ignored() {
        let doc = WorkflowDoc::parse(r#"{"id": 42, "name": "X"}"#).expect("Should parse");
        assert_eq!(doc.declared_id(), None);
    }
}
