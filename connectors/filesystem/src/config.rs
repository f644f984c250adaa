use compkit_core::{format::FormatOptions, properties::validate_properties, Result, Schema};
use jsonschema::Validator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

lazy_static::lazy_static! {
    pub(crate) static ref INPUT_PROPERTIES: Value =
        serde_json::from_str(include_str!("../schema/input.json")).unwrap();
    pub(crate) static ref OUTPUT_PROPERTIES: Value =
        serde_json::from_str(include_str!("../schema/output.json")).unwrap();
    static ref INPUT_SCHEMA: Validator = Validator::new(&INPUT_PROPERTIES).unwrap();
    static ref OUTPUT_SCHEMA: Validator = Validator::new(&OUTPUT_PROPERTIES).unwrap();
}

/// Location, encoding and shape of the files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemDatasetConfig {
    pub path: String,
    #[serde(flatten)]
    pub format: FormatOptions,
    pub schema: Schema,
}

impl FilesystemDatasetConfig {
    pub fn path(&self) -> &Path {
        Path::new(&self.path)
    }

    pub fn schema(&self) -> Arc<Schema> {
        Arc::new(self.schema.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemInputConfig {
    pub dataset: FilesystemDatasetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemOutputConfig {
    pub dataset: FilesystemDatasetConfig,
    /// Replace an existing target instead of failing.
    #[serde(default)]
    pub overwrite: bool,
    /// Write a single file at `path` rather than a part file inside it.
    #[serde(default)]
    pub merge_output: bool,
}

impl FilesystemInputConfig {
    pub fn from_json(value: Value) -> Result<Self> {
        validate_properties(&INPUT_SCHEMA, value, "FilesystemInput")
    }
}

impl FilesystemOutputConfig {
    pub fn from_json(value: Value) -> Result<Self> {
        validate_properties(&OUTPUT_SCHEMA, value, "FilesystemOutput")
    }

    /// File written by the writer identified by `uid`.
    pub fn target_file(&self, uid: &str) -> PathBuf {
        if self.merge_output {
            self.dataset.path().to_path_buf()
        } else {
            self.dataset.path().join(format!(
                "part-{}.{}",
                uid,
                self.dataset.format.format.extension()
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compkit_core::format::FileFormat;
    use serde_json::json;

    fn dataset() -> Value {
        json!({
            "path": "/data/out",
            "format": "jsonl",
            "schema": {"name": "people", "fields": [{"name": "name", "type": "string"}]}
        })
    }

    #[test]
    fn test_output_defaults() {
        let config = FilesystemOutputConfig::from_json(json!({ "dataset": dataset() })).unwrap();
        assert!(!config.overwrite);
        assert!(!config.merge_output);
        assert_eq!(config.dataset.format.format, FileFormat::Jsonl);
        assert_eq!(config.dataset.format.field_delimiter, ';');
        assert_eq!(
            config.target_file("w1"),
            PathBuf::from("/data/out/part-w1.jsonl")
        );
    }

    #[test]
    fn test_merged_output_targets_the_path() {
        let config = FilesystemOutputConfig::from_json(json!({
            "dataset": dataset(),
            "merge_output": true
        }))
        .unwrap();
        assert_eq!(config.target_file("w1"), PathBuf::from("/data/out"));
    }

    #[test]
    fn test_invalid_properties() {
        assert!(FilesystemInputConfig::from_json(json!({})).is_err());
        assert!(FilesystemInputConfig::from_json(json!({
            "dataset": {"path": "", "schema": {"name": "x", "fields": []}}
        }))
        .is_err());
        assert!(FilesystemOutputConfig::from_json(json!({
            "dataset": dataset(),
            "overwrite": "yes"
        }))
        .is_err());
        assert!(FilesystemInputConfig::from_json(json!({
            "dataset": {
                "path": "/in",
                "schema": {"name": "x", "fields": [{"name": "a", "type": "decimal"}]}
            }
        }))
        .is_err());
    }
}
