use crate::config::FilesystemInputConfig;
use async_trait::async_trait;
use compkit_core::{
    connector::{ConnectorConfig, Source},
    format, DataBatch, Error, Record, Result, Schema,
};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

pub struct FilesystemSource {
    config: FilesystemInputConfig,
    schema: Arc<Schema>,
    files: VecDeque<PathBuf>,
    pending: VecDeque<Record>,
}

impl FilesystemSource {
    pub fn new(config: ConnectorConfig) -> Result<Self> {
        Ok(Self::with_config(FilesystemInputConfig::from_json(
            config.properties_json(),
        )?))
    }

    pub fn with_config(config: FilesystemInputConfig) -> Self {
        let schema = config.dataset.schema();
        Self {
            config,
            schema,
            files: VecDeque::new(),
            pending: VecDeque::new(),
        }
    }
}

#[async_trait]
impl Source for FilesystemSource {
    async fn init(&mut self) -> Result<()> {
        let path = self.config.dataset.path().to_path_buf();
        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| Error::Read(format!("Cannot access {}: {}", path.display(), e)))?;

        let mut files = Vec::new();
        if metadata.is_dir() {
            let mut entries = fs::read_dir(&path).await?;
            while let Some(entry) = entries.next_entry().await? {
                if entry.file_type().await?.is_file() {
                    files.push(entry.path());
                }
            }
            files.sort();
        } else {
            files.push(path.clone());
        }

        info!(files = files.len(), "Reading filesystem input {}", path.display());
        self.files = files.into();
        self.pending.clear();
        Ok(())
    }

    async fn read_batch(&mut self, batch_size: usize) -> Result<Option<DataBatch>> {
        while self.pending.len() < batch_size {
            let Some(file) = self.files.pop_front() else {
                break;
            };
            let bytes = fs::read(&file).await?;
            let records = format::decode(&bytes, &self.config.dataset.format, &self.schema)?;
            debug!(records = records.len(), "Decoded {}", file.display());
            self.pending.extend(records);
        }

        if self.pending.is_empty() {
            return Ok(None);
        }
        let take = batch_size.max(1).min(self.pending.len());
        Ok(Some(DataBatch::new(self.pending.drain(..take).collect())))
    }

    async fn close(&mut self) -> Result<()> {
        self.files.clear();
        self.pending.clear();
        Ok(())
    }

    fn schema(&self) -> Option<Arc<Schema>> {
        Some(self.schema.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilesystemDatasetConfig;
    use compkit_core::format::{FileFormat, FormatOptions};
    use compkit_core::{Field, FieldType, Value};

    fn config(path: &std::path::Path) -> FilesystemInputConfig {
        FilesystemInputConfig {
            dataset: FilesystemDatasetConfig {
                path: path.to_string_lossy().into_owned(),
                format: FormatOptions {
                    format: FileFormat::Csv,
                    field_delimiter: ',',
                    header: true,
                },
                schema: Schema::new(
                    "people",
                    vec![
                        Field::new("name", FieldType::String),
                        Field::new("age", FieldType::Int),
                    ],
                ),
            },
        }
    }

    #[tokio::test]
    async fn test_reads_directory_parts_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("part-b.csv"), "name,age\nCy,3\n").unwrap();
        std::fs::write(dir.path().join("part-a.csv"), "name,age\nAnn,1\nBob,2\n").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let mut source = FilesystemSource::with_config(config(dir.path()));
        source.init().await.unwrap();

        let first = source.read_batch(2).await.unwrap().unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first.records[0].get_by_name("name"), Some(&Value::from("Ann")));
        let second = source.read_batch(2).await.unwrap().unwrap();
        assert_eq!(second.records[0].get_by_name("age"), Some(&Value::Int(3)));
        assert!(source.read_batch(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_path_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = FilesystemSource::with_config(config(&dir.path().join("nope")));
        assert!(matches!(source.init().await, Err(Error::Read(_))));
    }
}
