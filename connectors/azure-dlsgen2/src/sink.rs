use crate::config::AzureDlsGen2BlobOutputConfig;
use async_trait::async_trait;
use compkit_core::{
    connector::{ConnectorConfig, Sink, WriteResult},
    format, DataBatch, Error, Record, Result,
};
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use std::sync::Arc;
use tracing::{debug, info};

/// Uploads records as blobs holding at most `max_records_per_blob`
/// records each. Every blob is a complete file, header included.
pub struct AzureDlsGen2BlobSink {
    config: AzureDlsGen2BlobOutputConfig,
    store: Option<Arc<dyn ObjectStore>>,
    uid: String,
    buffer: Vec<Record>,
    blob_index: usize,
    data_count: u64,
}

impl AzureDlsGen2BlobSink {
    pub fn new(config: ConnectorConfig) -> Result<Self> {
        Ok(Self::with_config(AzureDlsGen2BlobOutputConfig::from_json(
            config.properties_json(),
        )?))
    }

    pub fn with_config(config: AzureDlsGen2BlobOutputConfig) -> Self {
        Self {
            config,
            store: None,
            uid: String::new(),
            buffer: Vec::new(),
            blob_index: 0,
            data_count: 0,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    async fn upload(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| Error::Write("Blob sink is not initialised".into()))?;

        let dataset = &self.config.dataset;
        let bytes = format::encode(&self.buffer, &dataset.format, dataset.format.header)?;
        let location = dataset.blob_name(&self.uid, self.blob_index);

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, dataset.format.format.content_type().into());
        let options = PutOptions {
            attributes,
            ..Default::default()
        };
        store
            .put_opts(&location, PutPayload::from(bytes), options)
            .await
            .map_err(|e| Error::Write(format!("Failed to upload blob {}: {}", location, e)))?;

        debug!(records = self.buffer.len(), "Uploaded blob {}", location);
        self.blob_index += 1;
        self.buffer.clear();
        Ok(())
    }
}

#[async_trait]
impl Sink for AzureDlsGen2BlobSink {
    async fn init(&mut self, uid: &str) -> Result<()> {
        self.uid = uid.to_string();
        if self.store.is_none() {
            let connection = self.config.connection.connection()?;
            info!(
                account = connection.account_name(),
                container = %self.config.dataset.container,
                "Opening blob output"
            );
            self.store = Some(connection.blob_store(&self.config.dataset.container)?);
        }
        Ok(())
    }

    async fn write_batch(&mut self, batch: DataBatch) -> Result<()> {
        let limit = self.config.max_records_per_blob.max(1);
        for record in batch.records {
            self.data_count += 1;
            self.buffer.push(record);
            if self.buffer.len() >= limit {
                self.upload().await?;
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<WriteResult> {
        self.upload().await?;
        info!(
            records = self.data_count,
            blobs = self.blob_index,
            "Closed blob output"
        );
        Ok(WriteResult::new(
            self.uid.clone(),
            self.data_count,
            self.data_count,
            0,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compkit_core::{Field, FieldType, Schema, Value};
    use futures::TryStreamExt;
    use object_store::memory::InMemory;
    use object_store::path::Path as ObjectPath;
    use serde_json::json;

    fn config(max_records_per_blob: usize) -> AzureDlsGen2BlobOutputConfig {
        AzureDlsGen2BlobOutputConfig::from_json(json!({
            "connection": {"account_name": "talendstore", "account_key": "a2V5"},
            "dataset": {
                "container": "landing",
                "blob_path": "out",
                "format": "csv",
                "field_delimiter": ",",
                "header": true,
                "schema": {"name": "n", "fields": [{"name": "n", "type": "int"}]}
            },
            "max_records_per_blob": max_records_per_blob
        }))
        .unwrap()
    }

    fn batch(values: std::ops::Range<i64>) -> DataBatch {
        let schema = Arc::new(Schema::new("n", vec![Field::new("n", FieldType::Int)]));
        DataBatch::new(
            values
                .map(|n| Record::from_values(schema.clone(), vec![Value::Int(n)]).unwrap())
                .collect(),
        )
    }

    async fn read(store: &InMemory, path: &str) -> String {
        let bytes = store
            .get(&ObjectPath::from(path))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_rolls_blobs_at_record_limit() {
        let store = Arc::new(InMemory::new());
        let mut sink = AzureDlsGen2BlobSink::with_config(config(2)).with_store(store.clone());

        sink.init("w1").await.unwrap();
        sink.write_batch(batch(0..3)).await.unwrap();
        sink.write_batch(batch(3..5)).await.unwrap();
        let result = sink.close().await.unwrap();

        assert_eq!(result, WriteResult::new("w1", 5, 5, 0));
        let mut names: Vec<String> = store
            .list(None)
            .map_ok(|m| m.location.to_string())
            .try_collect()
            .await
            .unwrap();
        names.sort();
        assert_eq!(
            names,
            vec!["out/w1-00000.csv", "out/w1-00001.csv", "out/w1-00002.csv"]
        );
        assert_eq!(read(&store, "out/w1-00000.csv").await, "n\n0\n1\n");
        assert_eq!(read(&store, "out/w1-00002.csv").await, "n\n4\n");
    }

    #[tokio::test]
    async fn test_nothing_written_uploads_nothing() {
        let store = Arc::new(InMemory::new());
        let mut sink = AzureDlsGen2BlobSink::with_config(config(10)).with_store(store.clone());
        sink.init("w1").await.unwrap();
        let result = sink.close().await.unwrap();
        assert_eq!(result.data_count, 0);
        let listed: Vec<_> = store.list(None).try_collect().await.unwrap();
        assert!(listed.is_empty());
    }
}
