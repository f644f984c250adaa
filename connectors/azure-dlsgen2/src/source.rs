use crate::config::AzureDlsGen2BlobInputConfig;
use async_trait::async_trait;
use compkit_core::{
    connector::{ConnectorConfig, Source},
    format, DataBatch, Error, Record, Result, Schema,
};
use futures::TryStreamExt;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

pub struct AzureDlsGen2BlobSource {
    config: AzureDlsGen2BlobInputConfig,
    schema: Arc<Schema>,
    store: Option<Arc<dyn ObjectStore>>,
    blobs: VecDeque<ObjectPath>,
    pending: VecDeque<Record>,
}

impl AzureDlsGen2BlobSource {
    pub fn new(config: ConnectorConfig) -> Result<Self> {
        Ok(Self::with_config(AzureDlsGen2BlobInputConfig::from_json(
            config.properties_json(),
        )?))
    }

    pub fn with_config(config: AzureDlsGen2BlobInputConfig) -> Self {
        let schema = config.dataset.schema();
        Self {
            config,
            schema,
            store: None,
            blobs: VecDeque::new(),
            pending: VecDeque::new(),
        }
    }

    /// Reads from `store` instead of connecting to the account.
    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    fn store(&self) -> Result<&Arc<dyn ObjectStore>> {
        self.store
            .as_ref()
            .ok_or_else(|| Error::Read("Blob source is not initialised".into()))
    }
}

#[async_trait]
impl Source for AzureDlsGen2BlobSource {
    async fn init(&mut self) -> Result<()> {
        if self.store.is_none() {
            let connection = self.config.connection.connection()?;
            self.store = Some(connection.blob_store(&self.config.dataset.container)?);
        }

        let prefix = self.config.dataset.prefix();
        let mut blobs: Vec<ObjectPath> = self
            .store()?
            .list(prefix.as_ref())
            .map_ok(|meta| meta.location)
            .try_collect()
            .await
            .map_err(|e| Error::Read(format!("Failed to list blobs: {}", e)))?;
        blobs.sort();

        info!(
            container = %self.config.dataset.container,
            blobs = blobs.len(),
            "Reading blobs under {}",
            self.config.dataset.blob_path
        );
        self.blobs = blobs.into();
        self.pending.clear();
        Ok(())
    }

    async fn read_batch(&mut self, batch_size: usize) -> Result<Option<DataBatch>> {
        while self.pending.len() < batch_size {
            let Some(blob) = self.blobs.pop_front() else {
                break;
            };
            let bytes = self
                .store()?
                .get(&blob)
                .await
                .map_err(|e| Error::Read(format!("Failed to get blob {}: {}", blob, e)))?
                .bytes()
                .await
                .map_err(|e| Error::Read(format!("Failed to read blob {}: {}", blob, e)))?;
            let records = format::decode(&bytes, &self.config.dataset.format, &self.schema)?;
            debug!(records = records.len(), "Decoded blob {}", blob);
            self.pending.extend(records);
        }

        if self.pending.is_empty() {
            return Ok(None);
        }
        let take = batch_size.max(1).min(self.pending.len());
        Ok(Some(DataBatch::new(self.pending.drain(..take).collect())))
    }

    async fn close(&mut self) -> Result<()> {
        self.blobs.clear();
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
    use compkit_core::Value;
    use object_store::memory::InMemory;
    use object_store::PutPayload;
    use serde_json::json;

    fn config() -> AzureDlsGen2BlobInputConfig {
        AzureDlsGen2BlobInputConfig::from_json(json!({
            "connection": {"account_name": "talendstore", "account_key": "a2V5"},
            "dataset": {
                "container": "landing",
                "blob_path": "in",
                "format": "jsonl",
                "schema": {
                    "name": "account",
                    "fields": [
                        {"name": "Name", "type": "string"},
                        {"name": "Employees", "type": "int"}
                    ]
                }
            }
        }))
        .unwrap()
    }

    async fn put(store: &InMemory, path: &str, body: &str) {
        store
            .put(&ObjectPath::from(path), PutPayload::from(body.as_bytes().to_vec()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reads_blobs_under_prefix_in_order() {
        let store = Arc::new(InMemory::new());
        put(&store, "in/b.jsonl", "{\"Name\":\"Globex\",\"Employees\":30}\n").await;
        put(&store, "in/a.jsonl", "{\"Name\":\"Acme\",\"Employees\":10}\n{\"Name\":\"Initech\"}\n").await;
        put(&store, "other/c.jsonl", "{\"Name\":\"Ignored\"}\n").await;

        let mut source = AzureDlsGen2BlobSource::with_config(config()).with_store(store);
        source.init().await.unwrap();

        let batch = source.read_batch(10).await.unwrap().unwrap();
        let names: Vec<_> = batch
            .records
            .iter()
            .map(|r| r.get_by_name("Name").cloned().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![Value::from("Acme"), Value::from("Initech"), Value::from("Globex")]
        );
        assert_eq!(batch.records[1].get_by_name("Employees"), Some(&Value::Null));
        assert!(source.read_batch(10).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_prefix_yields_nothing() {
        let store = Arc::new(InMemory::new());
        let mut source = AzureDlsGen2BlobSource::with_config(config()).with_store(store);
        source.init().await.unwrap();
        assert!(source.read_batch(5).await.unwrap().is_none());
    }
}
