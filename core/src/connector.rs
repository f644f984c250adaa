use crate::{
    record::{DataBatch, Record, Schema},
    Result,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait Source: Send {
    async fn init(&mut self) -> Result<()>;
    async fn read_batch(&mut self, batch_size: usize) -> Result<Option<DataBatch>>;
    async fn close(&mut self) -> Result<()>;
    fn schema(&self) -> Option<Arc<Schema>>;
}

#[async_trait]
pub trait Sink: Send {
    /// Opens the sink. `uid` identifies this writer in the returned
    /// [`WriteResult`] and in the names of the artifacts it produces.
    async fn init(&mut self, uid: &str) -> Result<()>;
    async fn write_batch(&mut self, batch: DataBatch) -> Result<()>;
    /// Takes the flow and reject records produced since the last call.
    fn drain_feedback(&mut self) -> Feedback {
        Feedback::default()
    }
    async fn close(&mut self) -> Result<WriteResult>;
}

#[derive(Debug, Clone, Default)]
pub struct Feedback {
    pub successful: Vec<Record>,
    pub rejected: Vec<Record>,
}

impl Feedback {
    pub fn is_empty(&self) -> bool {
        self.successful.is_empty() && self.rejected.is_empty()
    }

    pub fn extend(&mut self, other: Feedback) {
        self.successful.extend(other.successful);
        self.rejected.extend(other.rejected);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    pub uid: String,
    pub data_count: u64,
    pub success_count: u64,
    pub reject_count: u64,
}

impl WriteResult {
    pub fn new(uid: impl Into<String>, data_count: u64, success_count: u64, reject_count: u64) -> Self {
        Self {
            uid: uid.into(),
            data_count,
            success_count,
            reject_count,
        }
    }

    /// Folds the counters of several writers into one result.
    pub fn merge(results: impl IntoIterator<Item = WriteResult>) -> WriteResult {
        let mut total = WriteResult::default();
        for result in results {
            if total.uid.is_empty() {
                total.uid = result.uid;
            }
            total.data_count += result.data_count;
            total.success_count += result.success_count;
            total.reject_count += result.reject_count;
        }
        total
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    pub name: String,
    pub connector_type: String,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

impl ConnectorConfig {
    pub fn properties_json(&self) -> serde_json::Value {
        serde_json::Value::Object(serde_json::Map::from_iter(
            self.properties
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        ))
    }
}
