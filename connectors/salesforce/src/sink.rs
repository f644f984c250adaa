use crate::config::SalesforceOutputConfig;
use crate::connection::PartnerConnection;
use crate::writer::SalesforceWriter;
use async_trait::async_trait;
use compkit_core::{
    connector::{ConnectorConfig, Feedback, Sink, WriteResult},
    DataBatch, Result,
};
use std::sync::Arc;

/// Feeds batches to a [`SalesforceWriter`] record by record and keeps the
/// flow and reject records until the job drains them.
pub struct SalesforceSink {
    writer: SalesforceWriter,
    feedback: Feedback,
}

impl SalesforceSink {
    pub fn new(config: ConnectorConfig) -> Result<Self> {
        Ok(Self::with_config(SalesforceOutputConfig::from_json(
            config.properties_json(),
        )?))
    }

    pub fn with_config(config: SalesforceOutputConfig) -> Self {
        Self {
            writer: SalesforceWriter::new(config),
            feedback: Feedback::default(),
        }
    }

    pub fn with_connection(mut self, connection: Arc<dyn PartnerConnection>) -> Self {
        self.writer = self.writer.with_connection(connection);
        self
    }
}

#[async_trait]
impl Sink for SalesforceSink {
    async fn init(&mut self, uid: &str) -> Result<()> {
        self.writer.open(uid).await
    }

    async fn write_batch(&mut self, batch: DataBatch) -> Result<()> {
        for record in batch.records {
            self.writer.write(Some(record)).await?;
            self.feedback.extend(self.writer.take_feedback());
        }
        Ok(())
    }

    fn drain_feedback(&mut self) -> Feedback {
        std::mem::take(&mut self.feedback)
    }

    async fn close(&mut self) -> Result<WriteResult> {
        let result = self.writer.close().await?;
        self.feedback.extend(self.writer.take_feedback());
        Ok(result)
    }
}
