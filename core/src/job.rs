use crate::{
    connector::{Feedback, Sink, Source, WriteResult},
    error::Result,
    metrics::Metrics,
    record::DataBatch,
    runtime::context::RuntimeContext,
};
use tracing::{info, warn};

pub struct JobConfig {
    pub batch_size: usize,
    pub uid: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            uid: "job".to_string(),
        }
    }
}

/// Reads a source to exhaustion and writes it to a sink. Flow and reject
/// records produced by the sink are forwarded to the optional `flow` and
/// `reject` sinks in the order they were emitted.
pub struct SyncJob {
    source: Box<dyn Source>,
    sink: Box<dyn Sink>,
    flow: Option<Box<dyn Sink>>,
    reject: Option<Box<dyn Sink>>,
    config: JobConfig,
    context: RuntimeContext,
}

impl SyncJob {
    pub fn new(source: Box<dyn Source>, sink: Box<dyn Sink>) -> Self {
        Self {
            source,
            sink,
            flow: None,
            reject: None,
            config: JobConfig::default(),
            context: RuntimeContext::new(),
        }
    }

    pub fn with_config(mut self, config: JobConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_context(mut self, context: RuntimeContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_flow(mut self, sink: Box<dyn Sink>) -> Self {
        self.flow = Some(sink);
        self
    }

    pub fn with_reject(mut self, sink: Box<dyn Sink>) -> Self {
        self.reject = Some(sink);
        self
    }

    pub fn metrics(&self) -> &Metrics {
        &self.context.metrics
    }

    pub async fn run(&mut self) -> Result<WriteResult> {
        info!(uid = %self.config.uid, "Starting sync job");
        let metrics = self.context.metrics.clone();
        metrics.start_job().await;

        let result = self.pump().await;
        if result.is_err() {
            metrics.record_error().await;
        }
        metrics.end_job().await;

        let result = result?;
        metrics.print_summary(&result).await;
        info!("Sync job completed");
        Ok(result)
    }

    async fn pump(&mut self) -> Result<WriteResult> {
        let uid = self.config.uid.clone();
        self.source.init().await?;
        self.sink.init(&uid).await?;
        if let Some(flow) = self.flow.as_mut() {
            flow.init(&format!("{}-flow", uid)).await?;
        }
        if let Some(reject) = self.reject.as_mut() {
            reject.init(&format!("{}-reject", uid)).await?;
        }

        while let Some(batch) = self.source.read_batch(self.config.batch_size).await? {
            self.context.metrics.record_read_batch(&batch).await;
            self.sink.write_batch(batch).await?;
            self.context.metrics.record_write_batch().await;

            let feedback = self.sink.drain_feedback();
            self.forward(feedback).await?;

            if self.context.should_shutdown().await {
                warn!("Shutdown requested, stopping before the source is exhausted");
                break;
            }
        }

        let result = self.sink.close().await?;
        let feedback = self.sink.drain_feedback();
        self.forward(feedback).await?;

        if let Some(flow) = self.flow.as_mut() {
            flow.close().await?;
        }
        if let Some(reject) = self.reject.as_mut() {
            reject.close().await?;
        }
        self.source.close().await?;
        Ok(result)
    }

    async fn forward(&mut self, feedback: Feedback) -> Result<()> {
        self.context.metrics.record_feedback(&feedback).await;
        if let Some(flow) = self.flow.as_mut() {
            if !feedback.successful.is_empty() {
                flow.write_batch(DataBatch::new(feedback.successful)).await?;
            }
        }
        if let Some(reject) = self.reject.as_mut() {
            if !feedback.rejected.is_empty() {
                reject.write_batch(DataBatch::new(feedback.rejected)).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Field, FieldType, Record, Schema, Value};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::new("n", vec![Field::new("n", FieldType::Int)]))
    }

    struct CountingSource {
        remaining: Vec<i64>,
    }

    #[async_trait]
    impl Source for CountingSource {
        async fn init(&mut self) -> Result<()> {
            Ok(())
        }
        async fn read_batch(&mut self, batch_size: usize) -> Result<Option<DataBatch>> {
            if self.remaining.is_empty() {
                return Ok(None);
            }
            let take = batch_size.min(self.remaining.len());
            let records = self
                .remaining
                .drain(..take)
                .map(|n| Record::from_values(schema(), vec![Value::Int(n)]))
                .collect::<Result<Vec<_>>>()?;
            Ok(Some(DataBatch::new(records)))
        }
        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
        fn schema(&self) -> Option<Arc<Schema>> {
            Some(schema())
        }
    }

    /// Accepts even numbers and rejects odd ones.
    struct ParitySink {
        feedback: Feedback,
        seen: u64,
    }

    #[async_trait]
    impl Sink for ParitySink {
        async fn init(&mut self, _uid: &str) -> Result<()> {
            Ok(())
        }
        async fn write_batch(&mut self, batch: DataBatch) -> Result<()> {
            for record in batch.records {
                self.seen += 1;
                match record.get(0) {
                    Some(Value::Int(n)) if n % 2 == 0 => self.feedback.successful.push(record),
                    _ => self.feedback.rejected.push(record),
                }
            }
            Ok(())
        }
        fn drain_feedback(&mut self) -> Feedback {
            std::mem::take(&mut self.feedback)
        }
        async fn close(&mut self) -> Result<WriteResult> {
            Ok(WriteResult::new("parity", self.seen, 0, 0))
        }
    }

    #[derive(Clone, Default)]
    struct CollectSink {
        records: Arc<Mutex<Vec<Record>>>,
    }

    #[async_trait]
    impl Sink for CollectSink {
        async fn init(&mut self, _uid: &str) -> Result<()> {
            Ok(())
        }
        async fn write_batch(&mut self, batch: DataBatch) -> Result<()> {
            self.records.lock().unwrap().extend(batch.records);
            Ok(())
        }
        async fn close(&mut self) -> Result<WriteResult> {
            let n = self.records.lock().unwrap().len() as u64;
            Ok(WriteResult::new("collect", n, n, 0))
        }
    }

    #[tokio::test]
    async fn test_feedback_is_routed_to_flow_and_reject() {
        let flow = CollectSink::default();
        let reject = CollectSink::default();
        let mut job = SyncJob::new(
            Box::new(CountingSource {
                remaining: (1..=5).collect(),
            }),
            Box::new(ParitySink {
                feedback: Feedback::default(),
                seen: 0,
            }),
        )
        .with_config(JobConfig {
            batch_size: 2,
            uid: "t".to_string(),
        })
        .with_flow(Box::new(flow.clone()))
        .with_reject(Box::new(reject.clone()));

        let result = job.run().await.unwrap();
        assert_eq!(result.data_count, 5);
        assert_eq!(flow.records.lock().unwrap().len(), 2);
        let rejected: Vec<Value> = reject
            .records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.get(0).cloned().unwrap())
            .collect();
        assert_eq!(rejected, vec![Value::Int(1), Value::Int(3), Value::Int(5)]);

        let snapshot = job.metrics().snapshot().await;
        assert_eq!(snapshot.records_read, 5);
        assert_eq!(snapshot.batches_written, 3);
        assert_eq!(snapshot.records_rejected, 3);
    }

    #[tokio::test]
    async fn test_shutdown_stops_after_current_batch() {
        let context = RuntimeContext::new();
        context.request_shutdown().await;
        let mut job = SyncJob::new(
            Box::new(CountingSource {
                remaining: (1..=10).collect(),
            }),
            Box::new(ParitySink {
                feedback: Feedback::default(),
                seen: 0,
            }),
        )
        .with_config(JobConfig {
            batch_size: 3,
            uid: "t".to_string(),
        })
        .with_context(context);

        let result = job.run().await.unwrap();
        assert_eq!(result.data_count, 3);
    }
}
