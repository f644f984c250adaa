use crate::connector::{Feedback, WriteResult};
use crate::record::DataBatch;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Clone, Default)]
pub struct Metrics {
    inner: Arc<Mutex<MetricsInner>>,
}

#[derive(Default)]
struct MetricsInner {
    start_time: Option<Instant>,
    end_time: Option<Instant>,
    records_read: u64,
    batches_written: u64,
    records_succeeded: u64,
    records_rejected: u64,
    errors: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_read: u64,
    pub batches_written: u64,
    pub records_succeeded: u64,
    pub records_rejected: u64,
    pub errors: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn start_job(&self) {
        let mut inner = self.inner.lock().await;
        inner.start_time = Some(Instant::now());
        info!("Job started");
    }

    pub async fn end_job(&self) {
        let mut inner = self.inner.lock().await;
        inner.end_time = Some(Instant::now());
        info!("Job ended");
    }

    pub async fn record_read_batch(&self, batch: &DataBatch) {
        let mut inner = self.inner.lock().await;
        inner.records_read += batch.len() as u64;
        debug!(records = batch.len(), "Batch read");
    }

    pub async fn record_write_batch(&self) {
        let mut inner = self.inner.lock().await;
        inner.batches_written += 1;
        debug!(batches = inner.batches_written, "Batch written");
    }

    pub async fn record_feedback(&self, feedback: &Feedback) {
        let mut inner = self.inner.lock().await;
        inner.records_succeeded += feedback.successful.len() as u64;
        inner.records_rejected += feedback.rejected.len() as u64;
        if !feedback.rejected.is_empty() {
            warn!(rejected = feedback.rejected.len(), "Records rejected");
        }
    }

    pub async fn record_error(&self) {
        let mut inner = self.inner.lock().await;
        inner.errors += 1;
        warn!(errors = inner.errors, "Error occurred");
    }

    pub async fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.lock().await;
        MetricsSnapshot {
            records_read: inner.records_read,
            batches_written: inner.batches_written,
            records_succeeded: inner.records_succeeded,
            records_rejected: inner.records_rejected,
            errors: inner.errors,
        }
    }

    pub async fn print_summary(&self, result: &WriteResult) {
        let inner = self.inner.lock().await;
        let duration = match (inner.start_time, inner.end_time) {
            (Some(start), Some(end)) => end.duration_since(start),
            _ => Duration::ZERO,
        };
        let secs = duration.as_secs_f64();
        let throughput = if secs > 0.0 {
            inner.records_read as f64 / secs
        } else {
            0.0
        };

        info!(
            duration = ?duration,
            records_read = inner.records_read,
            batches_written = inner.batches_written,
            data_count = result.data_count,
            success_count = result.success_count,
            reject_count = result.reject_count,
            errors = inner.errors,
            throughput,
            "Job Summary"
        );
    }
}
