use crate::metrics::Metrics;
use std::sync::Arc;
use tokio::sync::Mutex;

/// State shared between a running job and whoever controls it.
#[derive(Clone, Default)]
pub struct RuntimeContext {
    pub metrics: Metrics,
    pub shutdown: Arc<Mutex<bool>>,
}

impl RuntimeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn request_shutdown(&self) {
        let mut shutdown = self.shutdown.lock().await;
        *shutdown = true;
    }

    pub async fn should_shutdown(&self) -> bool {
        *self.shutdown.lock().await
    }
}
