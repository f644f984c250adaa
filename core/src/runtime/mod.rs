pub mod context;

use crate::{
    connector::{ConnectorConfig, WriteResult},
    error::Result,
    job::{JobConfig, SyncJob},
    plugin::PluginManager,
};
use context::RuntimeContext;
use serde::Deserialize;
use tracing::info;

/// A source wired to a sink, with optional flow and reject outputs.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_uid")]
    pub uid: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    pub source: ConnectorConfig,
    pub sink: ConnectorConfig,
    #[serde(default)]
    pub flow: Option<ConnectorConfig>,
    #[serde(default)]
    pub reject: Option<ConnectorConfig>,
}

fn default_uid() -> String {
    "job".to_string()
}

fn default_batch_size() -> usize {
    1000
}

pub struct Runtime {
    plugins: PluginManager,
    context: RuntimeContext,
}

impl Runtime {
    pub fn new(plugins: PluginManager) -> Self {
        Self {
            plugins,
            context: RuntimeContext::new(),
        }
    }

    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    pub fn context(&self) -> &RuntimeContext {
        &self.context
    }

    pub async fn run(&self, pipeline: PipelineConfig) -> Result<WriteResult> {
        info!(
            source = %pipeline.source.connector_type,
            sink = %pipeline.sink.connector_type,
            "Building pipeline"
        );
        let source = self.plugins.create_source(pipeline.source)?;
        let sink = self.plugins.create_sink(pipeline.sink)?;

        let mut job = SyncJob::new(source, sink)
            .with_config(JobConfig {
                batch_size: pipeline.batch_size,
                uid: pipeline.uid,
            })
            .with_context(self.context.clone());
        if let Some(flow) = pipeline.flow {
            job = job.with_flow(self.plugins.create_sink(flow)?);
        }
        if let Some(reject) = pipeline.reject {
            job = job.with_reject(self.plugins.create_sink(reject)?);
        }
        job.run().await
    }
}
