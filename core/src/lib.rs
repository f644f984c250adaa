pub mod connector;
pub mod definition;
pub mod error;
pub mod format;
pub mod job;
pub mod metrics;
pub mod plugin;
pub mod properties;
pub mod record;
pub mod runtime;
pub mod types;

pub use connector::{ConnectorConfig, Feedback, Sink, Source, WriteResult};
pub use definition::{ComponentDefinition, ConnectorTopology, RuntimeInfo};
pub use error::{Error, Result};
pub use job::SyncJob;
pub use plugin::PluginManager;
pub use record::{DataBatch, Field, FieldType, Record, Schema, Value};
pub use runtime::{PipelineConfig, Runtime};
