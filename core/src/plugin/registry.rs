use crate::{
    connector::{ConnectorConfig, Sink, Source},
    definition::ComponentDefinition,
    error::Result,
};
use std::collections::BTreeMap;
use std::sync::Arc;

pub type SourceFactory = Box<dyn Fn(ConnectorConfig) -> Result<Box<dyn Source>> + Send + Sync>;
pub type SinkFactory = Box<dyn Fn(ConnectorConfig) -> Result<Box<dyn Sink>> + Send + Sync>;

#[derive(Default)]
pub struct PluginRegistry {
    definitions: BTreeMap<String, Arc<dyn ComponentDefinition>>,
    sources: BTreeMap<String, SourceFactory>,
    sinks: BTreeMap<String, SinkFactory>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_definition(&mut self, definition: Arc<dyn ComponentDefinition>) {
        self.definitions
            .insert(definition.name().to_string(), definition);
    }

    pub fn register_source(&mut self, runtime_name: &str, factory: SourceFactory) {
        self.sources.insert(runtime_name.to_string(), factory);
    }

    pub fn register_sink(&mut self, runtime_name: &str, factory: SinkFactory) {
        self.sinks.insert(runtime_name.to_string(), factory);
    }

    pub fn get_definition(&self, name: &str) -> Option<&Arc<dyn ComponentDefinition>> {
        self.definitions.get(name)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Arc<dyn ComponentDefinition>> {
        self.definitions.values()
    }

    pub fn get_source_factory(&self, runtime_name: &str) -> Option<&SourceFactory> {
        self.sources.get(runtime_name)
    }

    pub fn get_sink_factory(&self, runtime_name: &str) -> Option<&SinkFactory> {
        self.sinks.get(runtime_name)
    }
}
