mod registry;

pub use registry::{PluginRegistry, SinkFactory, SourceFactory};

use crate::{
    connector::{ConnectorConfig, Sink, Source},
    definition::{ComponentDefinition, ConnectorTopology},
    error::{Error, Result},
};
use std::sync::Arc;
use tracing::debug;

/// Explicit component registration: each connector crate exposes a
/// `register` function that adds its definitions and runtime factories.
#[derive(Default)]
pub struct PluginManager {
    registry: PluginRegistry,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_source<D, F>(&mut self, definition: D, factory: F)
    where
        D: ComponentDefinition + 'static,
        F: Fn(ConnectorConfig) -> Result<Box<dyn Source>> + Send + Sync + 'static,
    {
        debug!(component = definition.name(), "Registering source component");
        self.registry
            .register_source(definition.runtime_name(), Box::new(factory));
        self.registry.register_definition(Arc::new(definition));
    }

    pub fn register_sink<D, F>(&mut self, definition: D, factory: F)
    where
        D: ComponentDefinition + 'static,
        F: Fn(ConnectorConfig) -> Result<Box<dyn Sink>> + Send + Sync + 'static,
    {
        debug!(component = definition.name(), "Registering sink component");
        self.registry
            .register_sink(definition.runtime_name(), Box::new(factory));
        self.registry.register_definition(Arc::new(definition));
    }

    pub fn definition(&self, name: &str) -> Option<Arc<dyn ComponentDefinition>> {
        self.registry.get_definition(name).cloned()
    }

    pub fn definitions(&self) -> Vec<Arc<dyn ComponentDefinition>> {
        self.registry.definitions().cloned().collect()
    }

    fn lookup(&self, config: &ConnectorConfig) -> Result<&Arc<dyn ComponentDefinition>> {
        self.registry
            .get_definition(&config.connector_type)
            .ok_or_else(|| Error::Config(format!("Unknown component: {}", config.connector_type)))
    }

    pub fn create_source(&self, config: ConnectorConfig) -> Result<Box<dyn Source>> {
        let info = self.lookup(&config)?.runtime_info(ConnectorTopology::Outgoing)?;
        let factory = self
            .registry
            .get_source_factory(info.runtime_name)
            .ok_or_else(|| {
                Error::Config(format!("No source runtime registered as {}", info.runtime_name))
            })?;
        factory(config)
    }

    pub fn create_sink(&self, config: ConnectorConfig) -> Result<Box<dyn Sink>> {
        let definition = self.lookup(&config)?;
        let topology = [
            ConnectorTopology::Incoming,
            ConnectorTopology::IncomingAndOutgoing,
        ]
        .into_iter()
        .find(|t| definition.supported_topologies().contains(t))
        .ok_or_else(|| {
            Error::Config(format!("Component {} cannot consume records", definition.name()))
        })?;
        let info = definition.runtime_info(topology)?;
        let factory = self
            .registry
            .get_sink_factory(info.runtime_name)
            .ok_or_else(|| {
                Error::Config(format!("No sink runtime registered as {}", info.runtime_name))
            })?;
        factory(config)
    }
}
