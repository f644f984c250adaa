mod config;
mod definition;
mod sink;
mod source;

pub use config::{FilesystemDatasetConfig, FilesystemInputConfig, FilesystemOutputConfig};
pub use definition::{FilesystemInputDefinition, FilesystemOutputDefinition};
pub use sink::FilesystemSink;
pub use source::FilesystemSource;

use compkit_core::{PluginManager, Sink, Source};

pub fn register(plugins: &mut PluginManager) {
    plugins.register_source(FilesystemInputDefinition, |config| {
        Ok(Box::new(FilesystemSource::new(config)?) as Box<dyn Source>)
    });
    plugins.register_sink(FilesystemOutputDefinition, |config| {
        Ok(Box::new(FilesystemSink::new(config)?) as Box<dyn Sink>)
    });
}
