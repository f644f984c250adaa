mod config;
mod connection;
mod definition;
mod sink;
mod source;

pub use config::{
    AzureConnectionConfig, AzureDlsGen2BlobDatasetConfig, AzureDlsGen2BlobInputConfig,
    AzureDlsGen2BlobOutputConfig,
};
pub use connection::{
    AzureDlsGen2Connection, AzureDlsGen2ConnectionWithKey, AzureDlsGen2ConnectionWithKeyBuilder,
    AzureDlsGen2ConnectionWithSas,
};
pub use definition::{AzureDlsGen2BlobInputDefinition, AzureDlsGen2BlobOutputDefinition};
pub use sink::AzureDlsGen2BlobSink;
pub use source::AzureDlsGen2BlobSource;

use compkit_core::{PluginManager, Sink, Source};

pub fn register(plugins: &mut PluginManager) {
    plugins.register_source(AzureDlsGen2BlobInputDefinition, |config| {
        Ok(Box::new(AzureDlsGen2BlobSource::new(config)?) as Box<dyn Source>)
    });
    plugins.register_sink(AzureDlsGen2BlobOutputDefinition, |config| {
        Ok(Box::new(AzureDlsGen2BlobSink::new(config)?) as Box<dyn Sink>)
    });
}
