mod config;
mod connection;
mod definition;
mod sink;
mod sobject;
mod writer;

pub use config::{
    OutputAction, SalesforceConnectionConfig, SalesforceOutputConfig, UpsertRelation,
    DEFAULT_API_VERSION, FIELD_ERROR_CODE, FIELD_ERROR_FIELDS, FIELD_ERROR_MESSAGE,
    FIELD_SALESFORCE_ID,
};
pub use connection::{ApiError, PartnerConnection, RestConnection, SaveResult};
pub use definition::SalesforceOutputDefinition;
pub use sink::SalesforceSink;
pub use sobject::{SObject, SObjectField};
pub use writer::SalesforceWriter;

use compkit_core::{PluginManager, Sink};

pub fn register(plugins: &mut PluginManager) {
    plugins.register_sink(SalesforceOutputDefinition, |config| {
        Ok(Box::new(SalesforceSink::new(config)?) as Box<dyn Sink>)
    });
}
