use crate::config::OUTPUT_PROPERTIES;
use compkit_core::{ComponentDefinition, ConnectorTopology};

/// `tSalesforceOutput`: writes records to a module and can emit the
/// written and rejected records downstream.
pub struct SalesforceOutputDefinition;

impl SalesforceOutputDefinition {
    pub const NAME: &'static str = "tSalesforceOutput";
}

impl ComponentDefinition for SalesforceOutputDefinition {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn family(&self) -> &'static [&'static str] {
        &["Business/Salesforce", "Cloud/Salesforce"]
    }

    fn image_path(&self) -> &'static str {
        "tSalesforceOutput_icon32.png"
    }

    fn supported_topologies(&self) -> &'static [ConnectorTopology] {
        &[
            ConnectorTopology::Incoming,
            ConnectorTopology::IncomingAndOutgoing,
        ]
    }

    fn runtime_name(&self) -> &'static str {
        "SalesforceSink"
    }

    fn properties_schema(&self) -> serde_json::Value {
        OUTPUT_PROPERTIES.clone()
    }
}
