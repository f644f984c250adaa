use crate::config::{INPUT_PROPERTIES, OUTPUT_PROPERTIES};
use compkit_core::{ComponentDefinition, ConnectorTopology};

pub struct AzureDlsGen2BlobInputDefinition;

impl AzureDlsGen2BlobInputDefinition {
    pub const NAME: &'static str = "AzureDlsGen2BlobInput";
}

impl ComponentDefinition for AzureDlsGen2BlobInputDefinition {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn family(&self) -> &'static [&'static str] {
        &["Cloud/Azure Data Lake Storage Gen2"]
    }

    fn image_path(&self) -> &'static str {
        "AzureDlsGen2BlobInput_icon32.png"
    }

    fn supported_topologies(&self) -> &'static [ConnectorTopology] {
        &[ConnectorTopology::Outgoing]
    }

    fn runtime_name(&self) -> &'static str {
        "AzureDlsGen2BlobSource"
    }

    fn properties_schema(&self) -> serde_json::Value {
        INPUT_PROPERTIES.clone()
    }
}

pub struct AzureDlsGen2BlobOutputDefinition;

impl AzureDlsGen2BlobOutputDefinition {
    pub const NAME: &'static str = "AzureDlsGen2BlobOutput";
}

impl ComponentDefinition for AzureDlsGen2BlobOutputDefinition {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn family(&self) -> &'static [&'static str] {
        &["Cloud/Azure Data Lake Storage Gen2"]
    }

    fn image_path(&self) -> &'static str {
        "AzureDlsGen2BlobOutput_icon32.png"
    }

    fn supported_topologies(&self) -> &'static [ConnectorTopology] {
        &[ConnectorTopology::Incoming]
    }

    fn runtime_name(&self) -> &'static str {
        "AzureDlsGen2BlobSink"
    }

    fn properties_schema(&self) -> serde_json::Value {
        OUTPUT_PROPERTIES.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compkit_core::{ConnectorConfig, PluginManager};

    #[test]
    fn test_input_definition() {
        let definition = AzureDlsGen2BlobInputDefinition;
        assert_eq!(definition.image_path(), "AzureDlsGen2BlobInput_icon32.png");
        let info = definition.runtime_info(ConnectorTopology::Outgoing).unwrap();
        assert_eq!(info.runtime_name, "AzureDlsGen2BlobSource");
        assert!(definition.runtime_info(ConnectorTopology::Incoming).is_err());
    }

    #[test]
    fn test_runtime_resolves_to_registered_factory() {
        let mut plugins = PluginManager::new();
        crate::register(&mut plugins);

        let config = ConnectorConfig {
            name: "blob_in".to_string(),
            connector_type: AzureDlsGen2BlobInputDefinition::NAME.to_string(),
            properties: serde_json::from_value(serde_json::json!({
                "connection": {"account_name": "talendstore", "account_key": "a2V5"},
                "dataset": {
                    "container": "landing",
                    "schema": {"name": "x", "fields": []}
                }
            }))
            .unwrap(),
        };
        assert!(plugins.create_source(config).is_ok());
        assert!(plugins
            .definition(AzureDlsGen2BlobOutputDefinition::NAME)
            .is_some());
    }
}
