use crate::config::{INPUT_PROPERTIES, OUTPUT_PROPERTIES};
use compkit_core::{ComponentDefinition, ConnectorTopology};

pub struct FilesystemInputDefinition;

impl FilesystemInputDefinition {
    pub const NAME: &'static str = "FilesystemInput";
}

impl ComponentDefinition for FilesystemInputDefinition {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn family(&self) -> &'static [&'static str] {
        &["File/Input"]
    }

    fn image_path(&self) -> &'static str {
        "FilesystemInput_icon32.png"
    }

    fn supported_topologies(&self) -> &'static [ConnectorTopology] {
        &[ConnectorTopology::Outgoing]
    }

    fn runtime_name(&self) -> &'static str {
        "FilesystemSource"
    }

    fn properties_schema(&self) -> serde_json::Value {
        INPUT_PROPERTIES.clone()
    }
}

/// Output only has a main incoming connector: nothing flows out of it.
pub struct FilesystemOutputDefinition;

impl FilesystemOutputDefinition {
    pub const NAME: &'static str = "FilesystemOutput";
}

impl ComponentDefinition for FilesystemOutputDefinition {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn family(&self) -> &'static [&'static str] {
        &["File/Output"]
    }

    fn image_path(&self) -> &'static str {
        "FilesystemOutput_icon32.png"
    }

    fn supported_topologies(&self) -> &'static [ConnectorTopology] {
        &[ConnectorTopology::Incoming]
    }

    fn runtime_name(&self) -> &'static str {
        "FilesystemSink"
    }

    fn properties_schema(&self) -> serde_json::Value {
        OUTPUT_PROPERTIES.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_has_no_outgoing_connection() {
        let definition = FilesystemOutputDefinition;
        assert!(definition
            .runtime_info(ConnectorTopology::IncomingAndOutgoing)
            .is_err());
        assert_eq!(
            definition
                .runtime_info(ConnectorTopology::Incoming)
                .unwrap()
                .runtime_name,
            "FilesystemSink"
        );
        assert_eq!(
            definition.properties_schema()["properties"]["merge_output"]["type"],
            "boolean"
        );
    }
}
