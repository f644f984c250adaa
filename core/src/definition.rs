//! Static description of a component: what it is called, how it can be
//! wired, and which runtime implements it.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorTopology {
    /// Consumes records (an output component).
    Incoming,
    /// Produces records (an input component).
    Outgoing,
    /// Consumes records and emits flow/reject records.
    IncomingAndOutgoing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeInfo {
    /// Key of the registered runtime factory.
    pub runtime_name: &'static str,
    pub topology: ConnectorTopology,
}

pub trait ComponentDefinition: Send + Sync {
    fn name(&self) -> &'static str;

    fn family(&self) -> &'static [&'static str];

    fn image_path(&self) -> &'static str;

    fn supported_topologies(&self) -> &'static [ConnectorTopology];

    fn runtime_name(&self) -> &'static str;

    /// JSON schema of the component properties.
    fn properties_schema(&self) -> serde_json::Value;

    fn runtime_info(&self, topology: ConnectorTopology) -> Result<RuntimeInfo> {
        if !self.supported_topologies().contains(&topology) {
            return Err(Error::Config(format!(
                "Component {} does not support topology {:?}",
                self.name(),
                topology
            )));
        }
        Ok(RuntimeInfo {
            runtime_name: self.runtime_name(),
            topology,
        })
    }

    fn describe(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name(),
            "family": self.family(),
            "image_path": self.image_path(),
            "topologies": self.supported_topologies(),
            "runtime": self.runtime_name(),
            "properties": self.properties_schema(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy;

    impl ComponentDefinition for Dummy {
        fn name(&self) -> &'static str {
            "DummyOutput"
        }
        fn family(&self) -> &'static [&'static str] {
            &["Misc"]
        }
        fn image_path(&self) -> &'static str {
            "DummyOutput_icon32.png"
        }
        fn supported_topologies(&self) -> &'static [ConnectorTopology] {
            &[ConnectorTopology::Incoming]
        }
        fn runtime_name(&self) -> &'static str {
            "DummySink"
        }
        fn properties_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
    }

    #[test]
    fn test_runtime_info_checks_topology() {
        let info = Dummy.runtime_info(ConnectorTopology::Incoming).unwrap();
        assert_eq!(info.runtime_name, "DummySink");
        assert!(Dummy.runtime_info(ConnectorTopology::Outgoing).is_err());
    }

    #[test]
    fn test_describe() {
        let described = Dummy.describe();
        assert_eq!(described["topologies"], serde_json::json!(["incoming"]));
        assert_eq!(described["runtime"], "DummySink");
    }
}
