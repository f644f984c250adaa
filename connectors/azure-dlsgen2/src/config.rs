use crate::connection::{
    AzureDlsGen2Connection, AzureDlsGen2ConnectionWithKey, AzureDlsGen2ConnectionWithSas,
};
use compkit_core::{format::FormatOptions, properties::validate_properties, Error, Result, Schema};
use jsonschema::Validator;
use object_store::path::Path as ObjectPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

lazy_static::lazy_static! {
    pub(crate) static ref INPUT_PROPERTIES: Value =
        serde_json::from_str(include_str!("../schema/input.json")).unwrap();
    pub(crate) static ref OUTPUT_PROPERTIES: Value =
        serde_json::from_str(include_str!("../schema/output.json")).unwrap();
    static ref INPUT_SCHEMA: Validator = Validator::new(&INPUT_PROPERTIES).unwrap();
    static ref OUTPUT_SCHEMA: Validator = Validator::new(&OUTPUT_PROPERTIES).unwrap();
}

/// Storage account credentials. Exactly one of `account_key` or
/// `sas_token` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureConnectionConfig {
    #[serde(default = "default_protocol")]
    pub protocol: String,
    pub account_name: String,
    pub account_key: Option<String>,
    pub sas_token: Option<String>,
    /// Overrides the account endpoint, e.g. for a storage emulator.
    pub endpoint: Option<String>,
}

pub(crate) fn default_protocol() -> String {
    "https".to_string()
}

impl AzureConnectionConfig {
    pub fn connection(&self) -> Result<Arc<dyn AzureDlsGen2Connection>> {
        match (&self.account_key, &self.sas_token) {
            (Some(key), None) => {
                let mut builder = AzureDlsGen2ConnectionWithKey::builder()
                    .protocol(&self.protocol)
                    .account_name(&self.account_name)
                    .account_key(key);
                if let Some(endpoint) = &self.endpoint {
                    builder = builder.endpoint(endpoint);
                }
                Ok(Arc::new(builder.build()?))
            }
            (None, Some(token)) => {
                let mut connection = AzureDlsGen2ConnectionWithSas::new(&self.account_name, token)
                    .with_protocol(&self.protocol)?;
                if let Some(endpoint) = &self.endpoint {
                    connection = connection.with_endpoint(endpoint);
                }
                Ok(Arc::new(connection))
            }
            _ => Err(Error::Config(
                "Azure connection needs either account_key or sas_token".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureDlsGen2BlobDatasetConfig {
    pub container: String,
    /// Virtual directory inside the container.
    #[serde(default)]
    pub blob_path: String,
    #[serde(flatten)]
    pub format: FormatOptions,
    pub schema: Schema,
}

impl AzureDlsGen2BlobDatasetConfig {
    pub fn schema(&self) -> Arc<Schema> {
        Arc::new(self.schema.clone())
    }

    pub fn prefix(&self) -> Option<ObjectPath> {
        let trimmed = self.blob_path.trim_matches('/');
        (!trimmed.is_empty()).then(|| ObjectPath::from(trimmed))
    }

    /// Name of the `index`-th blob uploaded by writer `uid`.
    pub fn blob_name(&self, uid: &str, index: usize) -> ObjectPath {
        let file = format!("{}-{:05}.{}", uid, index, self.format.format.extension());
        match self.prefix() {
            Some(prefix) => prefix.child(file),
            None => ObjectPath::from(file),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureDlsGen2BlobInputConfig {
    pub connection: AzureConnectionConfig,
    pub dataset: AzureDlsGen2BlobDatasetConfig,
}

impl AzureDlsGen2BlobInputConfig {
    pub fn from_json(value: Value) -> Result<Self> {
        validate_properties(&INPUT_SCHEMA, value, "AzureDlsGen2BlobInput")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureDlsGen2BlobOutputConfig {
    pub connection: AzureConnectionConfig,
    pub dataset: AzureDlsGen2BlobDatasetConfig,
    #[serde(default = "default_max_records_per_blob")]
    pub max_records_per_blob: usize,
}

fn default_max_records_per_blob() -> usize {
    10_000
}

impl AzureDlsGen2BlobOutputConfig {
    pub fn from_json(value: Value) -> Result<Self> {
        validate_properties(&OUTPUT_SCHEMA, value, "AzureDlsGen2BlobOutput")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dataset() -> Value {
        json!({
            "container": "landing",
            "blob_path": "/accounts/daily/",
            "format": "csv",
            "schema": {"name": "account", "fields": [{"name": "Name", "type": "string"}]}
        })
    }

    #[test]
    fn test_output_defaults_and_blob_names() {
        let config = AzureDlsGen2BlobOutputConfig::from_json(json!({
            "connection": {"account_name": "talendstore", "account_key": "a2V5"},
            "dataset": dataset()
        }))
        .unwrap();
        assert_eq!(config.max_records_per_blob, 10_000);
        assert_eq!(config.connection.protocol, "https");
        assert_eq!(
            config.dataset.blob_name("w1", 3).as_ref(),
            "accounts/daily/w1-00003.csv"
        );
    }

    #[test]
    fn test_blob_name_without_directory() {
        let mut config = AzureDlsGen2BlobInputConfig::from_json(json!({
            "connection": {"account_name": "talendstore", "sas_token": "sv=2022&sig=x"},
            "dataset": dataset()
        }))
        .unwrap();
        config.dataset.blob_path = String::new();
        assert!(config.dataset.prefix().is_none());
        assert_eq!(config.dataset.blob_name("w1", 0).as_ref(), "w1-00000.csv");
    }

    #[test]
    fn test_sas_connection_keeps_protocol_and_endpoint() {
        let config = AzureDlsGen2BlobInputConfig::from_json(json!({
            "connection": {
                "account_name": "devstoreaccount1",
                "sas_token": "sv=2022&sig=x",
                "protocol": "http",
                "endpoint": "http://127.0.0.1:10000/devstoreaccount1"
            },
            "dataset": dataset()
        }))
        .unwrap();
        let connection = config.connection.connection().unwrap();
        assert_eq!(connection.endpoint(), "http://127.0.0.1:10000/devstoreaccount1");

        let mut connection_config = config.connection.clone();
        connection_config.endpoint = None;
        assert_eq!(
            connection_config.connection().unwrap().endpoint(),
            "http://devstoreaccount1.blob.core.windows.net"
        );
    }

    #[test]
    fn test_credentials_are_exclusive() {
        let both = json!({
            "connection": {"account_name": "talendstore", "account_key": "k", "sas_token": "s"},
            "dataset": dataset()
        });
        assert!(AzureDlsGen2BlobInputConfig::from_json(both).is_err());

        let neither = json!({
            "connection": {"account_name": "talendstore"},
            "dataset": dataset()
        });
        assert!(AzureDlsGen2BlobInputConfig::from_json(neither).is_err());

        let bad_account = json!({
            "connection": {"account_name": "Not_Valid", "account_key": "k"},
            "dataset": dataset()
        });
        assert!(AzureDlsGen2BlobInputConfig::from_json(bad_account).is_err());
    }
}
