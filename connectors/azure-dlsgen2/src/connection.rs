use compkit_core::{Error, Result};
use object_store::azure::MicrosoftAzureBuilder;
use object_store::ObjectStore;
use std::sync::Arc;
use tracing::debug;

/// Hands out a blob store scoped to one container of a storage account.
pub trait AzureDlsGen2Connection: Send + Sync {
    fn account_name(&self) -> &str;

    /// Blob service URL: the override when set, else
    /// `{protocol}://{account}.blob.core.windows.net`.
    fn endpoint(&self) -> String;

    fn blob_store(&self, container: &str) -> Result<Arc<dyn ObjectStore>>;
}

fn account_endpoint(protocol: &str, account_name: &str, endpoint: Option<&str>) -> String {
    match endpoint {
        Some(endpoint) => endpoint.to_string(),
        None => format!("{}://{}.blob.core.windows.net", protocol, account_name),
    }
}

fn check_protocol(protocol: &str) -> Result<()> {
    if protocol != "https" && protocol != "http" {
        return Err(Error::Config(format!("Unsupported protocol: {}", protocol)));
    }
    Ok(())
}

fn connection_error(e: object_store::Error) -> Error {
    Error::Connection(format!("Failed to create Azure Blob client: {}", e))
}

/// Shared key authentication.
#[derive(Debug, Clone)]
pub struct AzureDlsGen2ConnectionWithKey {
    protocol: String,
    account_name: String,
    account_key: String,
    endpoint: Option<String>,
}

impl AzureDlsGen2ConnectionWithKey {
    pub fn builder() -> AzureDlsGen2ConnectionWithKeyBuilder {
        AzureDlsGen2ConnectionWithKeyBuilder::default()
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn account_key(&self) -> &str {
        &self.account_key
    }
}

impl AzureDlsGen2Connection for AzureDlsGen2ConnectionWithKey {
    fn account_name(&self) -> &str {
        &self.account_name
    }

    fn endpoint(&self) -> String {
        account_endpoint(&self.protocol, &self.account_name, self.endpoint.as_deref())
    }

    fn blob_store(&self, container: &str) -> Result<Arc<dyn ObjectStore>> {
        let endpoint = self.endpoint();
        debug!(%endpoint, container, "Connecting to Azure Blob storage");
        let store = MicrosoftAzureBuilder::new()
            .with_account(&self.account_name)
            .with_access_key(&self.account_key)
            .with_container_name(container)
            .with_endpoint(endpoint)
            .with_allow_http(self.protocol == "http")
            .build()
            .map_err(connection_error)?;
        Ok(Arc::new(store))
    }
}

#[derive(Debug, Default)]
pub struct AzureDlsGen2ConnectionWithKeyBuilder {
    protocol: Option<String>,
    account_name: Option<String>,
    account_key: Option<String>,
    endpoint: Option<String>,
}

impl AzureDlsGen2ConnectionWithKeyBuilder {
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn account_name(mut self, account_name: impl Into<String>) -> Self {
        self.account_name = Some(account_name.into());
        self
    }

    pub fn account_key(mut self, account_key: impl Into<String>) -> Self {
        self.account_key = Some(account_key.into());
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn build(self) -> Result<AzureDlsGen2ConnectionWithKey> {
        let protocol = self.protocol.unwrap_or_else(crate::config::default_protocol);
        check_protocol(&protocol)?;
        let account_name = self
            .account_name
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Config("account_name is required".into()))?;
        let account_key = self
            .account_key
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Config("account_key is required".into()))?;
        Ok(AzureDlsGen2ConnectionWithKey {
            protocol,
            account_name,
            account_key,
            endpoint: self.endpoint,
        })
    }
}

/// Shared access signature authentication.
#[derive(Debug, Clone)]
pub struct AzureDlsGen2ConnectionWithSas {
    protocol: String,
    account_name: String,
    sas_token: String,
    endpoint: Option<String>,
}

impl AzureDlsGen2ConnectionWithSas {
    pub fn new(account_name: impl Into<String>, sas_token: impl Into<String>) -> Self {
        Self {
            protocol: crate::config::default_protocol(),
            account_name: account_name.into(),
            sas_token: sas_token.into(),
            endpoint: None,
        }
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Result<Self> {
        let protocol = protocol.into();
        check_protocol(&protocol)?;
        self.protocol = protocol;
        Ok(self)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Query pairs of the token, with or without its leading `?`.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.sas_token
            .trim_start_matches('?')
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

impl AzureDlsGen2Connection for AzureDlsGen2ConnectionWithSas {
    fn account_name(&self) -> &str {
        &self.account_name
    }

    fn endpoint(&self) -> String {
        account_endpoint(&self.protocol, &self.account_name, self.endpoint.as_deref())
    }

    fn blob_store(&self, container: &str) -> Result<Arc<dyn ObjectStore>> {
        let endpoint = self.endpoint();
        debug!(%endpoint, container, "Connecting to Azure Blob storage with SAS");
        let store = MicrosoftAzureBuilder::new()
            .with_account(&self.account_name)
            .with_container_name(container)
            .with_endpoint(endpoint)
            .with_allow_http(self.protocol == "http")
            .with_sas_authorization(self.query_pairs())
            .build()
            .map_err(connection_error)?;
        Ok(Arc::new(store))
    }
}
