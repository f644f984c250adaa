use compkit_core::{properties::validate_properties, Result, Schema};
use jsonschema::Validator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

lazy_static::lazy_static! {
    pub(crate) static ref OUTPUT_PROPERTIES: Value =
        serde_json::from_str(include_str!("../schema/output.json")).unwrap();
    static ref OUTPUT_SCHEMA: Validator = Validator::new(&OUTPUT_PROPERTIES).unwrap();
}

/// Output column receiving the id of a successfully written object.
pub const FIELD_SALESFORCE_ID: &str = "salesforce_id";
pub const FIELD_ERROR_CODE: &str = "errorCode";
pub const FIELD_ERROR_FIELDS: &str = "errorFields";
pub const FIELD_ERROR_MESSAGE: &str = "errorMessage";

pub const DEFAULT_API_VERSION: &str = "65.0";
pub const DEFAULT_LOGIN_URL: &str = "https://login.salesforce.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesforceConnectionConfig {
    #[serde(default = "default_login_url")]
    pub login_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Existing session: used as is when both are set.
    pub instance_url: Option<String>,
    pub access_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Appended to the password on login.
    #[serde(default)]
    pub security_token: String,
}

fn default_login_url() -> String {
    DEFAULT_LOGIN_URL.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputAction {
    #[default]
    Insert,
    Update,
    Upsert,
    Delete,
}

/// One row of the upsert relation table: writes `column_name` through the
/// `lookup_relationship_field_name` relationship, matching the related
/// object by its external id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertRelation {
    pub column_name: String,
    pub lookup_field_module_name: String,
    #[serde(default)]
    pub lookup_field_name: Option<String>,
    pub lookup_relationship_field_name: String,
    pub lookup_field_external_id_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesforceOutputConfig {
    pub connection: SalesforceConnectionConfig,
    pub module_name: String,
    pub schema: Schema,
    #[serde(default)]
    pub output_action: OutputAction,
    #[serde(default = "default_true")]
    pub extend_insert: bool,
    #[serde(default = "default_commit_level")]
    pub commit_level: usize,
    #[serde(default = "default_true")]
    pub cease_for_error: bool,
    #[serde(default)]
    pub ignore_null: bool,
    #[serde(default)]
    pub upsert_key_column: String,
    #[serde(default)]
    pub upsert_relation_table: Vec<UpsertRelation>,
    #[serde(default)]
    pub use_lookup_field_name: bool,
    pub schema_flow: Option<Schema>,
    pub schema_reject: Option<Schema>,
}

fn default_true() -> bool {
    true
}

fn default_commit_level() -> usize {
    200
}

impl SalesforceOutputConfig {
    pub fn from_json(value: Value) -> Result<Self> {
        validate_properties(&OUTPUT_SCHEMA, value, "tSalesforceOutput")
    }

    /// Records sent per API call.
    pub fn effective_commit_level(&self) -> usize {
        if self.extend_insert {
            self.commit_level.max(1)
        } else {
            1
        }
    }

    /// Relation rows keyed by column name. `lookup_field_name` is only kept
    /// when `use_lookup_field_name` is set.
    pub fn reference_fields(&self) -> HashMap<&str, UpsertRelation> {
        self.upsert_relation_table
            .iter()
            .map(|relation| {
                let mut resolved = relation.clone();
                if !self.use_lookup_field_name {
                    resolved.lookup_field_name = None;
                }
                (relation.column_name.as_str(), resolved)
            })
            .collect()
    }
}
