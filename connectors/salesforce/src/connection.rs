use crate::config::SalesforceConnectionConfig;
use crate::sobject::SObject;
use async_trait::async_trait;
use compkit_core::{Error, Field, FieldType, Result, Schema};
use reqwest::{Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

const TOKEN_PATH: &str = "/services/oauth2/token";

pub const DATETIME_PATTERN: &str = "yyyy-MM-dd'T'HH:mm:ss'.000Z'";
pub const DATE_PATTERN: &str = "yyyy-MM-dd";
pub const TIME_PATTERN: &str = "HH:mm:ss.SSS'Z'";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(rename = "statusCode")]
    pub status_code: String,
    pub message: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Outcome of one object in a create, update, upsert or delete call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveResult {
    pub id: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub created: bool,
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

impl SaveResult {
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            success: true,
            created: false,
            errors: Vec::new(),
        }
    }

    pub fn failed(error: ApiError) -> Self {
        Self {
            id: None,
            success: false,
            created: false,
            errors: vec![error],
        }
    }
}

/// The calls the writer needs from the API. Results come back in the
/// order of the objects sent.
#[async_trait]
pub trait PartnerConnection: Send + Sync {
    async fn create(&self, objects: &[SObject]) -> Result<Vec<SaveResult>>;

    async fn update(&self, objects: &[SObject]) -> Result<Vec<SaveResult>>;

    async fn upsert(&self, external_id_field: &str, objects: &[SObject]) -> Result<Vec<SaveResult>>;

    async fn delete(&self, ids: &[String]) -> Result<Vec<SaveResult>>;

    /// Schema of a module, with date patterns on temporal fields.
    async fn describe(&self, module: &str) -> Result<Schema>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    instance_url: String,
}

#[derive(Debug, Deserialize)]
struct DescribeResult {
    name: String,
    fields: Vec<DescribeField>,
}

#[derive(Debug, Deserialize)]
struct DescribeField {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    #[serde(default)]
    nillable: bool,
}

fn transport_error(e: reqwest::Error) -> Error {
    Error::Connection(format!("Salesforce request failed: {}", e))
}

/// Partner calls over the REST sObject Collections API.
#[derive(Debug, Clone)]
pub struct RestConnection {
    http: reqwest::Client,
    instance_url: String,
    api_version: String,
    access_token: String,
}

impl RestConnection {
    pub fn new(
        instance_url: impl Into<String>,
        access_token: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            instance_url: instance_url.into().trim_end_matches('/').to_string(),
            api_version: api_version.into(),
            access_token: access_token.into(),
        }
    }

    /// Reuses the configured session, or logs in with the username-password
    /// flow.
    pub async fn connect(config: &SalesforceConnectionConfig) -> Result<Self> {
        if let (Some(instance_url), Some(access_token)) =
            (&config.instance_url, &config.access_token)
        {
            info!(%instance_url, "Using existing Salesforce session");
            return Ok(Self::new(instance_url, access_token, &config.api_version));
        }

        let (Some(client_id), Some(username), Some(password)) =
            (&config.client_id, &config.username, &config.password)
        else {
            return Err(Error::Config(
                "Salesforce login needs client_id, username and password".into(),
            ));
        };

        let url = format!("{}{}", config.login_url.trim_end_matches('/'), TOKEN_PATH);
        let password = format!("{}{}", password, config.security_token);
        let mut form = vec![
            ("grant_type", "password"),
            ("client_id", client_id.as_str()),
            ("username", username.as_str()),
            ("password", password.as_str()),
        ];
        if let Some(secret) = &config.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let response = reqwest::Client::new()
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Connection(format!(
                "Salesforce login failed ({}): {}",
                status, body
            )));
        }
        let token: TokenResponse = response.json().await.map_err(transport_error)?;
        info!(instance_url = %token.instance_url, "Logged in to Salesforce");
        Ok(Self::new(token.instance_url, token.access_token, &config.api_version))
    }

    pub fn base_url(&self) -> String {
        format!("{}/services/data/v{}", self.instance_url, self.api_version)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url(), path))
            .bearer_auth(&self.access_token)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Connection(format!(
                "Salesforce API error ({}): {}",
                status, body
            )));
        }
        response.json().await.map_err(transport_error)
    }

    async fn save(&self, method: Method, path: &str, objects: &[SObject]) -> Result<Vec<SaveResult>> {
        let records: Vec<serde_json::Value> = objects.iter().map(SObject::to_json).collect();
        debug!(records = records.len(), %method, path, "Sending sObject collection");
        self.send(
            self.request(method, path)
                .json(&json!({ "allOrNone": false, "records": records })),
        )
        .await
    }
}

#[async_trait]
impl PartnerConnection for RestConnection {
    async fn create(&self, objects: &[SObject]) -> Result<Vec<SaveResult>> {
        self.save(Method::POST, "/composite/sobjects", objects).await
    }

    async fn update(&self, objects: &[SObject]) -> Result<Vec<SaveResult>> {
        self.save(Method::PATCH, "/composite/sobjects", objects).await
    }

    async fn upsert(&self, external_id_field: &str, objects: &[SObject]) -> Result<Vec<SaveResult>> {
        let Some(first) = objects.first() else {
            return Ok(Vec::new());
        };
        let path = format!(
            "/composite/sobjects/{}/{}",
            first.object_type(),
            external_id_field
        );
        self.save(Method::PATCH, &path, objects).await
    }

    async fn delete(&self, ids: &[String]) -> Result<Vec<SaveResult>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = ids.join(",");
        self.send(
            self.request(Method::DELETE, "/composite/sobjects")
                .query(&[("ids", ids.as_str()), ("allOrNone", "false")]),
        )
        .await
    }

    async fn describe(&self, module: &str) -> Result<Schema> {
        let result: DescribeResult = self
            .send(self.request(Method::GET, &format!("/sobjects/{}/describe", module)))
            .await?;
        Ok(schema_from_describe(result))
    }
}

fn schema_from_describe(result: DescribeResult) -> Schema {
    let fields = result
        .fields
        .into_iter()
        .map(|f| {
            let mut field = match f.field_type.as_str() {
                "boolean" => Field::new(f.name, FieldType::Boolean),
                "int" => Field::new(f.name, FieldType::Int),
                "double" | "currency" | "percent" => Field::new(f.name, FieldType::Double),
                "date" => Field::new(f.name, FieldType::Date).with_pattern(DATE_PATTERN),
                "datetime" => Field::new(f.name, FieldType::Date).with_pattern(DATETIME_PATTERN),
                "time" => Field::new(f.name, FieldType::String).with_pattern(TIME_PATTERN),
                "base64" => Field::new(f.name, FieldType::Bytes),
                _ => Field::new(f.name, FieldType::String),
            };
            field.nullable = f.nillable;
            field
        })
        .collect();
    Schema::new(result.name, fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url() {
        let connection = RestConnection::new("https://acme.my.salesforce.com/", "tok", "65.0");
        assert_eq!(
            connection.base_url(),
            "https://acme.my.salesforce.com/services/data/v65.0"
        );
    }

    #[test]
    fn test_describe_maps_field_types() {
        let result: DescribeResult = serde_json::from_value(json!({
            "name": "Contact",
            "fields": [
                {"name": "Id", "type": "id", "nillable": false},
                {"name": "Birthdate", "type": "date", "nillable": true},
                {"name": "LastSeen__c", "type": "datetime", "nillable": true},
                {"name": "Wake__c", "type": "time", "nillable": true},
                {"name": "Score__c", "type": "percent", "nillable": true},
                {"name": "DoNotCall", "type": "boolean", "nillable": false}
            ]
        }))
        .unwrap();
        let schema = schema_from_describe(result);

        assert_eq!(schema.name, "Contact");
        assert!(!schema.field("Id").unwrap().nullable);
        assert_eq!(
            schema.field("Birthdate").unwrap().pattern.as_deref(),
            Some(DATE_PATTERN)
        );
        assert_eq!(
            schema.field("LastSeen__c").unwrap().pattern.as_deref(),
            Some(DATETIME_PATTERN)
        );
        assert_eq!(schema.field("Wake__c").unwrap().field_type, FieldType::String);
        assert_eq!(schema.field("Score__c").unwrap().field_type, FieldType::Double);
        assert_eq!(schema.field("DoNotCall").unwrap().field_type, FieldType::Boolean);
    }

    #[test]
    fn test_save_result_decoding() {
        let results: Vec<SaveResult> = serde_json::from_value(json!([
            {"id": "003A", "success": true, "errors": []},
            {"success": false, "errors": [
                {"statusCode": "REQUIRED_FIELD_MISSING", "message": "Required fields are missing: [LastName]", "fields": ["LastName"]}
            ]}
        ]))
        .unwrap();
        assert_eq!(results[0], SaveResult::ok("003A"));
        assert_eq!(results[1].errors[0].status_code, "REQUIRED_FIELD_MISSING");
        assert_eq!(results[1].errors[0].fields, vec!["LastName"]);
    }
}
