use crate::error::{Error, Result};
use jsonschema::Validator;
use serde::{de::DeserializeOwned, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Ok,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub message: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            status: ValidationStatus::Ok,
            message: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            status: ValidationStatus::Warning,
            message: Some(message.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ValidationStatus::Error,
            message: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == ValidationStatus::Error
    }

    pub fn into_result(self, component: &str) -> Result<()> {
        match self.status {
            ValidationStatus::Error => Err(Error::Config(format!(
                "Invalid {} properties: {}",
                component,
                self.message.unwrap_or_default()
            ))),
            _ => Ok(()),
        }
    }
}

/// Checks component properties against their JSON schema.
pub fn check_properties(validator: &Validator, value: &serde_json::Value) -> ValidationResult {
    let errors: Vec<String> = validator
        .iter_errors(value)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{}: {}", path, e)
            }
        })
        .collect();
    if errors.is_empty() {
        ValidationResult::ok()
    } else {
        ValidationResult::error(errors.join("; "))
    }
}

/// Validates then deserialises component properties.
pub fn validate_properties<T: DeserializeOwned>(
    validator: &Validator,
    value: serde_json::Value,
    component: &str,
) -> Result<T> {
    check_properties(validator, &value).into_result(component)?;
    serde_json::from_value(value)
        .map_err(|e| Error::Config(format!("Invalid {} properties: {}", component, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Props {
        path: String,
        #[serde(default)]
        overwrite: bool,
    }

    fn validator() -> Validator {
        Validator::new(&json!({
            "type": "object",
            "required": ["path"],
            "properties": {
                "path": {"type": "string", "minLength": 1},
                "overwrite": {"type": "boolean"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_properties() {
        let props: Props = validate_properties(&validator(), json!({"path": "/tmp/out"}), "Test").unwrap();
        assert_eq!(props.path, "/tmp/out");
        assert!(!props.overwrite);
    }

    #[test]
    fn test_invalid_properties_report_every_error() {
        let result = check_properties(&validator(), &json!({"path": "", "overwrite": "yes"}));
        assert!(result.is_error());
        let message = result.message.unwrap();
        assert!(message.contains("/path"));
        assert!(message.contains("/overwrite"));

        let err = validate_properties::<Props>(&validator(), json!({}), "Test").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
