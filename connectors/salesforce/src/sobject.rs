use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use compkit_core::{Error, Result, Value};
use serde_json::{json, Map};

#[derive(Debug, Clone, PartialEq)]
pub enum SObjectField {
    Value(Value),
    /// Date without time, sent as `yyyy-MM-dd`.
    Date(NaiveDate),
    Time(NaiveTime),
    /// Related object reached through a relationship field.
    Child(SObject),
}

/// Object sent to the API: a type, ordered fields and the fields to clear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SObject {
    object_type: String,
    fields: Vec<(String, SObjectField)>,
    fields_to_null: Vec<String>,
}

impl SObject {
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            ..Default::default()
        }
    }

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    pub fn set_field(&mut self, name: &str, field: SObjectField) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = field,
            None => self.fields.push((name.to_string(), field)),
        }
    }

    pub fn field(&self, name: &str) -> Option<&SObjectField> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &SObjectField)> {
        self.fields.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub fn set_fields_to_null(&mut self, names: Vec<String>) {
        self.fields_to_null = names;
    }

    pub fn fields_to_null(&self) -> &[String] {
        &self.fields_to_null
    }

    pub fn id(&self) -> Option<&str> {
        match self.field("Id") {
            Some(SObjectField::Value(Value::String(id))) => Some(id),
            _ => None,
        }
    }

    /// REST representation: `attributes.type`, the fields, then an explicit
    /// null for every field to clear.
    pub fn to_json(&self) -> serde_json::Value {
        let mut object = Map::new();
        object.insert("attributes".to_string(), json!({ "type": self.object_type }));
        for (name, field) in &self.fields {
            object.insert(name.clone(), field_to_json(field));
        }
        for name in &self.fields_to_null {
            object
                .entry(name.clone())
                .or_insert(serde_json::Value::Null);
        }
        serde_json::Value::Object(object)
    }
}

fn field_to_json(field: &SObjectField) -> serde_json::Value {
    match field {
        SObjectField::Value(Value::Date(dt)) => {
            json!(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        }
        SObjectField::Value(Value::Bytes(bytes)) => json!(STANDARD.encode(bytes)),
        SObjectField::Value(value) => value.to_json(),
        SObjectField::Date(date) => json!(date.format("%Y-%m-%d").to_string()),
        SObjectField::Time(time) => json!(time.format("%H:%M:%S%.3fZ").to_string()),
        SObjectField::Child(child) => child.to_json(),
    }
}

/// Parses an `xsd:dateTime`: RFC 3339 with any fraction and offset, or a
/// local date-time read as UTC, or a bare date at midnight.
pub fn parse_datetime(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| Error::Type(format!("'{}' is not a valid date-time", raw)))
}

/// Parses an `xsd:date`; a trailing time or offset is ignored.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| parse_datetime(raw).map(|dt| dt.date_naive()))
        .map_err(|_| Error::Type(format!("'{}' is not a valid date", raw)))
}

/// Parses an `xsd:time`, shifting it to UTC when an offset is given.
pub fn parse_time(raw: &str) -> Result<NaiveTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(&format!("1970-01-01T{}", raw)) {
        return Ok(dt.with_timezone(&Utc).time());
    }
    NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| Error::Type(format!("'{}' is not a valid time", raw)))
}
