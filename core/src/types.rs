use crate::{
    error::{Error, Result},
    record::{Field, FieldType, Value},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

pub trait TypeConverter {
    fn convert_to_value(&self, raw_value: &str, field: &Field) -> Result<Value>;
}

/// Converts textual column values into typed values following the field
/// type and, for dates, the field pattern.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringConverter;

impl TypeConverter for StringConverter {
    fn convert_to_value(&self, raw_value: &str, field: &Field) -> Result<Value> {
        if raw_value.is_empty() {
            return Ok(Value::Null);
        }
        match field.field_type {
            FieldType::String => Ok(Value::String(raw_value.to_string())),
            FieldType::Int | FieldType::Long => raw_value
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| {
                    Error::Type(format!(
                        "Failed to convert '{}' to integer for field {}: {}",
                        raw_value, field.name, e
                    ))
                }),
            FieldType::Float | FieldType::Double => raw_value
                .trim()
                .parse::<f64>()
                .map(Value::Double)
                .map_err(|e| {
                    Error::Type(format!(
                        "Failed to convert '{}' to float for field {}: {}",
                        raw_value, field.name, e
                    ))
                }),
            FieldType::Boolean => match raw_value.trim().to_lowercase().as_str() {
                "1" | "true" => Ok(Value::Boolean(true)),
                "0" | "false" => Ok(Value::Boolean(false)),
                _ => Err(Error::Type(format!("Invalid boolean value: {}", raw_value))),
            },
            FieldType::Bytes => Ok(Value::Bytes(raw_value.as_bytes().to_vec())),
            FieldType::Date => parse_date(raw_value, field.pattern.as_deref()).map(Value::Date),
        }
    }
}

/// Translates a `SimpleDateFormat` style pattern (`yyyy-MM-dd'T'HH:mm:ss`)
/// into a chrono format string.
pub fn to_chrono_format(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            // '' is an escaped quote, anything else up to the next quote is literal
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            while i < chars.len() && chars[i] != '\'' {
                push_literal(&mut out, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }
        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }
        let token = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('H', 1) => "%-H",
            ('H', _) => "%H",
            ('h', _) => "%I",
            ('m', 1) => "%-M",
            ('m', _) => "%M",
            ('s', 1) => "%-S",
            ('s', _) => "%S",
            ('S', _) => "%3f",
            ('a', _) => "%p",
            ('X', _) | ('Z', _) => "%z",
            _ => {
                for _ in 0..run {
                    push_literal(&mut out, c);
                }
                i += run;
                continue;
            }
        };
        out.push_str(token);
        i += run;
    }
    out
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

pub fn parse_date(raw: &str, pattern: Option<&str>) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    match pattern.filter(|p| !p.is_empty()) {
        Some(pattern) => {
            let format = to_chrono_format(pattern);
            if let Ok(dt) = DateTime::parse_from_str(raw, &format) {
                return Ok(dt.with_timezone(&Utc));
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, &format) {
                return Ok(dt.and_utc());
            }
            if let Ok(date) = NaiveDate::parse_from_str(raw, &format) {
                return Ok(date.and_time(NaiveTime::MIN).and_utc());
            }
            let time = NaiveTime::parse_from_str(raw, &format).map_err(|e| {
                Error::Type(format!(
                    "Failed to parse '{}' with pattern '{}': {}",
                    raw, pattern, e
                ))
            })?;
            Ok(DateTime::<Utc>::default()
                .date_naive()
                .and_time(time)
                .and_utc())
        }
        None => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
                return Ok(dt.with_timezone(&Utc));
            }
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")?;
            Ok(date.and_time(NaiveTime::MIN).and_utc())
        }
    }
}

impl Value {
    pub fn from_json(json: &serde_json::Value, field: &Field) -> Result<Value> {
        match json {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => match field.field_type {
                FieldType::String => Ok(Value::String(b.to_string())),
                _ => Ok(Value::Boolean(*b)),
            },
            serde_json::Value::Number(n) => match field.field_type {
                FieldType::Int | FieldType::Long => n
                    .as_i64()
                    .map(Value::Int)
                    .ok_or_else(|| Error::Type(format!("{} is not an integer", n))),
                FieldType::Float | FieldType::Double => n
                    .as_f64()
                    .map(Value::Double)
                    .ok_or_else(|| Error::Type(format!("{} is not a number", n))),
                FieldType::String => Ok(Value::String(n.to_string())),
                _ => StringConverter.convert_to_value(&n.to_string(), field),
            },
            serde_json::Value::String(s) => StringConverter.convert_to_value(s, field),
            other => match field.field_type {
                FieldType::String => Ok(Value::String(other.to_string())),
                _ => Err(Error::Type(format!(
                    "Unsupported JSON value for field {}: {}",
                    field.name, other
                ))),
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::Number((*n).into()),
            Value::Double(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::String(String::from_utf8_lossy(b).into_owned()),
            Value::Date(d) => serde_json::Value::String(d.to_rfc3339()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_pattern_translation() {
        assert_eq!(to_chrono_format("yyyy-MM-dd"), "%Y-%m-%d");
        assert_eq!(
            to_chrono_format("yyyy-MM-dd'T'HH:mm:ss'.000Z'"),
            "%Y-%m-%dT%H:%M:%S.000Z"
        );
        assert_eq!(to_chrono_format("HH:mm:ss.SSS'Z'"), "%H:%M:%S.%3fZ");
        assert_eq!(to_chrono_format("dd/MM/yyyy ''x''"), "%d/%m/%Y 'x'");
    }

    #[test]
    fn test_convert_by_field_type() {
        let converter = StringConverter;
        let int = Field::new("n", FieldType::Int);
        assert_eq!(converter.convert_to_value("42", &int).unwrap(), Value::Int(42));
        assert!(converter.convert_to_value("4x", &int).is_err());
        assert_eq!(converter.convert_to_value("", &int).unwrap(), Value::Null);

        let flag = Field::new("b", FieldType::Boolean);
        assert_eq!(
            converter.convert_to_value("TRUE", &flag).unwrap(),
            Value::Boolean(true)
        );
        assert!(converter.convert_to_value("yes", &flag).is_err());

        let amount = Field::new("d", FieldType::Double);
        assert_eq!(
            converter.convert_to_value("1.5", &amount).unwrap(),
            Value::Double(1.5)
        );
    }

    #[test]
    fn test_convert_dates() {
        let converter = StringConverter;
        let day = Field::new("d", FieldType::Date).with_pattern("yyyy-MM-dd");
        match converter.convert_to_value("2024-03-09", &day).unwrap() {
            Value::Date(d) => assert_eq!((d.year(), d.month(), d.day()), (2024, 3, 9)),
            other => panic!("unexpected value {:?}", other),
        }

        let stamp = Field::new("t", FieldType::Date).with_pattern("yyyy-MM-dd'T'HH:mm:ss'.000Z'");
        match converter
            .convert_to_value("2024-03-09T10:11:12.000Z", &stamp)
            .unwrap()
        {
            Value::Date(d) => assert_eq!((d.hour(), d.minute(), d.second()), (10, 11, 12)),
            other => panic!("unexpected value {:?}", other),
        }

        let untyped = Field::new("u", FieldType::Date);
        assert!(converter
            .convert_to_value("2024-03-09T10:11:12Z", &untyped)
            .is_ok());
        assert!(converter.convert_to_value("09.03.2024", &untyped).is_err());
    }

    #[test]
    fn test_json_round_trip_of_typed_values() {
        let field = Field::new("n", FieldType::Long);
        let value = Value::from_json(&serde_json::json!(7), &field).unwrap();
        assert_eq!(value, Value::Int(7));
        assert_eq!(value.to_json(), serde_json::json!(7));

        let text = Field::new("s", FieldType::String);
        assert_eq!(
            Value::from_json(&serde_json::json!(3), &text).unwrap(),
            Value::from("3")
        );
        assert_eq!(
            Value::from_json(&serde_json::Value::Null, &text).unwrap(),
            Value::Null
        );
    }
}
