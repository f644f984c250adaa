//! Text encodings used by the file based components (filesystem and blob
//! storage).

use crate::{
    error::{Error, Result},
    record::{Record, Schema, Value},
    types::{StringConverter, TypeConverter},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    #[default]
    Csv,
    Jsonl,
}

impl FileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Jsonl => "jsonl",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FileFormat::Csv => "text/csv",
            FileFormat::Jsonl => "application/x-ndjson",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatOptions {
    #[serde(default)]
    pub format: FileFormat,
    #[serde(default = "default_field_delimiter")]
    pub field_delimiter: char,
    #[serde(default)]
    pub header: bool,
}

fn default_field_delimiter() -> char {
    ';'
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            format: FileFormat::Csv,
            field_delimiter: default_field_delimiter(),
            header: false,
        }
    }
}

pub fn encode(records: &[Record], options: &FormatOptions, include_header: bool) -> Result<Vec<u8>> {
    let mut out = String::new();
    match options.format {
        FileFormat::Csv => {
            let delimiter = options.field_delimiter;
            if include_header {
                if let Some(first) = records.first() {
                    let names: Vec<String> = first
                        .schema()
                        .fields
                        .iter()
                        .map(|f| quote_csv(&f.name, delimiter))
                        .collect();
                    out.push_str(&names.join(&delimiter.to_string()));
                    out.push('\n');
                }
            }
            for record in records {
                let cells: Vec<String> = record
                    .values()
                    .iter()
                    .map(|v| quote_csv(&v.to_string(), delimiter))
                    .collect();
                out.push_str(&cells.join(&delimiter.to_string()));
                out.push('\n');
            }
        }
        FileFormat::Jsonl => {
            for record in records {
                let object: serde_json::Map<String, serde_json::Value> = record
                    .fields()
                    .map(|(field, value)| (field.name.clone(), value.to_json()))
                    .collect();
                out.push_str(&serde_json::to_string(&object)?);
                out.push('\n');
            }
        }
    }
    Ok(out.into_bytes())
}

fn quote_csv(value: &str, delimiter: char) -> String {
    if value.contains(delimiter) || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn decode(bytes: &[u8], options: &FormatOptions, schema: &Arc<Schema>) -> Result<Vec<Record>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::Read(format!("Input is not valid UTF-8: {}", e)))?;
    match options.format {
        FileFormat::Csv => decode_csv(text, options, schema),
        FileFormat::Jsonl => decode_jsonl(text, schema),
    }
}

fn decode_csv(text: &str, options: &FormatOptions, schema: &Arc<Schema>) -> Result<Vec<Record>> {
    let mut rows = split_csv(text, options.field_delimiter)?.into_iter();

    // column index in the file for every schema field
    let mapping: Vec<Option<usize>> = if options.header {
        match rows.next() {
            Some(header) => schema
                .fields
                .iter()
                .map(|f| header.iter().position(|h| h == &f.name))
                .collect(),
            None => return Ok(Vec::new()),
        }
    } else {
        (0..schema.fields.len()).map(Some).collect()
    };

    let converter = StringConverter;
    let mut records = Vec::new();
    for row in rows {
        let mut values = Vec::with_capacity(schema.fields.len());
        for (field, column) in schema.fields.iter().zip(&mapping) {
            let value = match column.and_then(|c| row.get(c)) {
                Some(raw) => converter.convert_to_value(raw, field)?,
                None => Value::Null,
            };
            values.push(value);
        }
        records.push(Record::from_values(schema.clone(), values)?);
    }
    Ok(records)
}

/// RFC 4180 tokenizer. Empty lines are dropped.
fn split_csv(text: &str, delimiter: char) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    cell.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                cell.push(c);
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut cell));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(std::mem::take(&mut row));
                } else {
                    row.clear();
                }
            }
            c if c == delimiter => row.push(std::mem::take(&mut cell)),
            c => cell.push(c),
        }
    }
    if in_quotes {
        return Err(Error::Read("Unterminated quoted CSV field".to_string()));
    }
    if !cell.is_empty() || !row.is_empty() {
        row.push(cell);
        rows.push(row);
    }
    Ok(rows)
}

fn decode_jsonl(text: &str, schema: &Arc<Schema>) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let json: serde_json::Value = serde_json::from_str(line)
            .map_err(|e| Error::Read(format!("Invalid JSON on line {}: {}", line_no + 1, e)))?;
        let object = json
            .as_object()
            .ok_or_else(|| Error::Read(format!("Line {} is not a JSON object", line_no + 1)))?;
        let values = schema
            .fields
            .iter()
            .map(|field| match object.get(&field.name) {
                Some(v) => Value::from_json(v, field),
                None => Ok(Value::Null),
            })
            .collect::<Result<Vec<_>>>()?;
        records.push(Record::from_values(schema.clone(), values)?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Field, FieldType};

    fn people() -> Arc<Schema> {
        Arc::new(Schema::new(
            "people",
            vec![
                Field::new("name", FieldType::String),
                Field::new("age", FieldType::Int),
            ],
        ))
    }

    fn person(schema: &Arc<Schema>, name: &str, age: i64) -> Record {
        Record::from_values(schema.clone(), vec![name.into(), Value::Int(age)]).unwrap()
    }

    #[test]
    fn test_csv_quotes_special_values() {
        let schema = people();
        let records = vec![person(&schema, "Doe; John", 41), person(&schema, "say \"hi\"", 7)];
        let options = FormatOptions::default();

        let bytes = encode(&records, &options, true).unwrap();
        assert_eq!(
            String::from_utf8(bytes.clone()).unwrap(),
            "name;age\n\"Doe; John\";41\n\"say \"\"hi\"\"\";7\n"
        );

        let options = FormatOptions {
            header: true,
            ..FormatOptions::default()
        };
        let decoded = decode(&bytes, &options, &schema).unwrap();
        assert_eq!(decoded, records);
    }

    #[test]
    fn test_csv_header_maps_columns_by_name() {
        let schema = people();
        let options = FormatOptions {
            format: FileFormat::Csv,
            field_delimiter: ',',
            header: true,
        };
        let decoded = decode(b"age,name,extra\n30,Ann,x\n\n31,Bob,y", &options, &schema).unwrap();
        assert_eq!(decoded, vec![person(&schema, "Ann", 30), person(&schema, "Bob", 31)]);
    }

    #[test]
    fn test_csv_without_header_uses_positions_and_nulls_missing() {
        let schema = people();
        let decoded = decode(b"Ann\n", &FormatOptions::default(), &schema).unwrap();
        assert_eq!(decoded[0].get_by_name("name"), Some(&Value::from("Ann")));
        assert_eq!(decoded[0].get_by_name("age"), Some(&Value::Null));
    }

    #[test]
    fn test_unterminated_quote_is_an_error() {
        let schema = people();
        assert!(decode(b"\"Ann;1\n", &FormatOptions::default(), &schema).is_err());
    }

    #[test]
    fn test_jsonl_by_field_name() {
        let schema = people();
        let options = FormatOptions {
            format: FileFormat::Jsonl,
            ..FormatOptions::default()
        };
        let bytes = encode(&[person(&schema, "Ann", 30)], &options, false).unwrap();
        let line: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(line, serde_json::json!({"name": "Ann", "age": 30}));

        let decoded = decode(b"{\"name\":\"Bob\"}\n\n{\"age\":2,\"name\":\"Cy\"}\n", &options, &schema)
            .unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].get_by_name("age"), Some(&Value::Null));
        assert_eq!(decoded[1], person(&schema, "Cy", 2));
        assert!(decode(b"[1]\n", &options, &schema).is_err());
    }
}
