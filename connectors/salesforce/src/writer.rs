//! Batching writer: records are buffered up to the commit level, sent in a
//! single API call, and every result is routed to the flow or reject output.

use crate::config::{
    OutputAction, SalesforceOutputConfig, FIELD_ERROR_CODE, FIELD_ERROR_FIELDS,
    FIELD_ERROR_MESSAGE, FIELD_SALESFORCE_ID,
};
use crate::connection::{
    ApiError, PartnerConnection, RestConnection, SaveResult, DATETIME_PATTERN, DATE_PATTERN,
};
use crate::sobject::{parse_date, parse_datetime, parse_time, SObject, SObjectField};
use compkit_core::{
    types::{StringConverter, TypeConverter},
    Error, Feedback, FieldType, Record, Result, Schema, Value, WriteResult,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

const ID_FIELD: &str = "Id";

pub struct SalesforceWriter {
    config: SalesforceOutputConfig,
    connection: Option<Arc<dyn PartnerConnection>>,
    commit_level: usize,
    uid: String,
    main_schema: Option<Arc<Schema>>,
    module_schema: Arc<Schema>,
    flow_schema: Option<Arc<Schema>>,
    reject_schema: Option<Arc<Schema>>,
    pending: Vec<Record>,
    delete_field_id: Option<usize>,
    data_count: u64,
    success_count: u64,
    reject_count: u64,
    successful_writes: Vec<Record>,
    rejected_writes: Vec<Record>,
}

impl SalesforceWriter {
    pub fn new(config: SalesforceOutputConfig) -> Self {
        let commit_level = config.effective_commit_level();
        let flow_schema = config.schema_flow.clone().map(Arc::new);
        let reject_schema = config.schema_reject.clone().map(Arc::new);
        Self {
            config,
            connection: None,
            commit_level,
            uid: String::new(),
            main_schema: None,
            module_schema: Arc::new(Schema::new("", Vec::new())),
            flow_schema,
            reject_schema,
            pending: Vec::with_capacity(commit_level * 2),
            delete_field_id: None,
            data_count: 0,
            success_count: 0,
            reject_count: 0,
            successful_writes: Vec::new(),
            rejected_writes: Vec::new(),
        }
    }

    /// Uses `connection` instead of logging in on `open`.
    pub fn with_connection(mut self, connection: Arc<dyn PartnerConnection>) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn commit_level(&self) -> usize {
        self.commit_level
    }

    pub fn main_schema(&self) -> Option<&Arc<Schema>> {
        self.main_schema.as_ref()
    }

    pub async fn open(&mut self, uid: &str) -> Result<()> {
        self.uid = uid.to_string();
        let connection = match &self.connection {
            Some(connection) => connection.clone(),
            None => {
                let connection: Arc<dyn PartnerConnection> =
                    Arc::new(RestConnection::connect(&self.config.connection).await?);
                self.connection = Some(connection.clone());
                connection
            }
        };

        if self.main_schema.is_none() {
            let module_schema = Arc::new(connection.describe(&self.config.module_name).await?);
            let main_schema = if self.config.schema.include_all_fields {
                module_schema.clone()
            } else {
                Arc::new(self.config.schema.clone())
            };
            self.module_schema = module_schema;
            self.main_schema = Some(main_schema);
        }

        info!(
            uid,
            module = %self.config.module_name,
            action = ?self.config.output_action,
            commit_level = self.commit_level,
            "Opened Salesforce writer"
        );
        Ok(())
    }

    /// Counts every call; `None` stands for an empty row and is skipped.
    pub async fn write(&mut self, datum: Option<Record>) -> Result<()> {
        self.data_count += 1;
        let Some(input) = datum else {
            return Ok(());
        };

        self.successful_writes.clear();
        self.rejected_writes.clear();

        if self.config.output_action == OutputAction::Delete {
            return self.delete(input).await;
        }
        self.pending.push(input);
        if self.pending.len() >= self.commit_level {
            self.flush().await?;
        }
        Ok(())
    }

    async fn delete(&mut self, input: Record) -> Result<()> {
        let pos = match self.delete_field_id {
            Some(pos) => pos,
            None => {
                let pos = input
                    .schema()
                    .position(ID_FIELD)
                    .ok_or_else(|| Error::Schema(format!("{} not found", ID_FIELD)))?;
                self.delete_field_id = Some(pos);
                pos
            }
        };
        if input.get(pos).is_some_and(|id| !id.is_null()) {
            self.pending.push(input);
            if self.pending.len() >= self.commit_level {
                self.flush().await?;
            }
        }
        Ok(())
    }

    /// Sends the pending records. They stay pending when the API could not
    /// be reached; any other failure drops the batch.
    pub async fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let items = std::mem::take(&mut self.pending);
        match self.commit(&items).await {
            Ok(()) => Ok(()),
            Err(e @ Error::Connection(_)) => {
                self.pending = items;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn commit(&mut self, items: &[Record]) -> Result<()> {
        let connection = self
            .connection
            .clone()
            .ok_or_else(|| Error::Connection("Salesforce writer is not open".into()))?;

        let (results, keys) = match self.config.output_action {
            OutputAction::Insert => {
                let objects = self.create_sobjects(items)?;
                let keys: Vec<Option<String>> = vec![None; objects.len()];
                (connection.create(&objects).await?, keys)
            }
            OutputAction::Update => {
                let objects = self.create_sobjects(items)?;
                let keys = objects.iter().map(|o| o.id().map(String::from)).collect();
                (connection.update(&objects).await?, keys)
            }
            OutputAction::Upsert => {
                let key_column = &self.config.upsert_key_column;
                let objects = items
                    .iter()
                    .map(|r| self.create_sobject_for_upsert(r))
                    .collect::<Result<Vec<_>>>()?;
                let keys = objects
                    .iter()
                    .map(|o| match o.field(key_column) {
                        Some(_) => Some(key_column.clone()),
                        None => Some(format!("No value for {} ", key_column)),
                    })
                    .collect();
                (connection.upsert(key_column, &objects).await?, keys)
            }
            OutputAction::Delete => {
                let pos = self.delete_field_id.unwrap_or_default();
                let ids: Vec<String> = items
                    .iter()
                    .map(|r| r.get(pos).map(Value::to_string).unwrap_or_default())
                    .collect();
                let keys = ids.iter().cloned().map(Some).collect();
                (connection.delete(&ids).await?, keys)
            }
        };
        debug!(
            records = items.len(),
            results = results.len(),
            action = ?self.config.output_action,
            "Flushed Salesforce batch"
        );

        for (i, (input, result)) in items.iter().zip(results.iter()).enumerate() {
            if result.success {
                self.handle_success(input, result)?;
            } else {
                let key: Option<&String> = keys.get(i).and_then(Option::as_ref);
                self.handle_reject(input, &result.errors, key.map(String::as_str))?;
            }
        }
        Ok(())
    }

    fn main_schema_or_err(&self) -> Result<&Arc<Schema>> {
        self.main_schema
            .as_ref()
            .ok_or_else(|| Error::Connection("Salesforce writer is not open".into()))
    }

    fn create_sobjects(&self, items: &[Record]) -> Result<Vec<SObject>> {
        items.iter().map(|r| self.create_sobject(r)).collect()
    }

    fn create_sobject(&self, input: &Record) -> Result<SObject> {
        let main_schema = self.main_schema_or_err()?;
        let mut object = SObject::new(&self.config.module_name);
        let mut null_fields = Vec::new();
        for (field, value) in input.fields() {
            let Some(se) = main_schema.field(&field.name) else {
                continue;
            };
            if !value.is_blank() {
                self.add_sobject_field(&mut object, se.field_type, &se.name, value)?;
            } else if self.config.output_action == OutputAction::Update {
                null_fields.push(field.name.clone());
            }
        }
        if !self.config.ignore_null {
            object.set_fields_to_null(null_fields);
        }
        Ok(object)
    }

    fn create_sobject_for_upsert(&self, input: &Record) -> Result<SObject> {
        let main_schema = self.main_schema_or_err()?;
        let relations = self.config.reference_fields();
        let mut object = SObject::new(&self.config.module_name);
        let mut null_fields = Vec::new();
        for (field, value) in input.fields() {
            // Columns unknown to the main schema carry nothing to send.
            let Some(se) = main_schema.field(&field.name) else {
                continue;
            };
            let relation = relations.get(se.name.as_str());
            if !value.is_blank() {
                match relation {
                    Some(relation) => {
                        let mut child = SObject::new(&relation.lookup_field_module_name);
                        self.add_sobject_field(
                            &mut child,
                            se.field_type,
                            &relation.lookup_field_external_id_name,
                            value,
                        )?;
                        object.set_field(
                            &relation.lookup_relationship_field_name,
                            SObjectField::Child(child),
                        );
                    }
                    None => self.add_sobject_field(&mut object, se.field_type, &se.name, value)?,
                }
            } else if let Some(relation) = relation {
                if let Some(name) = relation
                    .lookup_field_name
                    .as_deref()
                    .filter(|n| !n.trim().is_empty())
                {
                    null_fields.push(name.to_string());
                }
            } else if se.name != ID_FIELD && se.name != self.config.upsert_key_column {
                null_fields.push(se.name.clone());
            }
        }
        if !self.config.ignore_null {
            object.set_fields_to_null(null_fields);
        }
        Ok(object)
    }

    /// Sets `value` on `object`, converting it to what the API expects for
    /// the module field of the same name. The module pattern only picks the
    /// temporal codec.
    fn add_sobject_field(
        &self,
        object: &mut SObject,
        expected: FieldType,
        name: &str,
        value: &Value,
    ) -> Result<()> {
        let module_field = self.module_schema.field(name);
        // Binary module fields keep their bytes and go out base64 encoded.
        let value = match (expected, value) {
            (FieldType::Bytes, Value::Bytes(bytes))
                if module_field.map(|f| f.field_type) != Some(FieldType::Bytes) =>
            {
                Value::String(String::from_utf8_lossy(bytes).into_owned())
            }
            _ => value.clone(),
        };

        let converted = match (&value, module_field) {
            (Value::String(raw), Some(module_field)) => {
                Some(match module_field.pattern.as_deref().filter(|p| !p.is_empty()) {
                    Some(DATETIME_PATTERN) => SObjectField::Value(Value::Date(parse_datetime(raw)?)),
                    Some(DATE_PATTERN) => SObjectField::Date(parse_date(raw)?),
                    Some(_) => SObjectField::Time(parse_time(raw)?),
                    None => {
                        SObjectField::Value(StringConverter.convert_to_value(raw, module_field)?)
                    }
                })
            }
            _ => None,
        };
        object.set_field(name, converted.unwrap_or(SObjectField::Value(value)));
        Ok(())
    }

    fn handle_success(&mut self, input: &Record, result: &SaveResult) -> Result<()> {
        self.success_count += 1;
        let Some(out_schema) = self.flow_schema.clone().filter(|s| !s.is_empty()) else {
            return Ok(());
        };
        if input.has_schema(&out_schema) {
            self.successful_writes.push(input.clone());
            return Ok(());
        }
        let values = out_schema
            .fields
            .iter()
            .map(|out_field| match input.get_by_name(&out_field.name) {
                Some(value) => value.clone(),
                None if out_field.name == FIELD_SALESFORCE_ID => Value::from(result.id.clone()),
                None => Value::Null,
            })
            .collect();
        self.successful_writes
            .push(Record::from_values(out_schema, values)?);
        Ok(())
    }

    fn handle_reject(&mut self, input: &Record, errors: &[ApiError], key: Option<&str>) -> Result<()> {
        if self.config.cease_for_error {
            let log = error_log(errors, key);
            if !log.is_empty() {
                return Err(Error::Rejected(log));
            }
            return Ok(());
        }

        self.reject_count += 1;
        warn!(
            key = key.unwrap_or_default(),
            errors = errors.len(),
            "Salesforce rejected a record"
        );
        let Some(out_schema) = self.reject_schema.clone().filter(|s| !s.is_empty()) else {
            return Ok(());
        };
        if input.has_schema(&out_schema) {
            self.rejected_writes.push(input.clone());
            return Ok(());
        }
        let first = errors.first();
        let values = out_schema
            .fields
            .iter()
            .map(|out_field| {
                if let Some(value) = input.get_by_name(&out_field.name) {
                    return value.clone();
                }
                let Some(error) = first else {
                    return Value::Null;
                };
                match out_field.name.as_str() {
                    FIELD_ERROR_CODE => Value::from(error.status_code.clone()),
                    FIELD_ERROR_FIELDS => Value::from(error.fields.join(",")),
                    FIELD_ERROR_MESSAGE => Value::from(error.message.clone()),
                    _ => Value::Null,
                }
            })
            .collect();
        self.rejected_writes
            .push(Record::from_values(out_schema, values)?);
        Ok(())
    }

    pub fn successful_writes(&self) -> &[Record] {
        &self.successful_writes
    }

    pub fn rejected_writes(&self) -> &[Record] {
        &self.rejected_writes
    }

    /// Moves the current flow and reject records out of the writer.
    pub fn take_feedback(&mut self) -> Feedback {
        Feedback {
            successful: std::mem::take(&mut self.successful_writes),
            rejected: std::mem::take(&mut self.rejected_writes),
        }
    }

    /// Flushes whatever is still pending. The feedback of that last flush
    /// remains readable afterwards.
    pub async fn close(&mut self) -> Result<WriteResult> {
        self.successful_writes.clear();
        self.rejected_writes.clear();
        self.flush().await?;
        info!(
            uid = %self.uid,
            data = self.data_count,
            success = self.success_count,
            reject = self.reject_count,
            "Closed Salesforce writer"
        );
        Ok(WriteResult::new(
            self.uid.clone(),
            self.data_count,
            self.success_count,
            self.reject_count,
        ))
    }
}

/// One block per error: status code, row key, fields and message.
fn error_log(errors: &[ApiError], key: Option<&str>) -> String {
    errors
        .iter()
        .map(|error| {
            let mut entry = format!("Status Code: {}\n", error.status_code);
            if let Some(key) = key {
                entry.push_str(&format!("Rowkey: {}\n", key));
            }
            if !error.fields.is_empty() {
                entry.push_str(&format!("Fields: {}\n", error.fields.join(", ")));
            }
            entry.push_str(&format!("Message: {}\n", error.message));
            entry
        })
        .collect::<Vec<_>>()
        .join("\n")
}
