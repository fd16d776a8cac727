use crate::config::InputConfig;
use crate::error::{EtlError, Result};
use crate::rows::RecordKey;
use crate::schema::FieldSchema;
use serde_json::Value;
use std::fs;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// One raw property record as read from the batch document, tagged with
/// its synthetic batch-local key. The street address inside `fields` is a
/// display attribute; `key` is what child rows join on.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub key: RecordKey,
    pub fields: serde_json::Map<String, Value>,
}

/// Everything the transform stage needs: the ordered raw records and the
/// field schema parsed from the config table.
#[derive(Debug)]
pub struct ExtractOutput {
    pub records: Vec<RawRecord>,
    pub schema: FieldSchema,
}

pub fn extract(input: &InputConfig) -> Result<ExtractOutput> {
    let records = read_batch(&input.batch_path)?;
    info!(
        count = records.len(),
        path = %input.batch_path.display(),
        "Loaded property records"
    );

    let schema = read_field_schema(&input.field_config_path)?;
    info!(
        fields = schema.len(),
        path = %input.field_config_path.display(),
        "Loaded field config"
    );

    Ok(ExtractOutput { records, schema })
}

/// Reads the batch document: a JSON array of property objects. Keys are
/// assigned in document order, so reruns over the same file produce the
/// same key for each record.
pub fn read_batch(path: &Path) -> Result<Vec<RawRecord>> {
    let content = fs::read_to_string(path).map_err(|e| {
        EtlError::Extraction(format!("Failed to read batch file '{}': {}", path.display(), e))
    })?;
    let document: Value = serde_json::from_str(&content)?;

    let entries = match document {
        Value::Array(entries) => entries,
        other => {
            return Err(EtlError::Extraction(format!(
                "Batch document must be a JSON array of records, got {}",
                json_type_name(&other)
            )))
        }
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(key, entry)| match entry {
            Value::Object(fields) => Ok(RawRecord { key, fields }),
            other => Err(EtlError::Extraction(format!(
                "Record {} is not a JSON object, got {}",
                key,
                json_type_name(&other)
            ))),
        })
        .collect()
}

pub fn read_field_schema(path: &Path) -> Result<FieldSchema> {
    let file = File::open(path).map_err(|e| {
        EtlError::Extraction(format!(
            "Failed to open field config '{}': {}",
            path.display(),
            e
        ))
    })?;
    FieldSchema::from_reader(file)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
