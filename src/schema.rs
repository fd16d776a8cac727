use crate::error::Result;
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use tracing::warn;

/// Target type a field coerces to. Anything the config does not recognize
/// falls back to text so a sloppy config degrades instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Number,
    Text,
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub kind: FieldKind,
    pub required: bool,
}

/// Field configuration parsed from the CSV table
/// (`field_name,table,data_type,required`). Drives type coercion and
/// required-field enforcement in the normalizer; fields not listed here
/// are treated as optional text.
#[derive(Debug, Default)]
pub struct FieldSchema {
    fields: HashMap<(String, String), FieldSpec>,
}

#[derive(Debug, Deserialize)]
struct FieldConfigRow {
    field_name: String,
    table: String,
    data_type: String,
    required: String,
}

impl FieldSchema {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let mut fields = HashMap::new();
        for record in rdr.deserialize() {
            let row: FieldConfigRow = record?;
            let kind = match row.data_type.to_lowercase().as_str() {
                "number" | "numeric" | "float" | "int" | "integer" | "decimal" => {
                    FieldKind::Number
                }
                "text" | "string" | "varchar" => FieldKind::Text,
                other => {
                    warn!(
                        field = %row.field_name,
                        data_type = %other,
                        "Unknown data_type in field config, treating as text"
                    );
                    FieldKind::Text
                }
            };
            let required = matches!(
                row.required.to_lowercase().as_str(),
                "true" | "yes" | "y" | "1"
            );
            fields.insert(
                (row.table, row.field_name),
                FieldSpec { kind, required },
            );
        }

        Ok(Self { fields })
    }

    pub fn kind(&self, table: &str, field: &str) -> FieldKind {
        self.get(table, field).map_or(FieldKind::Text, |s| s.kind)
    }

    pub fn required(&self, table: &str, field: &str) -> bool {
        self.get(table, field).is_some_and(|s| s.required)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn get(&self, table: &str, field: &str) -> Option<&FieldSpec> {
        self.fields
            .get(&(table.to_string(), field.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
field_name,table,data_type,required
Street_Address,properties,text,yes
Year_Built,properties,number,no
HOA,hoa,number,no
Paint,rehab_estimates,text,no
List_Price,valuations,currency,no
";

    #[test]
    fn parses_kinds_and_required_flags() {
        let schema = FieldSchema::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(schema.len(), 5);
        assert_eq!(schema.kind("properties", "Year_Built"), FieldKind::Number);
        assert_eq!(schema.kind("properties", "Street_Address"), FieldKind::Text);
        assert!(schema.required("properties", "Street_Address"));
        assert!(!schema.required("properties", "Year_Built"));
    }

    #[test]
    fn unknown_data_type_falls_back_to_text() {
        let schema = FieldSchema::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(schema.kind("valuations", "List_Price"), FieldKind::Text);
    }

    #[test]
    fn unlisted_field_is_optional_text() {
        let schema = FieldSchema::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(schema.kind("properties", "Flood"), FieldKind::Text);
        assert!(!schema.required("properties", "Flood"));
    }
}
