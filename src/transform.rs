use crate::constants::{
    HOA_SEQUENCE, HOA_TABLE, PROPERTIES_TABLE, REHAB_SEQUENCE, REHAB_TABLE, VALUATIONS_TABLE,
    VALUATION_SEQUENCE,
};
use crate::error::{EtlError, Result};
use crate::extract::RawRecord;
use crate::rows::{HoaRow, NormalizedBatch, PropertyRow, RecordKey, RehabRow, ValuationRow};
use crate::schema::{FieldKind, FieldSchema};
use serde_json::{Map, Value};
use tracing::info;

/// Coerces a raw scalar to a number. Unparsable or absent values degrade to
/// `None` so one malformed field never drops the whole property. Idempotent:
/// an already-numeric value passes through unchanged.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Coerces a raw scalar to trimmed text. Null and structured values yield
/// `None`; the absence marker is never stringified.
pub fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Renders a number for storage in a text column, dropping a trailing `.0`
/// on integer values.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 9e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// The transform core: projects raw records through the field schema and
/// expands the embedded child sequences into flat row collections tagged
/// with the parent's record key.
pub struct Normalizer<'a> {
    schema: &'a FieldSchema,
}

impl<'a> Normalizer<'a> {
    pub fn new(schema: &'a FieldSchema) -> Self {
        Self { schema }
    }

    /// Normalizes the whole batch. Field-level coercion failures degrade to
    /// `None`; a structural failure (required field missing, malformed child
    /// sequence) aborts the pass and discards all partial output.
    pub fn normalize(&self, records: &[RawRecord]) -> Result<NormalizedBatch> {
        let mut batch = NormalizedBatch::default();

        for record in records {
            batch.properties.push(self.property_row(record)?);

            for entry in self.child_entries(record, HOA_SEQUENCE)? {
                let fields = self.child_fields(record.key, HOA_SEQUENCE, entry)?;
                batch.hoa.push(self.hoa_row(record.key, fields)?);
            }
            for entry in self.child_entries(record, REHAB_SEQUENCE)? {
                let fields = self.child_fields(record.key, REHAB_SEQUENCE, entry)?;
                batch.rehab.push(self.rehab_row(record.key, fields)?);
            }
            for entry in self.child_entries(record, VALUATION_SEQUENCE)? {
                let fields = self.child_fields(record.key, VALUATION_SEQUENCE, entry)?;
                batch.valuations.push(self.valuation_row(record.key, fields)?);
            }
        }

        info!(
            properties = batch.properties.len(),
            hoa = batch.hoa.len(),
            rehab = batch.rehab.len(),
            valuations = batch.valuations.len(),
            "Transform complete"
        );
        Ok(batch)
    }

    fn property_row(&self, record: &RawRecord) -> Result<PropertyRow> {
        let f = &record.fields;
        let k = record.key;
        let t = PROPERTIES_TABLE;
        Ok(PropertyRow {
            record_key: k,
            property_title: self.text(f, k, t, "Property_Title")?,
            street_address: self.text(f, k, t, "Street_Address")?,
            city: self.text(f, k, t, "City")?,
            state: self.text(f, k, t, "State")?,
            zip: self.text(f, k, t, "Zip")?,
            property_type: self.text(f, k, t, "Property_Type")?,
            sqft_basement: self.number(f, k, t, "SQFT_Basement")?,
            sqft_mu: self.number(f, k, t, "SQFT_MU")?,
            sqft_total: self.number(f, k, t, "SQFT_Total")?,
            year_built: self.number(f, k, t, "Year_Built")?,
            bedrooms: self.number(f, k, t, "Bed")?,
            bathrooms: self.number(f, k, t, "Bath")?,
            parking: self.text(f, k, t, "Parking")?,
            layout: self.text(f, k, t, "Layout")?,
            highway: self.text(f, k, t, "Highway")?,
            train: self.text(f, k, t, "Train")?,
            water: self.text(f, k, t, "Water")?,
            sewage: self.text(f, k, t, "Sewage")?,
            pool: self.text(f, k, t, "Pool")?,
            commercial: self.text(f, k, t, "Commercial")?,
            htw: self.text(f, k, t, "HTW")?,
            tax_rate: self.number(f, k, t, "Tax_Rate")?,
            taxes: self.number(f, k, t, "Taxes")?,
            net_yield: self.number(f, k, t, "Net_Yield")?,
            irr: self.number(f, k, t, "IRR")?,
            rent_restricted: self.text(f, k, t, "Rent_Restricted")?,
            neighborhood_rating: self.number(f, k, t, "Neighborhood_Rating")?,
            latitude: self.number(f, k, t, "Latitude")?,
            longitude: self.number(f, k, t, "Longitude")?,
            subdivision: self.text(f, k, t, "Subdivision")?,
            selling_reason: self.text(f, k, t, "Selling_Reason")?,
            seller_retained_broker: self.text(f, k, t, "Seller_Retained_Broker")?,
            final_reviewer: self.text(f, k, t, "Final_Reviewer")?,
            school_average: self.number(f, k, t, "School_Average")?,
            reviewed_status: self.text(f, k, t, "Reviewed_Status")?,
            most_recent_status: self.text(f, k, t, "Most_Recent_Status")?,
            source: self.text(f, k, t, "Source")?,
            market: self.text(f, k, t, "Market")?,
            occupancy: self.text(f, k, t, "Occupancy")?,
            flood: self.text(f, k, t, "Flood")?,
        })
    }

    fn hoa_row(&self, key: RecordKey, fields: &Map<String, Value>) -> Result<HoaRow> {
        Ok(HoaRow {
            record_key: key,
            hoa_fee: self.number(fields, key, HOA_TABLE, "HOA")?,
            hoa_flag: self.text(fields, key, HOA_TABLE, "HOA_Flag")?,
        })
    }

    fn rehab_row(&self, key: RecordKey, fields: &Map<String, Value>) -> Result<RehabRow> {
        let t = REHAB_TABLE;
        Ok(RehabRow {
            record_key: key,
            underwriting_rehab: self.number(fields, key, t, "Underwriting_Rehab")?,
            rehab_calculation: self.number(fields, key, t, "Rehab_Calculation")?,
            paint: self.text(fields, key, t, "Paint")?,
            flooring_flag: self.text(fields, key, t, "Flooring_Flag")?,
            foundation_flag: self.text(fields, key, t, "Foundation_Flag")?,
            roof_flag: self.text(fields, key, t, "Roof_Flag")?,
            hvac_flag: self.text(fields, key, t, "HVAC_Flag")?,
            kitchen_flag: self.text(fields, key, t, "Kitchen_Flag")?,
            bathroom_flag: self.text(fields, key, t, "Bathroom_Flag")?,
            appliances_flag: self.text(fields, key, t, "Appliances_Flag")?,
            windows_flag: self.text(fields, key, t, "Windows_Flag")?,
            landscaping_flag: self.text(fields, key, t, "Landscaping_Flag")?,
            trashout_flag: self.text(fields, key, t, "Trashout_Flag")?,
        })
    }

    fn valuation_row(&self, key: RecordKey, fields: &Map<String, Value>) -> Result<ValuationRow> {
        let t = VALUATIONS_TABLE;
        Ok(ValuationRow {
            record_key: key,
            list_price: self.number(fields, key, t, "List_Price")?,
            previous_rent: self.number(fields, key, t, "Previous_Rent")?,
            arv: self.number(fields, key, t, "ARV")?,
            rent_zestimate: self.number(fields, key, t, "Rent_Zestimate")?,
            low_fmr: self.number(fields, key, t, "Low_FMR")?,
            high_fmr: self.number(fields, key, t, "High_FMR")?,
            redfin_value: self.number(fields, key, t, "Redfin_Value")?,
            zestimate: self.number(fields, key, t, "Zestimate")?,
            expected_rent: self.number(fields, key, t, "Expected_Rent")?,
        })
    }

    /// Looks up one of the embedded child sequences. Absent or null means no
    /// entries; any other non-array shape is a structural failure.
    fn child_entries<'r>(&self, record: &'r RawRecord, name: &str) -> Result<&'r [Value]> {
        match record.fields.get(name) {
            None | Some(Value::Null) => Ok(&[]),
            Some(Value::Array(entries)) => Ok(entries),
            Some(_) => Err(EtlError::Transform(format!(
                "record {}: embedded sequence '{}' is not an array",
                record.key, name
            ))),
        }
    }

    fn child_fields<'v>(
        &self,
        key: RecordKey,
        sequence: &str,
        entry: &'v Value,
    ) -> Result<&'v Map<String, Value>> {
        entry.as_object().ok_or_else(|| {
            EtlError::Transform(format!(
                "record {}: entry in '{}' sequence is not an object",
                key, sequence
            ))
        })
    }

    /// Projects one field, enforcing the schema's `required` flag. A field
    /// that is absent or null counts as missing.
    fn raw<'v>(
        &self,
        fields: &'v Map<String, Value>,
        key: RecordKey,
        table: &str,
        name: &str,
    ) -> Result<Option<&'v Value>> {
        let value = fields.get(name).filter(|v| !v.is_null());
        if value.is_none() && self.schema.required(table, name) {
            return Err(EtlError::Transform(format!(
                "record {}: required field '{}' for table '{}' is missing",
                key, name, table
            )));
        }
        Ok(value)
    }

    fn number(
        &self,
        fields: &Map<String, Value>,
        key: RecordKey,
        table: &str,
        name: &str,
    ) -> Result<Option<f64>> {
        Ok(self.raw(fields, key, table, name)?.and_then(coerce_number))
    }

    /// Text projection honors the schema's declared type: a field the config
    /// declares numeric is normalized through the number rule first so its
    /// stored form is canonical (no stray whitespace, no trailing `.0`).
    fn text(
        &self,
        fields: &Map<String, Value>,
        key: RecordKey,
        table: &str,
        name: &str,
    ) -> Result<Option<String>> {
        let value = self.raw(fields, key, table, name)?;
        Ok(value.and_then(|v| match self.schema.kind(table, name) {
            FieldKind::Text => coerce_text(v),
            FieldKind::Number => coerce_number(v).map(format_number),
        }))
    }
}
