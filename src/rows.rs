use serde::Serialize;

/// Batch-local synthetic identifier for a raw record: its zero-based
/// position in the input sequence. Assigned by the extractor and carried on
/// every child row so the loader can resolve the parent's database identity
/// without relying on the street address being unique.
pub type RecordKey = usize;

/// One normalized property, ready for insertion. All scalar fields are
/// optional end-to-end; absence is `None`, never a stringified marker.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PropertyRow {
    pub record_key: RecordKey,

    pub property_title: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub property_type: Option<String>,
    pub sqft_basement: Option<f64>,
    pub sqft_mu: Option<f64>,
    pub sqft_total: Option<f64>,
    pub year_built: Option<f64>,
    pub bedrooms: Option<f64>,
    pub bathrooms: Option<f64>,
    pub parking: Option<String>,
    pub layout: Option<String>,
    pub highway: Option<String>,
    pub train: Option<String>,
    pub water: Option<String>,
    pub sewage: Option<String>,
    pub pool: Option<String>,
    pub commercial: Option<String>,
    pub htw: Option<String>,
    pub tax_rate: Option<f64>,
    pub taxes: Option<f64>,
    pub net_yield: Option<f64>,
    pub irr: Option<f64>,
    pub rent_restricted: Option<String>,
    pub neighborhood_rating: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub subdivision: Option<String>,
    pub selling_reason: Option<String>,
    pub seller_retained_broker: Option<String>,
    pub final_reviewer: Option<String>,
    pub school_average: Option<f64>,
    pub reviewed_status: Option<String>,
    pub most_recent_status: Option<String>,
    pub source: Option<String>,
    pub market: Option<String>,
    pub occupancy: Option<String>,
    pub flood: Option<String>,
}

/// One HOA entry from a property's embedded `HOA` sequence.
#[derive(Debug, Clone, Serialize)]
pub struct HoaRow {
    pub record_key: RecordKey,
    pub hoa_fee: Option<f64>,
    pub hoa_flag: Option<String>,
}

/// One rehab estimate from a property's embedded `Rehab` sequence.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RehabRow {
    pub record_key: RecordKey,
    pub underwriting_rehab: Option<f64>,
    pub rehab_calculation: Option<f64>,
    pub paint: Option<String>,
    pub flooring_flag: Option<String>,
    pub foundation_flag: Option<String>,
    pub roof_flag: Option<String>,
    pub hvac_flag: Option<String>,
    pub kitchen_flag: Option<String>,
    pub bathroom_flag: Option<String>,
    pub appliances_flag: Option<String>,
    pub windows_flag: Option<String>,
    pub landscaping_flag: Option<String>,
    pub trashout_flag: Option<String>,
}

/// One valuation from a property's embedded `Valuation` sequence.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValuationRow {
    pub record_key: RecordKey,
    pub list_price: Option<f64>,
    pub previous_rent: Option<f64>,
    pub arv: Option<f64>,
    pub rent_zestimate: Option<f64>,
    pub low_fmr: Option<f64>,
    pub high_fmr: Option<f64>,
    pub redfin_value: Option<f64>,
    pub zestimate: Option<f64>,
    pub expected_rent: Option<f64>,
}

/// Output of the normalizer: four ordered row collections. Sequence order
/// matches input record order; the loader depends on that for deterministic
/// identity assignment.
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub properties: Vec<PropertyRow>,
    pub hoa: Vec<HoaRow>,
    pub rehab: Vec<RehabRow>,
    pub valuations: Vec<ValuationRow>,
}
