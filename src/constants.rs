/// Destination table names.
pub const PROPERTIES_TABLE: &str = "properties";
pub const HOA_TABLE: &str = "hoa";
pub const REHAB_TABLE: &str = "rehab_estimates";
pub const VALUATIONS_TABLE: &str = "valuations";

/// Keys of the embedded child sequences inside each raw property record.
pub const HOA_SEQUENCE: &str = "HOA";
pub const REHAB_SEQUENCE: &str = "Rehab";
pub const VALUATION_SEQUENCE: &str = "Valuation";

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
