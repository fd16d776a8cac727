use thiserror::Error;

/// Pipeline stage a failure is attributed to. Each stage maps to its own
/// process exit code so schedulers can tell failures apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Extract,
    Transform,
    Connect,
    Load,
}

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("transform failed: {0}")]
    Transform(String),

    #[error("database connection failed: {0}")]
    Connection(#[source] rusqlite::Error),

    #[error("load failed for table '{table}': {source}")]
    Load {
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV deserialization failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),
}

impl EtlError {
    /// Which stage this error halts the run at. File and parse errors can
    /// only arise while reading inputs, so they count as extraction.
    pub fn stage(&self) -> Stage {
        match self {
            EtlError::Config(_) | EtlError::Toml(_) => Stage::Config,
            EtlError::Extraction(_) | EtlError::Io(_) | EtlError::Json(_) | EtlError::Csv(_) => {
                Stage::Extract
            }
            EtlError::Transform(_) => Stage::Transform,
            EtlError::Connection(_) => Stage::Connect,
            EtlError::Load { .. } => Stage::Load,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
