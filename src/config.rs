use crate::error::{EtlError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub input: InputConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub load: LoadConfig,
}

#[derive(Debug, Deserialize)]
pub struct InputConfig {
    /// JSON document holding the batch of denormalized property records.
    pub batch_path: PathBuf,
    /// CSV table with columns: field_name, table, data_type, required.
    pub field_config_path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Default)]
pub struct LoadConfig {
    #[serde(default)]
    pub commit_mode: CommitMode,
}

/// Transaction scope for the four table inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitMode {
    /// Each table commits on its own; a later failure keeps earlier tables.
    #[default]
    PerTable,
    /// One transaction spans all four tables; any failure rolls back everything.
    AllOrNothing,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let toml = r#"
            [input]
            batch_path = "data/property_batch.json"
            field_config_path = "data/field_config.csv"

            [database]
            path = "data/home.db"

            [load]
            commit_mode = "all-or-nothing"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.load.commit_mode, CommitMode::AllOrNothing);
        assert_eq!(config.database.path, PathBuf::from("data/home.db"));
    }

    #[test]
    fn commit_mode_defaults_to_per_table() {
        let toml = r#"
            [input]
            batch_path = "batch.json"
            field_config_path = "fields.csv"

            [database]
            path = "home.db"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.load.commit_mode, CommitMode::PerTable);
    }
}
