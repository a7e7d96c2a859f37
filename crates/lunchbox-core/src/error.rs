use thiserror::Error;

/// Analyzer output that cannot be turned into a scan.
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("no item identified")]
    NoItem,

    #[error("freshness score {0} outside 1-10")]
    FreshnessOutOfRange(u8),
}

#[derive(Debug, Error)]
pub enum CarbonTableError {
    #[error("carbon table JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot read carbon table {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("invalid co2e_per_kg {value} for '{item}'")]
    InvalidFactor { item: String, value: f64 },

    #[error("empty item name at position {0}")]
    EmptyItem(usize),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
