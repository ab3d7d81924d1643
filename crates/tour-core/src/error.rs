use thiserror::Error;

#[derive(Debug, Error)]
pub enum TourError {
    #[error("storage unavailable")]
    StorageUnavailable,

    #[error("storage quota exceeded writing '{key}' ({needed} bytes, {limit} allowed)")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid selector '{0}'")]
    InvalidSelector(String),

    #[error("invalid url pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("tour not found: {0}")]
    TourNotFound(String),

    #[error("unknown theme: {0}")]
    UnknownTheme(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TourError>;
