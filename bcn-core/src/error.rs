/// Error types for the rainfall libraries
use thiserror::Error;

/// Main error type for loading and annotating rainfall data
#[derive(Error, Debug)]
pub enum RainfallError {
    /// HTTP request failed
    #[cfg(feature = "api")]
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Failed to parse CSV data
    #[error("Failed to parse CSV: {0}")]
    CsvParse(#[from] csv::Error),

    /// Failed to read the dataset
    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    /// The raw table does not have the expected shape or content
    #[error("Invalid data format: {0}")]
    DataFormat(String),

    /// Not enough years to run a smoothing filter
    #[error("Series too short (needed: {needed}, found: {found})")]
    SeriesTooShort { needed: usize, found: usize },

    /// Cannot build the requested number of clusters
    #[error("Cannot compute {requested} clusters over {rows} rows")]
    InvalidClusterCount { requested: usize, rows: usize },
}

/// Type alias for Results using RainfallError
pub type Result<T> = std::result::Result<T, RainfallError>;
