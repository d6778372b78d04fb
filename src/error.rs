//! Error types for crc_degs

use thiserror::Error;

/// Main error type for the DEG pipeline
#[derive(Error, Debug)]
pub enum DegError {
    #[error("HTTP client unavailable: {reason}")]
    HttpClient { reason: String },

    #[error("Download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("Invalid expression matrix: {reason}")]
    InvalidExpressionMatrix { reason: String },

    #[error("Invalid annotation: {reason}")]
    InvalidAnnotation { reason: String },

    #[error("Invalid metadata: {reason}")]
    InvalidMetadata { reason: String },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: String, got: String },

    #[error("Section '{marker}' not found in {file}")]
    MissingSection { marker: String, file: String },

    #[error("Empty data: {reason}")]
    EmptyData { reason: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Plotting failed: {0}")]
    Plot(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, DegError>;
