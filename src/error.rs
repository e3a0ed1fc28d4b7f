use std::path::PathBuf;
use thiserror::Error;

/// The main error type for boxlist operations.
#[derive(Debug, Error)]
pub enum BoxListError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Field '{name}' has length {actual}, expected {expected} (one entry per box)")]
    ShapeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Missing required field '{0}'")]
    MissingField(String),

    #[error("Field '{name}' has the wrong kind: expected {expected}, found {found}")]
    FieldType {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Unsupported box format: {0}")]
    UnsupportedFormat(String),

    #[error("Cannot concatenate box lists with different fields: {left:?} vs {right:?}")]
    KeySetMismatch {
        left: Vec<String>,
        right: Vec<String>,
    },

    #[error("Index {index} is out of bounds for a box list of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Image size must be non-negative, got height={height} width={width}")]
    InvalidImageSize { height: f64, width: f64 },

    #[error("IoU threshold must be in (0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("Detector failed: {0}")]
    Detector(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Evaluator failed: {0}")]
    Evaluator(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Record JSON parsed from or written to memory, so there is no path.
    #[error("Invalid detection record JSON: {0}")]
    RecordJson(#[source] serde_json::Error),

    #[error("Failed to parse detection records from {path}: {source}")]
    RecordJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write detection records to {path}: {source}")]
    RecordJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write COCO JSON to {path}: {source}")]
    CocoJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
