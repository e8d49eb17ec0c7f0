use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunlensError {
    #[error("Dataset file not found: {0}")]
    DatasetNotFound(PathBuf),

    #[error("Invalid dataset format: {0}")]
    InvalidDataset(String),

    #[error("Record is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("No {kind} found matching `{id}`")]
    NotFound { kind: &'static str, id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, RunlensError>;
