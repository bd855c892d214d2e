//! Error types for cutmark

use thiserror::Error;

/// Main error type for cutmark operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    
    #[error("Invalid data: {0}")]
    InvalidData(String),
    
    #[error("Algorithm error: {0}")]
    Algorithm(String),
    
    #[error("Configuration error: {0}")]
    Config(String),
    
    #[error("Inference error: {0}")]
    Inference(String),
    
    #[error("Visualization error: {0}")]
    Visualization(String),
    
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Result type alias for cutmark operations
pub type Result<T> = std::result::Result<T, Error>;
