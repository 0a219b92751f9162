use crate::neural_network::parameter::ParamKey;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Error types that can occur during model operations
///
/// # Variants
///
/// - `InputValidationError` - The input data or configuration does not meet the expected format, shape or range
/// - `ProcessingError` - Something went wrong while computing (e.g. an array could not be reshaped)
/// - `DuplicateParameter` - A parameter key was inserted twice into the same registry
/// - `MissingParameter` - A restore operation could not find a parameter the architecture needs
/// - `UnexpectedParameter` - A restore operation was handed a parameter the architecture does not have
/// - `NumericalError` - A cost or regularizer evaluated to NaN/infinity or could not be computed
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    InputValidationError(String),
    ProcessingError(String),
    DuplicateParameter(ParamKey),
    MissingParameter(ParamKey),
    UnexpectedParameter(String),
    NumericalError(String),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::InputValidationError(msg) => write!(f, "Input validation error: {}", msg),
            ModelError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
            ModelError::DuplicateParameter(key) => {
                write!(f, "Parameter key conflict: `{}` is already registered", key)
            }
            ModelError::MissingParameter(key) => {
                write!(f, "Parameter `{}` is missing from the parameter set", key)
            }
            ModelError::UnexpectedParameter(name) => write!(
                f,
                "Parameter `{}` does not belong to this model architecture",
                name
            ),
            ModelError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
        }
    }
}

/// Implements the standard error trait for ModelError
impl std::error::Error for ModelError {}

/// Input/Output error types that can occur during checkpoint, vocabulary and dataset file operations
///
/// # Variants
///
/// - `StdIoError` - Wraps standard I/O errors from file system operations (reading, writing, file access)
/// - `JsonError` - Wraps JSON serialization/deserialization errors
#[derive(Debug)]
pub enum IoError {
    StdIoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl IoError {
    pub fn load_in_buf_reader<P: AsRef<Path>>(path: P) -> Result<BufReader<File>, IoError> {
        let file = File::open(path).map_err(IoError::StdIoError)?;
        Ok(BufReader::new(file))
    }

    pub fn create_buf_writer<P: AsRef<Path>>(path: P) -> Result<BufWriter<File>, IoError> {
        let file = File::create(path).map_err(IoError::StdIoError)?;
        Ok(BufWriter::new(file))
    }
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoError::StdIoError(e) => write!(f, "IO error: {}", e),
            IoError::JsonError(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IoError::StdIoError(e) => Some(e),
            IoError::JsonError(e) => Some(e),
        }
    }
}

/// Error raised by operations that both touch the file system and run the model,
/// such as the training loop or restoring a transliterator from a checkpoint.
///
/// # Variants
///
/// - `Model` - A model, configuration or data validation failure
/// - `Io` - A file system or (de)serialization failure
#[derive(Debug)]
pub enum PipelineError {
    Model(ModelError),
    Io(IoError),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Model(e) => write!(f, "{}", e),
            PipelineError::Io(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Model(e) => Some(e),
            PipelineError::Io(e) => Some(e),
        }
    }
}

impl From<ModelError> for PipelineError {
    fn from(e: ModelError) -> Self {
        PipelineError::Model(e)
    }
}

impl From<IoError> for PipelineError {
    fn from(e: IoError) -> Self {
        PipelineError::Io(e)
    }
}
