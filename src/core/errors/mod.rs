//! Error types for the vision inference library.
//!
//! This module provides the error handling system shared by every detector
//! variant: a single crate-wide error enum, a processing-stage discriminant,
//! and helper constructors for creating well-structured errors with
//! appropriate context and error chaining.
//!
//! # Usage
//!
//! ```rust
//! use percept::core::errors::VisionError;
//!
//! // Create a processing error with context
//! let error = VisionError::post_processing(
//!     "failed to extract regions from probability map",
//!     std::io::Error::new(std::io::ErrorKind::InvalidData, "empty map"),
//! );
//!
//! // Create a configuration error
//! let config_error = VisionError::config_error("missing model name");
//! ```

pub mod constructors;

use thiserror::Error;

/// Convenient result alias for vision operations.
pub type VisionResult<T> = Result<T, VisionError>;

/// Identifies the stage of processing in which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Error occurred while preparing model input.
    Preprocessing,
    /// Error occurred during image normalization.
    Normalization,
    /// Error occurred during image resizing.
    Resize,
    /// Error occurred while converting model output into records.
    PostProcessing,
    /// Error occurred while decoding a sequence head.
    Decode,
    /// Generic processing error.
    Generic,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Preprocessing => write!(f, "preprocessing"),
            ProcessingStage::Normalization => write!(f, "normalization"),
            ProcessingStage::Resize => write!(f, "resize"),
            ProcessingStage::PostProcessing => write!(f, "post-processing"),
            ProcessingStage::Decode => write!(f, "decode"),
            ProcessingStage::Generic => write!(f, "processing"),
        }
    }
}

/// Errors that can occur in the vision inference library.
#[derive(Error, Debug)]
pub enum VisionError {
    /// Error occurred while loading an image from disk.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// Error occurred during a processing stage.
    #[error("{stage} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        stage: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error occurred while running a model.
    #[error("inference with model '{model_name}' failed: {context}")]
    Inference {
        /// Name of the model that failed.
        model_name: String,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error occurred while loading a model file.
    #[error("model load from '{path}' failed: {context}")]
    ModelLoad {
        /// Path the load was attempted from.
        path: String,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A model name could not be resolved to loadable bytes.
    #[error("model '{name}' unavailable: {reason}")]
    ModelUnavailable {
        /// The registered model name.
        name: String,
        /// Why the model cannot be loaded right now.
        reason: String,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// A scheduling or memory limit was exceeded.
    #[error("resource limit exceeded for {resource}: limit {limit}, requested {requested}")]
    ResourceLimit {
        /// The limited resource.
        resource: String,
        /// The configured limit.
        limit: usize,
        /// The amount that was requested.
        requested: usize,
    },

    /// An operation did not complete within its deadline.
    #[error("{operation} timed out after {timeout_ms} ms")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The deadline in milliseconds.
        timeout_ms: u64,
    },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor operations.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

/// A minimal string-only error for wrapping plain messages as error sources.
#[derive(Debug)]
pub struct SimpleError {
    message: String,
}

impl SimpleError {
    /// Creates a new SimpleError with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SimpleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SimpleError {}
