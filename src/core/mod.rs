//! Core functionality for the vision inference library.
//!
//! This module contains the foundational pieces every other module builds on:
//! error types, configuration, the detector capability trait, the type-erased
//! dispatch layer, and the ONNX Runtime inference wrapper.

pub mod config;
pub mod constants;
pub mod dispatch;
pub mod errors;
pub mod inference;
pub mod traits;
pub mod validation;

pub use errors::{ProcessingStage, VisionError, VisionResult};
pub use inference::{Tensor2D, Tensor3D, Tensor4D};
pub use traits::{Detector, DetectorKind};
pub use validation::{
    validate_finite, validate_non_empty, validate_positive, validate_range,
};
