//! Detector implementations for each variant.
//!
//! Every detector follows the same shape: a builder resolving its model from
//! the [`ModelRegistry`](crate::registry::ModelRegistry), serde options with
//! documented defaults and a passthrough `extra` slot, and a
//! preprocess → infer → postprocess pipeline producing typed records.

pub mod barcode;
pub mod custom;
pub mod face;
pub mod label;
pub mod text;

pub use barcode::{BarcodeDetector, BarcodeDetectorBuilder, BarcodeOptions};
pub use custom::{CustomModelDetector, CustomOptions};
pub use face::{FaceDetector, FaceDetectorBuilder, FaceOptions};
pub use label::{LabelDetector, LabelDetectorBuilder, LabelOptions};
pub use text::{TextDetector, TextDetectorBuilder, TextOptions};
