//! # Percept
//!
//! A Rust library for on-device vision inference. Percept runs ONNX detection
//! models behind typed detector APIs and aggregates their results into a
//! uniform per-frame envelope.
//!
//! ## Features
//!
//! - Typed detectors: face, label, text, barcode, and generic tensor models
//! - Model registry with load-once semantics and LRU eviction
//! - Scheduler with parallel dispatch, timeouts, and backpressure
//! - Uniform result envelope with per-detector partial-failure reporting
//! - ONNX Runtime integration for fast inference
//!
//! ## Modules
//!
//! * [`core`] - Core traits, error handling, configuration, and inference
//! * [`domain`] - Domain types: image buffers and detection records
//! * [`detectors`] - Detector implementations for each variant
//! * [`registry`] - Model source registration and engine lifetime management
//! * [`scheduler`] - Multi-detector dispatch with timeouts and backpressure
//! * [`aggregate`] - Result envelope and error translation
//! * [`processors`] - Image and tensor processing building blocks
//! * [`utils`] - Utility functions for images and tensors
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use percept::prelude::*;
//! use percept::detectors::face::FaceDetectorBuilder;
//! use percept::registry::{ModelRegistry, ModelSource};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = ModelRegistry::with_capacity(4);
//! registry.register_source(
//!     "face-scrfd",
//!     ModelSource::file("models/scrfd_10g.onnx"),
//! )?;
//!
//! let detector = FaceDetectorBuilder::new()
//!     .model_name("face-scrfd")
//!     .build(&registry)?;
//!
//! let image = ImageBuffer::from_rgb(load_image(Path::new("photo.jpg"))?);
//! let faces = detector.detect(&image, &FaceOptions::default())?;
//! for face in &faces {
//!     println!("face at {:?} ({:.2})", face.region, face.confidence);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Dispatching several detectors over one frame
//!
//! ```rust,no_run
//! use percept::prelude::*;
//! use percept::scheduler::InferenceScheduler;
//!
//! # fn run(scheduler: InferenceScheduler, image: ImageBuffer) -> Result<(), VisionError> {
//! let analysis = scheduler.dispatch(
//!     &image,
//!     vec![
//!         DetectionRequest::Face(FaceOptions::default()),
//!         DetectionRequest::Label(LabelOptions::default()),
//!     ],
//! )?;
//! for outcome in analysis.outcomes() {
//!     println!("{}: {:?}", outcome.kind.name(), outcome.outcome);
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod core;
pub mod detectors;
pub mod domain;
pub mod processors;
pub mod registry;
pub mod scheduler;
pub mod utils;

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use crate::aggregate::{DetectorOutcome, FrameAnalysis, Outcome, PublicError};
    pub use crate::core::dispatch::{DetectionRequest, DynDetectionOutput};
    pub use crate::core::{Detector, DetectorKind, VisionError, VisionResult};
    pub use crate::detectors::barcode::BarcodeOptions;
    pub use crate::detectors::custom::CustomOptions;
    pub use crate::detectors::face::FaceOptions;
    pub use crate::detectors::label::LabelOptions;
    pub use crate::detectors::text::TextOptions;
    pub use crate::domain::{
        BarcodeFormat, BarcodeRecord, FaceRecord, ImageBuffer, LabelRecord, PixelFormat,
        TensorData, TensorDtype, TextBlock,
    };
    pub use crate::utils::load_image;
}
