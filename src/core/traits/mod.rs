//! The detector capability trait and variant identifiers.
//!
//! A [`Detector`] consumes an [`ImageBuffer`](crate::domain::ImageBuffer)
//! plus typed options and produces typed detection results. Each call returns
//! exactly one terminal outcome as a `Result`; there is no callback layer.

use crate::core::errors::VisionResult;
use crate::domain::ImageBuffer;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Identifies a detector variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectorKind {
    /// Barcode detection and payload decoding
    Barcode,
    /// Face detection with optional landmarks
    Face,
    /// Whole-image label classification
    Label,
    /// Text detection and recognition
    Text,
    /// Generic tensor-in/tensor-out custom model
    CustomModel,
}

impl DetectorKind {
    /// Returns a stable string identifier for the variant.
    pub fn name(&self) -> &'static str {
        match self {
            DetectorKind::Barcode => "barcode",
            DetectorKind::Face => "face",
            DetectorKind::Label => "label",
            DetectorKind::Text => "text",
            DetectorKind::CustomModel => "custom_model",
        }
    }
}

impl std::fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Core trait for detector variants.
///
/// Implementations are stateless across calls: any model caching lives in the
/// registry, and options arrive per invocation. `detect` must deliver exactly
/// one of success or error for every call.
pub trait Detector: Send + Sync + Debug {
    /// Options type for this detector, with documented defaults.
    type Options: Default + Clone + Debug;

    /// Typed output produced on success.
    type Output: Send + Sync + Debug + Clone;

    /// Returns the variant identifier.
    fn kind(&self) -> DetectorKind;

    /// Runs detection on the given image with the given options.
    fn detect(&self, image: &ImageBuffer, options: &Self::Options)
    -> VisionResult<Self::Output>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_are_stable() {
        assert_eq!(DetectorKind::Barcode.name(), "barcode");
        assert_eq!(DetectorKind::Face.name(), "face");
        assert_eq!(DetectorKind::Label.name(), "label");
        assert_eq!(DetectorKind::Text.name(), "text");
        assert_eq!(DetectorKind::CustomModel.name(), "custom_model");
    }

    #[test]
    fn test_kind_serde_round_trip() {
        let json = serde_json::to_string(&DetectorKind::Face).unwrap();
        let back: DetectorKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DetectorKind::Face);
    }
}
