//! Result envelope and error translation.
//!
//! Heterogeneous detector outputs are normalized into a [`FrameAnalysis`]:
//! one ordered outcome per request, each either a typed success payload or a
//! caller-visible [`PublicError`]. Error translation is the sole failure
//! path for every detector variant, so the conversion lives in one total
//! function instead of being duplicated per detector.

use crate::core::dispatch::DynDetectionOutput;
use crate::core::errors::VisionError;
use crate::core::traits::DetectorKind;
use serde::Serialize;
use std::time::Duration;

/// A caller-visible error payload: stable code plus human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicError {
    /// Stable machine-readable error code.
    pub code: &'static str,
    /// Human-readable message; never empty.
    pub message: String,
}

/// Translates an internal error into its caller-visible representation.
///
/// Total over [`VisionError`]: every variant maps to a stable code and a
/// non-empty message.
pub fn translate_error(error: &VisionError) -> PublicError {
    let code = match error {
        VisionError::ImageLoad(_) => "image-load",
        VisionError::Processing { .. } => "processing",
        VisionError::Inference { .. } => "inference",
        VisionError::ModelLoad { .. } => "model-load",
        VisionError::ModelUnavailable { .. } => "model-unavailable",
        VisionError::InvalidInput { .. } => "invalid-input",
        VisionError::ConfigError { .. } => "configuration",
        VisionError::ResourceLimit { .. } => "resource-limit",
        VisionError::Timeout { .. } => "timeout",
        VisionError::Session(_) => "session",
        VisionError::Tensor(_) => "tensor",
        VisionError::Io(_) => "io",
    };
    let mut message = error.to_string();
    if message.is_empty() {
        message = code.to_string();
    }
    PublicError { code, message }
}

/// Terminal outcome of one detector invocation.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The detector produced results.
    Success(DynDetectionOutput),
    /// The detector failed; the error has been translated.
    Failure(PublicError),
}

impl Outcome {
    /// Returns true for successful outcomes.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

/// One detector's outcome within a frame dispatch.
#[derive(Debug, Clone)]
pub struct DetectorOutcome {
    /// Which detector variant ran.
    pub kind: DetectorKind,
    /// Wall-clock time the invocation took (the configured timeout for
    /// timed-out invocations).
    pub elapsed: Duration,
    /// The terminal outcome.
    pub outcome: Outcome,
}

impl DetectorOutcome {
    /// Creates a success outcome.
    pub fn success(kind: DetectorKind, elapsed: Duration, output: DynDetectionOutput) -> Self {
        Self {
            kind,
            elapsed,
            outcome: Outcome::Success(output),
        }
    }

    /// Creates a failure outcome, translating the error.
    pub fn failure(kind: DetectorKind, elapsed: Duration, error: &VisionError) -> Self {
        Self {
            kind,
            elapsed,
            outcome: Outcome::Failure(translate_error(error)),
        }
    }
}

/// Uniform result envelope for one frame dispatch.
///
/// Outcomes preserve request order. Partial failure of one detector never
/// suppresses the others' results.
#[derive(Debug, Clone, Default)]
pub struct FrameAnalysis {
    outcomes: Vec<DetectorOutcome>,
}

impl FrameAnalysis {
    /// Builds an envelope from ordered outcomes.
    pub fn new(outcomes: Vec<DetectorOutcome>) -> Self {
        Self { outcomes }
    }

    /// Returns all outcomes in request order.
    pub fn outcomes(&self) -> &[DetectorOutcome] {
        &self.outcomes
    }

    /// Consumes the envelope, returning its outcomes.
    pub fn into_outcomes(self) -> Vec<DetectorOutcome> {
        self.outcomes
    }

    /// Returns the successful outcomes.
    pub fn succeeded(&self) -> impl Iterator<Item = &DetectorOutcome> {
        self.outcomes.iter().filter(|o| o.outcome.is_success())
    }

    /// Returns the failed outcomes.
    pub fn failed(&self) -> impl Iterator<Item = &DetectorOutcome> {
        self.outcomes.iter().filter(|o| !o.outcome.is_success())
    }

    /// Returns true when some but not all outcomes failed.
    pub fn is_partial(&self) -> bool {
        let failed = self.failed().count();
        failed > 0 && failed < self.outcomes.len()
    }

    /// Returns true when every outcome failed (and there was at least one).
    pub fn is_complete_failure(&self) -> bool {
        !self.outcomes.is_empty() && self.failed().count() == self.outcomes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn every_error_variant() -> Vec<VisionError> {
        vec![
            VisionError::ImageLoad(image::ImageError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "missing",
            ))),
            VisionError::post_processing(
                "region extraction",
                std::io::Error::new(std::io::ErrorKind::InvalidData, "bad map"),
            ),
            VisionError::inference_error(
                "scrfd",
                "forward pass",
                std::io::Error::other("boom"),
            ),
            VisionError::model_load_error(
                Path::new("/m.onnx"),
                "cannot open",
                None,
                None::<std::io::Error>,
            ),
            VisionError::model_unavailable("cloud-label", "not downloaded"),
            VisionError::invalid_input("empty buffer"),
            VisionError::config_error("bad threshold"),
            VisionError::resource_limit_error("in_flight", 4, 10),
            VisionError::timeout("detect", 5000),
            VisionError::Tensor(ndarray::ShapeError::from_kind(
                ndarray::ErrorKind::IncompatibleShape,
            )),
            VisionError::Io(std::io::Error::other("io")),
        ]
    }

    #[test]
    fn test_translation_is_total_with_non_empty_messages() {
        for error in every_error_variant() {
            let public = translate_error(&error);
            assert!(!public.code.is_empty(), "empty code for {error:?}");
            assert!(!public.message.is_empty(), "empty message for {error:?}");
        }
    }

    #[test]
    fn test_distinct_codes_for_key_variants() {
        assert_eq!(
            translate_error(&VisionError::invalid_input("x")).code,
            "invalid-input"
        );
        assert_eq!(translate_error(&VisionError::timeout("d", 1)).code, "timeout");
        assert_eq!(
            translate_error(&VisionError::model_unavailable("m", "r")).code,
            "model-unavailable"
        );
    }

    #[test]
    fn test_partial_failure_accounting() {
        let analysis = FrameAnalysis::new(vec![
            DetectorOutcome::success(
                DetectorKind::Face,
                Duration::from_millis(5),
                DynDetectionOutput::Faces(vec![]),
            ),
            DetectorOutcome::failure(
                DetectorKind::Label,
                Duration::from_millis(3),
                &VisionError::invalid_input("x"),
            ),
        ]);
        assert!(analysis.is_partial());
        assert!(!analysis.is_complete_failure());
        assert_eq!(analysis.succeeded().count(), 1);
        assert_eq!(analysis.failed().count(), 1);
    }

    #[test]
    fn test_complete_failure() {
        let analysis = FrameAnalysis::new(vec![DetectorOutcome::failure(
            DetectorKind::Text,
            Duration::ZERO,
            &VisionError::config_error("x"),
        )]);
        assert!(!analysis.is_partial());
        assert!(analysis.is_complete_failure());
    }

    #[test]
    fn test_empty_envelope_is_neither_partial_nor_failed() {
        let analysis = FrameAnalysis::default();
        assert!(!analysis.is_partial());
        assert!(!analysis.is_complete_failure());
    }
}
