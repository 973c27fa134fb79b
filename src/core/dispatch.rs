//! Type-erased request and output types for heterogeneous dispatch.
//!
//! The scheduler accepts requests for several detector variants in one call.
//! Inputs and outputs are enumerated types with pattern matching for
//! type-safe conversions, avoiding downcast on data paths.

use crate::core::errors::VisionError;
use crate::core::traits::DetectorKind;
use crate::detectors::barcode::BarcodeOptions;
use crate::detectors::custom::CustomOptions;
use crate::detectors::face::FaceOptions;
use crate::detectors::label::LabelOptions;
use crate::detectors::text::TextOptions;
use crate::domain::{BarcodeRecord, FaceRecord, LabelRecord, TensorData, TextBlock};

/// A single detector invocation request carrying variant-specific options.
#[derive(Debug, Clone)]
pub enum DetectionRequest {
    /// Barcode detection with the given options.
    Barcode(BarcodeOptions),
    /// Face detection with the given options.
    Face(FaceOptions),
    /// Label classification with the given options.
    Label(LabelOptions),
    /// Text detection and recognition with the given options.
    Text(TextOptions),
    /// Custom model run against caller-provided input tensor bytes.
    Custom {
        /// Registered model name to run.
        model: String,
        /// Run options.
        options: CustomOptions,
        /// Input tensor; read-only for the duration of the call.
        input: TensorData,
    },
}

impl DetectionRequest {
    /// Returns the detector variant this request targets.
    pub fn kind(&self) -> DetectorKind {
        match self {
            DetectionRequest::Barcode(_) => DetectorKind::Barcode,
            DetectionRequest::Face(_) => DetectorKind::Face,
            DetectionRequest::Label(_) => DetectorKind::Label,
            DetectionRequest::Text(_) => DetectorKind::Text,
            DetectionRequest::Custom { .. } => DetectorKind::CustomModel,
        }
    }
}

/// Type-erased output from a detector invocation.
#[derive(Debug, Clone)]
pub enum DynDetectionOutput {
    /// Barcode records
    Barcodes(Vec<BarcodeRecord>),
    /// Face records
    Faces(Vec<FaceRecord>),
    /// Label records
    Labels(Vec<LabelRecord>),
    /// Text blocks
    TextBlocks(Vec<TextBlock>),
    /// Custom model output tensor
    Tensor(TensorData),
}

/// Macro to generate conversion methods for DynDetectionOutput variants
macro_rules! impl_dyn_output_conversions {
    ($($variant:ident => $method:ident, $output_type:ty);* $(;)?) => {
        impl DynDetectionOutput {
            $(
                #[doc = concat!("Extracts ", stringify!($output_type), " if this is a ", stringify!($variant), " variant.")]
                pub fn $method(self) -> Result<$output_type, VisionError> {
                    match self {
                        Self::$variant(output) => Ok(output),
                        other => Err(VisionError::InvalidInput {
                            message: format!(
                                concat!("expected ", stringify!($variant), " output, got {}"),
                                other.kind().name()
                            ),
                        }),
                    }
                }
            )*
        }
    };
}

impl_dyn_output_conversions! {
    Barcodes => into_barcodes, Vec<BarcodeRecord>;
    Faces => into_faces, Vec<FaceRecord>;
    Labels => into_labels, Vec<LabelRecord>;
    TextBlocks => into_text_blocks, Vec<TextBlock>;
    Tensor => into_tensor, TensorData;
}

impl DynDetectionOutput {
    /// Returns the detector variant that produced this output.
    pub fn kind(&self) -> DetectorKind {
        match self {
            DynDetectionOutput::Barcodes(_) => DetectorKind::Barcode,
            DynDetectionOutput::Faces(_) => DetectorKind::Face,
            DynDetectionOutput::Labels(_) => DetectorKind::Label,
            DynDetectionOutput::TextBlocks(_) => DetectorKind::Text,
            DynDetectionOutput::Tensor(_) => DetectorKind::CustomModel,
        }
    }

    /// Returns the number of records in this output (1 for tensors).
    pub fn record_count(&self) -> usize {
        match self {
            DynDetectionOutput::Barcodes(v) => v.len(),
            DynDetectionOutput::Faces(v) => v.len(),
            DynDetectionOutput::Labels(v) => v.len(),
            DynDetectionOutput::TextBlocks(v) => v.len(),
            DynDetectionOutput::Tensor(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_kind_matches_variant() {
        assert_eq!(
            DetectionRequest::Face(FaceOptions::default()).kind(),
            DetectorKind::Face
        );
        assert_eq!(
            DetectionRequest::Label(LabelOptions::default()).kind(),
            DetectorKind::Label
        );
    }

    #[test]
    fn test_output_conversion_matches() {
        let output = DynDetectionOutput::Faces(vec![]);
        assert!(output.into_faces().is_ok());
    }

    #[test]
    fn test_output_conversion_mismatch_is_error() {
        let output = DynDetectionOutput::Faces(vec![]);
        let err = output.into_labels().unwrap_err();
        assert!(err.to_string().contains("expected Labels"));
    }
}
