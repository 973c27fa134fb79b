//! Typed detection records produced by the detector variants.
//!
//! Each variant has its own record type grouping related fields together
//! instead of parallel vectors. Records are plain data, serializable, and
//! carry coordinates in the source image's pixel space.

use crate::core::errors::{VisionError, VisionResult};
use crate::processors::geometry::BoundRect;
use serde::{Deserialize, Serialize};

/// A detected face.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceRecord {
    /// Bounding region in source image coordinates.
    pub region: BoundRect,
    /// Detection confidence in [0, 1].
    pub confidence: f32,
    /// Five facial landmarks (eyes, nose tip, mouth corners), if requested.
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// A whole-image classification label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelRecord {
    /// Class index in the model's output space.
    pub class_id: usize,
    /// Human-readable class name, if a label table was configured.
    pub name: Option<String>,
    /// Classification confidence in [0, 1].
    pub confidence: f32,
}

/// Barcode symbologies recognized by the barcode detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarcodeFormat {
    /// Aztec 2D code
    Aztec,
    /// Code 128 1D code
    Code128,
    /// Code 39 1D code
    Code39,
    /// Data Matrix 2D code
    DataMatrix,
    /// EAN-13 1D code
    Ean13,
    /// EAN-8 1D code
    Ean8,
    /// PDF417 2D code
    Pdf417,
    /// QR 2D code
    QrCode,
    /// UPC-A 1D code
    UpcA,
    /// UPC-E 1D code
    UpcE,
    /// Detected but unclassified symbology
    Unknown,
}

impl BarcodeFormat {
    /// Returns a stable string name for the symbology.
    pub fn name(&self) -> &'static str {
        match self {
            BarcodeFormat::Aztec => "aztec",
            BarcodeFormat::Code128 => "code128",
            BarcodeFormat::Code39 => "code39",
            BarcodeFormat::DataMatrix => "data_matrix",
            BarcodeFormat::Ean13 => "ean13",
            BarcodeFormat::Ean8 => "ean8",
            BarcodeFormat::Pdf417 => "pdf417",
            BarcodeFormat::QrCode => "qr_code",
            BarcodeFormat::UpcA => "upca",
            BarcodeFormat::UpcE => "upce",
            BarcodeFormat::Unknown => "unknown",
        }
    }

    /// Maps a symbology-head class index to a format.
    ///
    /// The class order matches the symbology head of the barcode model.
    pub fn from_class_id(class_id: usize) -> Self {
        match class_id {
            0 => BarcodeFormat::Aztec,
            1 => BarcodeFormat::Code128,
            2 => BarcodeFormat::Code39,
            3 => BarcodeFormat::DataMatrix,
            4 => BarcodeFormat::Ean13,
            5 => BarcodeFormat::Ean8,
            6 => BarcodeFormat::Pdf417,
            7 => BarcodeFormat::QrCode,
            8 => BarcodeFormat::UpcA,
            9 => BarcodeFormat::UpcE,
            _ => BarcodeFormat::Unknown,
        }
    }
}

/// A detected and decoded barcode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarcodeRecord {
    /// Bounding region in source image coordinates.
    pub region: BoundRect,
    /// Recognized symbology.
    pub format: BarcodeFormat,
    /// Decoded payload string.
    pub value: String,
    /// Detection confidence in [0, 1].
    pub confidence: f32,
}

/// A detected text region with optional recognized content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBlock {
    /// Bounding region in source image coordinates.
    pub region: BoundRect,
    /// Recognized text. None when recognition was disabled or produced
    /// nothing above the confidence floor.
    pub text: Option<String>,
    /// Recognition confidence, present only when `text` is.
    pub confidence: Option<f32>,
}

impl TextBlock {
    /// Creates a block with detection results only.
    pub fn new(region: BoundRect) -> Self {
        Self {
            region,
            text: None,
            confidence: None,
        }
    }

    /// Creates a block with detection and recognition results.
    pub fn with_text(region: BoundRect, text: String, confidence: f32) -> Self {
        Self {
            region,
            text: Some(text),
            confidence: Some(confidence),
        }
    }

    /// Returns true if this block has recognized text.
    pub fn has_text(&self) -> bool {
        self.text.is_some()
    }
}

/// Element type of a [`TensorData`] buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TensorDtype {
    /// 32-bit float elements.
    F32,
    /// Unsigned byte elements.
    U8,
}

impl TensorDtype {
    /// Returns the size of one element in bytes.
    pub fn element_size(&self) -> usize {
        match self {
            TensorDtype::F32 => 4,
            TensorDtype::U8 => 1,
        }
    }
}

/// A raw tensor exchanged with custom models.
///
/// The byte buffer is caller-provided on input and read-only for the
/// duration of a run; it is never retained after the call returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensorData {
    /// Element type.
    pub dtype: TensorDtype,
    /// Tensor shape, row-major.
    pub shape: Vec<usize>,
    /// Raw element bytes, little-endian for multi-byte types.
    pub bytes: Vec<u8>,
}

impl TensorData {
    /// Creates a tensor from f32 values.
    pub fn from_f32(shape: Vec<usize>, values: &[f32]) -> Self {
        let mut bytes = Vec::with_capacity(values.len() * 4);
        for v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        Self {
            dtype: TensorDtype::F32,
            shape,
            bytes,
        }
    }

    /// Returns the element count implied by the shape.
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Validates that the byte buffer is non-empty and consistent with the
    /// declared shape and dtype.
    pub fn validate(&self) -> VisionResult<()> {
        if self.bytes.is_empty() {
            return Err(VisionError::invalid_input(
                "input tensor bytes must not be empty",
            ));
        }
        if self.shape.is_empty() {
            return Err(VisionError::invalid_input("tensor shape must not be empty"));
        }
        let expected = self.element_count() * self.dtype.element_size();
        if self.bytes.len() != expected {
            return Err(VisionError::validation_error(
                "TensorData",
                "byte length",
                &format!("{expected} for shape {:?}", self.shape),
                &self.bytes.len().to_string(),
            ));
        }
        Ok(())
    }

    /// Decodes the byte buffer into f32 values.
    ///
    /// `U8` buffers widen elementwise; `F32` buffers reinterpret.
    pub fn to_f32_vec(&self) -> VisionResult<Vec<f32>> {
        self.validate()?;
        match self.dtype {
            TensorDtype::F32 => Ok(self
                .bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()),
            TensorDtype::U8 => Ok(self.bytes.iter().map(|&b| b as f32).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_rejects_empty_bytes() {
        let tensor = TensorData {
            dtype: TensorDtype::F32,
            shape: vec![1, 4],
            bytes: vec![],
        };
        assert!(tensor.validate().is_err());
    }

    #[test]
    fn test_tensor_rejects_shape_mismatch() {
        let tensor = TensorData {
            dtype: TensorDtype::F32,
            shape: vec![1, 4],
            bytes: vec![0u8; 12],
        };
        let err = tensor.validate().unwrap_err();
        assert!(err.to_string().contains("byte length"));
    }

    #[test]
    fn test_tensor_f32_round_trip() {
        let values = [1.0f32, -2.5, 0.0];
        let tensor = TensorData::from_f32(vec![3], &values);
        assert!(tensor.validate().is_ok());
        assert_eq!(tensor.to_f32_vec().unwrap(), values);
    }

    #[test]
    fn test_tensor_u8_widens() {
        let tensor = TensorData {
            dtype: TensorDtype::U8,
            shape: vec![2],
            bytes: vec![0, 255],
        };
        assert_eq!(tensor.to_f32_vec().unwrap(), vec![0.0, 255.0]);
    }

    #[test]
    fn test_barcode_format_class_ids() {
        assert_eq!(BarcodeFormat::from_class_id(7), BarcodeFormat::QrCode);
        assert_eq!(BarcodeFormat::from_class_id(99), BarcodeFormat::Unknown);
    }
}
