//! Domain types: image buffers and detection records.

pub mod detections;
pub mod image;

pub use detections::{
    BarcodeFormat, BarcodeRecord, FaceRecord, LabelRecord, TensorData, TensorDtype, TextBlock,
};
pub use image::{ImageBuffer, PixelFormat};
