//! Image and tensor processing building blocks shared by the detectors.

pub mod bitmap;
pub mod ctc;
pub mod geometry;
pub mod normalization;
pub mod resize;
pub mod topk;

pub use bitmap::{BitmapPostProcess, BitmapPostProcessConfig};
pub use ctc::SequenceDecoder;
pub use geometry::{BoundRect, Point, non_max_suppression};
pub use normalization::Normalizer;
pub use resize::{ResizeInfo, letterbox};
pub use topk::{Topk, TopkResult};
