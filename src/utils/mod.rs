//! Utility functions for images and tensors.

pub mod image;
pub mod tensor;
pub mod visualization;

pub use image::{dynamic_to_rgb, load_image, load_images};
pub use tensor::argmax;
pub use visualization::{OverlayConfig, draw_regions};
