//! ONNX Runtime inference engine wrappers.
//!
//! [`OrtInfer`] owns a pool of ONNX Runtime sessions for one model and
//! exposes typed tensor entry points used by the detector implementations.

mod ort_infer;
mod session;

pub use ort_infer::{OrtInfer, RawOutput};
pub use session::load_session;

/// A 2D tensor of f32 values.
pub type Tensor2D = ndarray::Array2<f32>;
/// A 3D tensor of f32 values.
pub type Tensor3D = ndarray::Array3<f32>;
/// A 4D tensor of f32 values (NCHW batches).
pub type Tensor4D = ndarray::Array4<f32>;
