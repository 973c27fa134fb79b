//! Configuration types for sessions and scheduling.

pub mod onnx;
pub mod parallel;

pub use onnx::{OrtExecutionProvider, OrtGraphOptimizationLevel, OrtSessionConfig};
pub use parallel::ParallelPolicy;
