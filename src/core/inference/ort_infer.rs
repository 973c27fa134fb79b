//! Core ONNX Runtime inference engine with session pooling.

use super::session::apply_ort_config;
use super::{Tensor2D, Tensor3D, Tensor4D};
use crate::core::config::OrtSessionConfig;
use crate::core::constants::MAX_TENSOR_SIZE;
use crate::core::errors::{SimpleError, VisionError};
use ndarray::ArrayD;
use ort::logging::LogLevel;
use ort::session::Session;
use ort::value::{TensorRef, ValueType};
use std::path::Path;
use std::sync::Mutex;

/// A raw model output: shape plus flattened f32 data.
#[derive(Debug, Clone)]
pub struct RawOutput {
    /// Output tensor shape.
    pub shape: Vec<usize>,
    /// Flattened output data in row-major order.
    pub data: Vec<f32>,
}

/// ONNX Runtime inference engine for a single model.
///
/// Holds a pool of sessions checked out round-robin so concurrent callers do
/// not serialize on one session lock.
pub struct OrtInfer {
    sessions: Vec<Mutex<Session>>,
    next_idx: std::sync::atomic::AtomicUsize,
    input_name: String,
    output_name: Option<String>,
    model_path: std::path::PathBuf,
    model_name: String,
}

impl std::fmt::Debug for OrtInfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtInfer")
            .field("sessions", &self.sessions.len())
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("model_path", &self.model_path)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl OrtInfer {
    /// Creates an engine with default ONNX Runtime settings and one session.
    ///
    /// If `input_name` is None, the model's first declared input is used.
    pub fn new(
        model_path: impl AsRef<Path>,
        input_name: Option<&str>,
    ) -> Result<Self, VisionError> {
        Self::with_pool(model_path, input_name, 1, None)
    }

    /// Creates an engine with a session pool and optional session configuration.
    pub fn with_pool(
        model_path: impl AsRef<Path>,
        input_name: Option<&str>,
        pool_size: usize,
        ort_config: Option<&OrtSessionConfig>,
    ) -> Result<Self, VisionError> {
        let path = model_path.as_ref();
        let pool_size = pool_size.max(1);
        let mut sessions = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let builder = Session::builder()?;
            let builder = match ort_config {
                Some(cfg) => apply_ort_config(builder, cfg)?,
                None => builder.with_log_level(LogLevel::Error)?,
            };
            let session = builder.commit_from_file(path).map_err(|e| {
                VisionError::model_load_error(
                    path,
                    "failed to create ONNX session",
                    Some("check execution provider configuration and model file"),
                    Some(e),
                )
            })?;
            sessions.push(Mutex::new(session));
        }

        let model_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown_model")
            .to_string();

        let input_name = match input_name {
            Some(name) => name.to_string(),
            None => {
                let session = sessions[0]
                    .lock()
                    .map_err(|_| VisionError::invalid_input("failed to acquire session lock"))?;
                session
                    .inputs
                    .first()
                    .map(|i| i.name.clone())
                    .ok_or_else(|| {
                        VisionError::model_load_error(
                            path,
                            "model declares no inputs",
                            None,
                            None::<std::io::Error>,
                        )
                    })?
            }
        };

        Ok(OrtInfer {
            sessions,
            next_idx: std::sync::atomic::AtomicUsize::new(0),
            input_name,
            output_name: None,
            model_path: path.to_path_buf(),
            model_name,
        })
    }

    /// Pins the output tensor name instead of discovering it from the session.
    pub fn with_output_name(mut self, output_name: &str) -> Self {
        self.output_name = Some(output_name.to_string());
        self
    }

    /// Returns the model path associated with this engine.
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Returns the model name associated with this engine.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Attempts to retrieve the primary input tensor shape from the first
    /// session. Dynamic dimensions (e.g. -1) are returned as-is.
    pub fn primary_input_shape(&self) -> Option<Vec<i64>> {
        let session_mutex = self.sessions.first()?;
        let session_guard = session_mutex.lock().ok()?;
        let input = session_guard.inputs.first()?;
        match &input.input_type {
            ValueType::Tensor { shape, .. } => Some(shape.iter().copied().collect()),
            _ => None,
        }
    }

    fn get_output_name(&self) -> Result<String, VisionError> {
        if let Some(ref name) = self.output_name {
            Ok(name.clone())
        } else {
            let session = self.sessions[0]
                .lock()
                .map_err(|_| VisionError::invalid_input("failed to acquire session lock"))?;
            session
                .outputs
                .first()
                .map(|o| o.name.clone())
                .ok_or_else(|| {
                    VisionError::invalid_input(
                        "no outputs available in session - model may be invalid or corrupted",
                    )
                })
        }
    }

    fn checkout(&self) -> usize {
        self.next_idx
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            % self.sessions.len()
    }

    fn run_inference_with_processor<T>(
        &self,
        shape: &[usize],
        data: &[f32],
        processor: impl FnOnce(&[i64], &[f32]) -> Result<T, VisionError>,
    ) -> Result<T, VisionError> {
        let element_count: usize = shape.iter().product();
        if element_count != data.len() {
            return Err(VisionError::validation_error(
                &self.model_name,
                "input tensor",
                &format!("{element_count} elements for shape {shape:?}"),
                &data.len().to_string(),
            ));
        }
        if element_count == 0 || element_count > MAX_TENSOR_SIZE {
            return Err(VisionError::invalid_input(format!(
                "input tensor element count {element_count} outside (0, {MAX_TENSOR_SIZE}]"
            )));
        }

        let output_name = self.get_output_name()?;
        let array = ArrayD::from_shape_vec(shape.to_vec(), data.to_vec())?;
        let input_tensor = TensorRef::from_array_view(array.view()).map_err(|e| {
            VisionError::inference_error(
                &self.model_name,
                &format!("failed to convert input tensor with shape {shape:?}"),
                e,
            )
        })?;
        let inputs = ort::inputs![self.input_name.as_str() => input_tensor];

        let idx = self.checkout();
        let mut session_guard = self.sessions[idx].lock().map_err(|_| {
            VisionError::inference_error(
                &self.model_name,
                &format!(
                    "failed to acquire session lock for session {}/{}",
                    idx,
                    self.sessions.len()
                ),
                SimpleError::new("session lock acquisition failed"),
            )
        })?;

        let outputs = session_guard.run(inputs).map_err(|e| {
            VisionError::inference_error(
                &self.model_name,
                &format!(
                    "ONNX Runtime inference failed with input '{}' -> output '{}'",
                    self.input_name, output_name
                ),
                e,
            )
        })?;

        let (output_shape, output_data) = outputs[output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                VisionError::inference_error(
                    &self.model_name,
                    &format!("failed to extract output tensor '{output_name}' as f32"),
                    e,
                )
            })?;

        processor(output_shape, output_data)
    }

    /// Runs inference expecting a 4D output.
    pub fn infer_4d(&self, x: &Tensor4D) -> Result<Tensor4D, VisionError> {
        let data = Self::contiguous(x)?;
        self.run_inference_with_processor(x.shape(), data, |output_shape, output_data| {
            let dims = Self::usize_shape::<4>(output_shape)?;
            Ok(Tensor4D::from_shape_vec(dims, output_data.to_vec())?)
        })
    }

    /// Runs inference expecting a 3D output.
    pub fn infer_3d(&self, x: &Tensor4D) -> Result<Tensor3D, VisionError> {
        let data = Self::contiguous(x)?;
        self.run_inference_with_processor(x.shape(), data, |output_shape, output_data| {
            let dims = Self::usize_shape::<3>(output_shape)?;
            Ok(Tensor3D::from_shape_vec(dims, output_data.to_vec())?)
        })
    }

    /// Runs inference expecting a 2D output.
    pub fn infer_2d(&self, x: &Tensor4D) -> Result<Tensor2D, VisionError> {
        let data = Self::contiguous(x)?;
        self.run_inference_with_processor(x.shape(), data, |output_shape, output_data| {
            let dims = Self::usize_shape::<2>(output_shape)?;
            Ok(Tensor2D::from_shape_vec(dims, output_data.to_vec())?)
        })
    }

    /// Runs inference on a raw-shaped input, returning the first output.
    ///
    /// Used by the custom-model path where shapes are caller-declared.
    pub fn infer_dyn(&self, shape: &[usize], data: &[f32]) -> Result<RawOutput, VisionError> {
        self.run_inference_with_processor(shape, data, |output_shape, output_data| {
            Ok(RawOutput {
                shape: output_shape.iter().map(|&d| d.max(0) as usize).collect(),
                data: output_data.to_vec(),
            })
        })
    }

    /// Runs inference returning every model output in declaration order.
    ///
    /// Multi-head detection models (e.g. anchor-based face detectors) produce
    /// one tensor per stride and head; this entry point surfaces them all.
    pub fn infer_all(&self, x: &Tensor4D) -> Result<Vec<RawOutput>, VisionError> {
        let input_shape = x.shape().to_vec();
        let input_tensor = TensorRef::from_array_view(x.view()).map_err(|e| {
            VisionError::inference_error(
                &self.model_name,
                &format!("failed to convert input tensor with shape {input_shape:?}"),
                e,
            )
        })?;
        let inputs = ort::inputs![self.input_name.as_str() => input_tensor];

        let idx = self.checkout();
        let mut session_guard = self.sessions[idx].lock().map_err(|_| {
            VisionError::inference_error(
                &self.model_name,
                "failed to acquire session lock",
                SimpleError::new("session lock acquisition failed"),
            )
        })?;

        let output_names: Vec<String> = session_guard
            .outputs
            .iter()
            .map(|o| o.name.clone())
            .collect();

        let outputs = session_guard.run(inputs).map_err(|e| {
            VisionError::inference_error(
                &self.model_name,
                &format!("ONNX Runtime inference failed with input shape {input_shape:?}"),
                e,
            )
        })?;

        let mut raw = Vec::with_capacity(output_names.len());
        for name in &output_names {
            let (shape, data) = outputs[name.as_str()]
                .try_extract_tensor::<f32>()
                .map_err(|e| {
                    VisionError::inference_error(
                        &self.model_name,
                        &format!("failed to extract output tensor '{name}' as f32"),
                        e,
                    )
                })?;
            raw.push(RawOutput {
                shape: shape.iter().map(|&d| d.max(0) as usize).collect(),
                data: data.to_vec(),
            });
        }
        Ok(raw)
    }

    fn contiguous(x: &Tensor4D) -> Result<&[f32], VisionError> {
        x.as_slice().ok_or_else(|| {
            VisionError::invalid_input("input tensor must be in contiguous standard layout")
        })
    }

    fn usize_shape<const N: usize>(shape: &[i64]) -> Result<[usize; N], VisionError> {
        if shape.len() != N {
            return Err(VisionError::invalid_input(format!(
                "expected {N}D output, got shape {shape:?}"
            )));
        }
        let mut dims = [0usize; N];
        for (i, &d) in shape.iter().enumerate() {
            if d < 0 {
                return Err(VisionError::invalid_input(format!(
                    "output shape {shape:?} contains a negative dimension"
                )));
            }
            dims[i] = d as usize;
        }
        Ok(dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usize_shape_accepts_matching_rank() {
        let dims = OrtInfer::usize_shape::<3>(&[1, 5, 97]).unwrap();
        assert_eq!(dims, [1, 5, 97]);
    }

    #[test]
    fn test_usize_shape_rejects_rank_mismatch() {
        assert!(OrtInfer::usize_shape::<4>(&[1, 5, 97]).is_err());
    }

    #[test]
    fn test_usize_shape_rejects_negative_dims() {
        assert!(OrtInfer::usize_shape::<3>(&[1, -1, 97]).is_err());
    }
}
