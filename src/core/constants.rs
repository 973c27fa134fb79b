//! Constants used throughout the vision inference library.
//!
//! Default values for preprocessing sizes, thresholds, scheduling limits,
//! and tensor size guards shared by the detector implementations.

/// Default square input size for face detection models (SCRFD family).
pub const DEFAULT_FACE_INPUT_SIZE: u32 = 640;

/// Default square input size for barcode detection models.
pub const DEFAULT_BARCODE_INPUT_SIZE: u32 = 640;

/// Default input size (height, width) for classification models.
pub const DEFAULT_CLASSIFICATION_INPUT_SHAPE: (u32, u32) = (224, 224);

/// Default input shape (channels, height, width) for sequence recognition heads.
pub const DEFAULT_SEQUENCE_IMAGE_SHAPE: [usize; 3] = [3, 48, 320];

/// Default side length limit applied to text detection inputs.
pub const DEFAULT_LIMIT_SIDE_LEN: u32 = 736;

/// The default confidence threshold applied when options do not override it.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

/// Default IoU threshold for non-maximum suppression.
pub const DEFAULT_NMS_IOU: f32 = 0.4;

/// Default number of top classification results to keep.
pub const DEFAULT_TOPK: usize = 5;

/// Minimum number of requests before the scheduler fans out in parallel.
pub const DEFAULT_DISPATCH_THRESHOLD: usize = 2;

/// Default cap on concurrently in-flight detector invocations.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 32;

/// Default per-invocation timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default number of pooled ONNX sessions per loaded model.
pub const DEFAULT_SESSION_POOL_SIZE: usize = 1;

/// Default number of loaded models the registry keeps before evicting.
pub const DEFAULT_REGISTRY_CAPACITY: usize = 8;

/// The maximum allowed tensor element count, guarding against corrupt shapes.
pub const MAX_TENSOR_SIZE: usize = 100_000_000;
