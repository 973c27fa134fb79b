//! Multi-detector dispatch with timeouts and backpressure.
//!
//! The [`InferenceScheduler`] fans a frame's detector requests out over a
//! dedicated rayon pool (staying sequential below the parallel policy's
//! threshold), bounds the wait for each invocation, and feeds every outcome
//! into the frame envelope.
//!
//! Two invariants hold for every request:
//!
//! - Exactly one terminal outcome is delivered. Workers send once over a
//!   one-shot channel; a disconnected channel (worker died) is converted into
//!   a failure outcome rather than delivering nothing.
//! - There is no cancellation. A timed-out invocation keeps running on its
//!   worker; only the wait is abandoned and the late result dropped.

use crate::aggregate::{DetectorOutcome, FrameAnalysis};
use crate::core::config::ParallelPolicy;
use crate::core::constants::{DEFAULT_MAX_IN_FLIGHT, DEFAULT_TIMEOUT_MS};
use crate::core::dispatch::{DetectionRequest, DynDetectionOutput};
use crate::core::errors::{VisionError, VisionResult};
use crate::core::traits::Detector;
use crate::detectors::barcode::BarcodeDetector;
use crate::detectors::custom::CustomModelDetector;
use crate::detectors::face::FaceDetector;
use crate::detectors::label::LabelDetector;
use crate::detectors::text::TextDetector;
use crate::domain::ImageBuffer;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Scheduling limits for a scheduler instance.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Parallelism policy for the dispatch pool.
    pub parallel: ParallelPolicy,
    /// Cap on concurrently in-flight detector invocations; admission beyond
    /// it fails fast. Default: 32
    pub max_in_flight: usize,
    /// Per-invocation wait deadline. Default: 10s
    pub timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            parallel: ParallelPolicy::default(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl SchedulerConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> VisionResult<()> {
        self.parallel.validate()?;
        if self.max_in_flight == 0 {
            return Err(VisionError::config_error(
                "max_in_flight must be greater than 0",
            ));
        }
        if self.timeout.is_zero() {
            return Err(VisionError::config_error("timeout must be non-zero"));
        }
        Ok(())
    }
}

/// The detector instances a scheduler dispatches to.
///
/// Every slot is optional; a request targeting an unregistered variant
/// yields a configuration failure outcome for that request only.
#[derive(Debug, Default, Clone)]
pub struct DetectorSet {
    barcode: Option<Arc<BarcodeDetector>>,
    face: Option<Arc<FaceDetector>>,
    label: Option<Arc<LabelDetector>>,
    text: Option<Arc<TextDetector>>,
    custom: Option<Arc<CustomModelDetector>>,
}

impl DetectorSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the barcode detector.
    pub fn with_barcode(mut self, detector: Arc<BarcodeDetector>) -> Self {
        self.barcode = Some(detector);
        self
    }

    /// Registers the face detector.
    pub fn with_face(mut self, detector: Arc<FaceDetector>) -> Self {
        self.face = Some(detector);
        self
    }

    /// Registers the label detector.
    pub fn with_label(mut self, detector: Arc<LabelDetector>) -> Self {
        self.label = Some(detector);
        self
    }

    /// Registers the text detector.
    pub fn with_text(mut self, detector: Arc<TextDetector>) -> Self {
        self.text = Some(detector);
        self
    }

    /// Registers the custom model runner.
    pub fn with_custom(mut self, detector: Arc<CustomModelDetector>) -> Self {
        self.custom = Some(detector);
        self
    }

    fn missing(kind: &str) -> VisionError {
        VisionError::config_error(format!("no {kind} detector registered with the scheduler"))
    }

    /// Invokes the detector matching the request.
    fn invoke(
        &self,
        image: &ImageBuffer,
        request: &DetectionRequest,
    ) -> VisionResult<DynDetectionOutput> {
        match request {
            DetectionRequest::Barcode(options) => {
                let detector = self.barcode.as_ref().ok_or_else(|| Self::missing("barcode"))?;
                detector
                    .detect(image, options)
                    .map(DynDetectionOutput::Barcodes)
            }
            DetectionRequest::Face(options) => {
                let detector = self.face.as_ref().ok_or_else(|| Self::missing("face"))?;
                detector.detect(image, options).map(DynDetectionOutput::Faces)
            }
            DetectionRequest::Label(options) => {
                let detector = self.label.as_ref().ok_or_else(|| Self::missing("label"))?;
                detector
                    .detect(image, options)
                    .map(DynDetectionOutput::Labels)
            }
            DetectionRequest::Text(options) => {
                let detector = self.text.as_ref().ok_or_else(|| Self::missing("text"))?;
                detector
                    .detect(image, options)
                    .map(DynDetectionOutput::TextBlocks)
            }
            DetectionRequest::Custom {
                model,
                options,
                input,
            } => {
                let runner = self
                    .custom
                    .as_ref()
                    .ok_or_else(|| Self::missing("custom model"))?;
                runner
                    .run(model, options, input)
                    .map(DynDetectionOutput::Tensor)
            }
        }
    }
}

/// Dispatches detector invocations across available compute.
#[derive(Debug)]
pub struct InferenceScheduler {
    config: SchedulerConfig,
    detectors: DetectorSet,
    pool: rayon::ThreadPool,
    in_flight: Arc<AtomicUsize>,
}

impl InferenceScheduler {
    /// Creates a scheduler over the given detectors.
    pub fn new(detectors: DetectorSet, config: SchedulerConfig) -> VisionResult<Self> {
        config.validate()?;
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = config.parallel.max_threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder
            .build()
            .map_err(|e| VisionError::config_error(format!("failed to build dispatch pool: {e}")))?;
        Ok(Self {
            config,
            detectors,
            pool,
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Returns the number of currently in-flight invocations.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Dispatches the requests against one frame.
    ///
    /// Outcomes preserve request order. Fails fast (before running anything)
    /// when admission would exceed `max_in_flight`; individual detector
    /// failures land in the envelope instead.
    pub fn dispatch(
        &self,
        image: &ImageBuffer,
        requests: Vec<DetectionRequest>,
    ) -> VisionResult<FrameAnalysis> {
        if requests.is_empty() {
            return Ok(FrameAnalysis::default());
        }
        self.admit(requests.len())?;
        let _guard = InFlightGuard {
            counter: self.in_flight.clone(),
            count: requests.len(),
        };

        let image = Arc::new(image.clone());
        let parallel = self.config.parallel.should_parallelize(requests.len());
        debug!(
            requests = requests.len(),
            parallel, "dispatching detector requests"
        );

        let outcomes = if parallel {
            let deadline = Instant::now() + self.config.timeout;
            let receivers: Vec<_> = requests
                .into_iter()
                .map(|request| self.spawn(image.clone(), request))
                .collect();
            receivers
                .into_iter()
                .map(|pending| self.collect(pending, Some(deadline)))
                .collect()
        } else {
            requests
                .into_iter()
                .map(|request| {
                    let pending = self.spawn(image.clone(), request);
                    self.collect(pending, None)
                })
                .collect()
        };
        Ok(FrameAnalysis::new(outcomes))
    }

    fn admit(&self, count: usize) -> VisionResult<()> {
        let limit = self.config.max_in_flight;
        let admitted = self
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current + count <= limit).then_some(current + count)
            });
        match admitted {
            Ok(_) => Ok(()),
            Err(current) => {
                warn!(
                    current,
                    requested = count,
                    limit,
                    "rejecting dispatch: in-flight limit reached"
                );
                Err(VisionError::resource_limit_error(
                    "in-flight invocations",
                    limit,
                    current + count,
                ))
            }
        }
    }

    fn spawn(&self, image: Arc<ImageBuffer>, request: DetectionRequest) -> PendingOutcome {
        let kind = request.kind();
        let (sender, receiver) = mpsc::channel();
        let detectors = self.detectors.clone();
        self.pool.spawn(move || {
            let start = Instant::now();
            let result = detectors.invoke(&image, &request);
            // The receiver may have timed out and gone; a failed send only
            // means the result is dropped, never delivered twice.
            let _ = sender.send((start.elapsed(), result));
        });
        PendingOutcome { kind, receiver }
    }

    fn collect(&self, pending: PendingOutcome, deadline: Option<Instant>) -> DetectorOutcome {
        let timeout = match deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => self.config.timeout,
        };
        match pending.receiver.recv_timeout(timeout) {
            Ok((elapsed, Ok(output))) => DetectorOutcome::success(pending.kind, elapsed, output),
            Ok((elapsed, Err(error))) => DetectorOutcome::failure(pending.kind, elapsed, &error),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(kind = pending.kind.name(), "detector invocation timed out");
                DetectorOutcome::failure(
                    pending.kind,
                    self.config.timeout,
                    &VisionError::timeout(
                        format!("{} detection", pending.kind.name()),
                        self.config.timeout.as_millis() as u64,
                    ),
                )
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => DetectorOutcome::failure(
                pending.kind,
                Duration::ZERO,
                &VisionError::inference_error(
                    pending.kind.name(),
                    "worker terminated without delivering a result",
                    crate::core::errors::SimpleError::new("result channel disconnected"),
                ),
            ),
        }
    }
}

struct PendingOutcome {
    kind: crate::core::traits::DetectorKind,
    receiver: mpsc::Receiver<(Duration, VisionResult<DynDetectionOutput>)>,
}

struct InFlightGuard {
    counter: Arc<AtomicUsize>,
    count: usize,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(self.count, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Outcome;
    use crate::detectors::custom::CustomOptions;
    use crate::detectors::face::FaceOptions;
    use crate::domain::{PixelFormat, TensorData, TensorDtype};
    use crate::registry::ModelRegistry;

    fn test_image() -> ImageBuffer {
        ImageBuffer::new(4, 4, PixelFormat::Rgb8, vec![0u8; 48]).unwrap()
    }

    fn empty_scheduler() -> InferenceScheduler {
        InferenceScheduler::new(DetectorSet::new(), SchedulerConfig::default()).unwrap()
    }

    fn scheduler_with_custom() -> InferenceScheduler {
        let set = DetectorSet::new().with_custom(Arc::new(CustomModelDetector::new(Arc::new(
            ModelRegistry::default(),
        ))));
        InferenceScheduler::new(set, SchedulerConfig::default()).unwrap()
    }

    #[test]
    fn test_empty_dispatch_yields_empty_envelope() {
        let scheduler = empty_scheduler();
        let analysis = scheduler.dispatch(&test_image(), vec![]).unwrap();
        assert!(analysis.outcomes().is_empty());
    }

    #[test]
    fn test_unregistered_detector_yields_failure_outcome() {
        let scheduler = empty_scheduler();
        let analysis = scheduler
            .dispatch(
                &test_image(),
                vec![DetectionRequest::Face(FaceOptions::default())],
            )
            .unwrap();
        assert_eq!(analysis.outcomes().len(), 1);
        assert!(analysis.is_complete_failure());
        match &analysis.outcomes()[0].outcome {
            Outcome::Failure(error) => assert_eq!(error.code, "configuration"),
            Outcome::Success(_) => panic!("expected failure outcome"),
        }
    }

    #[test]
    fn test_exactly_one_outcome_per_request() {
        let scheduler = scheduler_with_custom();
        let requests = vec![
            DetectionRequest::Face(FaceOptions::default()),
            DetectionRequest::Custom {
                model: "nope".into(),
                options: CustomOptions::default(),
                input: TensorData::from_f32(vec![1], &[1.0]),
            },
            DetectionRequest::Custom {
                model: "also-nope".into(),
                options: CustomOptions::default(),
                input: TensorData {
                    dtype: TensorDtype::F32,
                    shape: vec![1],
                    bytes: vec![],
                },
            },
        ];
        let expected = requests.len();
        let analysis = scheduler.dispatch(&test_image(), requests).unwrap();
        // one terminal outcome per request, never more, never fewer
        assert_eq!(analysis.outcomes().len(), expected);
        assert!(analysis.is_complete_failure());
    }

    #[test]
    fn test_outcomes_preserve_request_order() {
        let scheduler = scheduler_with_custom();
        let requests = vec![
            DetectionRequest::Custom {
                model: "a".into(),
                options: CustomOptions::default(),
                input: TensorData::from_f32(vec![1], &[1.0]),
            },
            DetectionRequest::Face(FaceOptions::default()),
            DetectionRequest::Custom {
                model: "b".into(),
                options: CustomOptions::default(),
                input: TensorData::from_f32(vec![1], &[1.0]),
            },
        ];
        let analysis = scheduler.dispatch(&test_image(), requests).unwrap();
        let kinds: Vec<_> = analysis.outcomes().iter().map(|o| o.kind).collect();
        assert_eq!(
            kinds,
            vec![
                crate::core::traits::DetectorKind::CustomModel,
                crate::core::traits::DetectorKind::Face,
                crate::core::traits::DetectorKind::CustomModel,
            ]
        );
    }

    #[test]
    fn test_backpressure_rejects_oversized_dispatch() {
        let config = SchedulerConfig {
            max_in_flight: 2,
            ..Default::default()
        };
        let scheduler = InferenceScheduler::new(DetectorSet::new(), config).unwrap();
        let requests = vec![
            DetectionRequest::Face(FaceOptions::default()),
            DetectionRequest::Face(FaceOptions::default()),
            DetectionRequest::Face(FaceOptions::default()),
        ];
        let err = scheduler.dispatch(&test_image(), requests).unwrap_err();
        assert!(matches!(err, VisionError::ResourceLimit { .. }));
    }

    #[test]
    fn test_in_flight_returns_to_zero_after_dispatch() {
        let scheduler = empty_scheduler();
        let _ = scheduler
            .dispatch(
                &test_image(),
                vec![DetectionRequest::Face(FaceOptions::default())],
            )
            .unwrap();
        assert_eq!(scheduler.in_flight(), 0);
    }

    #[test]
    fn test_zero_max_in_flight_rejected() {
        let config = SchedulerConfig {
            max_in_flight: 0,
            ..Default::default()
        };
        assert!(InferenceScheduler::new(DetectorSet::new(), config).is_err());
    }

    #[test]
    fn test_custom_input_validation_failure_lands_in_envelope() {
        let scheduler = scheduler_with_custom();
        let analysis = scheduler
            .dispatch(
                &test_image(),
                vec![DetectionRequest::Custom {
                    model: "m".into(),
                    options: CustomOptions::default(),
                    input: TensorData {
                        dtype: TensorDtype::U8,
                        shape: vec![4],
                        bytes: vec![],
                    },
                }],
            )
            .unwrap();
        match &analysis.outcomes()[0].outcome {
            Outcome::Failure(error) => {
                assert_eq!(error.code, "invalid-input");
                assert!(!error.message.is_empty());
            }
            Outcome::Success(_) => panic!("expected failure outcome"),
        }
    }
}
