//! Helpers for creating ONNX Runtime sessions.

use crate::core::config::{OrtExecutionProvider, OrtGraphOptimizationLevel, OrtSessionConfig};
use crate::core::errors::VisionError;
use ort::execution_providers::ExecutionProviderDispatch;
use ort::logging::LogLevel;
use ort::session::Session;
use ort::session::builder::SessionBuilder;
use std::path::Path;

/// Loads an ONNX session from a model file, applying the optional session
/// configuration.
pub fn load_session(
    model_path: impl AsRef<Path>,
    config: Option<&OrtSessionConfig>,
) -> Result<Session, VisionError> {
    let path = model_path.as_ref();
    let builder = Session::builder()?;
    let builder = match config {
        Some(cfg) => apply_ort_config(builder, cfg)?,
        // Suppress ORT's own logging below error level.
        None => builder.with_log_level(LogLevel::Error)?,
    };
    let session = builder.commit_from_file(path).map_err(|e| {
        VisionError::model_load_error(
            path,
            "failed to create ONNX session",
            Some("verify model file exists and matches the selected execution providers"),
            Some(e),
        )
    })?;
    Ok(session)
}

pub(super) fn apply_ort_config(
    mut builder: SessionBuilder,
    cfg: &OrtSessionConfig,
) -> Result<SessionBuilder, ort::Error> {
    builder = builder.with_log_level(LogLevel::Error)?;
    if let Some(intra) = cfg.intra_threads {
        builder = builder.with_intra_threads(intra)?;
    }
    if let Some(inter) = cfg.inter_threads {
        builder = builder.with_inter_threads(inter)?;
    }
    if let Some(par) = cfg.parallel_execution {
        builder = builder.with_parallel_execution(par)?;
    }
    if let Some(level) = cfg.optimization_level {
        use OrtGraphOptimizationLevel as OG;
        use ort::session::builder::GraphOptimizationLevel as GOL;
        let mapped = match level {
            OG::DisableAll => GOL::Disable,
            OG::Level1 => GOL::Level1,
            OG::Level2 => GOL::Level2,
            OG::Level3 => GOL::Level3,
        };
        builder = builder.with_optimization_level(mapped)?;
    }
    if let Some(eps) = &cfg.execution_providers {
        let providers = build_execution_providers(eps)?;
        if !providers.is_empty() {
            builder = builder.with_execution_providers(providers)?;
        }
    }
    Ok(builder)
}

fn build_execution_providers(
    eps: &[OrtExecutionProvider],
) -> Result<Vec<ExecutionProviderDispatch>, ort::Error> {
    use OrtExecutionProvider as EP;
    let mut providers = Vec::new();

    for ep in eps {
        match ep {
            EP::CPU => {
                providers.push(ort::execution_providers::CPUExecutionProvider::default().build());
            }
            #[cfg(feature = "cuda")]
            EP::CUDA { device_id } => {
                let mut cuda = ort::execution_providers::CUDAExecutionProvider::default();
                if let Some(id) = device_id {
                    cuda = cuda.with_device_id(*id);
                }
                providers.push(cuda.build());
            }
            #[cfg(feature = "directml")]
            EP::DirectML { device_id } => {
                let mut dml = ort::execution_providers::DirectMLExecutionProvider::default();
                if let Some(id) = device_id {
                    dml = dml.with_device_id(*id);
                }
                providers.push(dml.build());
            }
            #[cfg(feature = "coreml")]
            EP::CoreML => {
                providers
                    .push(ort::execution_providers::CoreMLExecutionProvider::default().build());
            }
            #[cfg(not(feature = "cuda"))]
            EP::CUDA { .. } => {
                return Err(ort::Error::new(
                    "CUDA execution provider requested but cuda feature is not enabled",
                ));
            }
            #[cfg(not(feature = "directml"))]
            EP::DirectML { .. } => {
                return Err(ort::Error::new(
                    "DirectML execution provider requested but directml feature is not enabled",
                ));
            }
            #[cfg(not(feature = "coreml"))]
            EP::CoreML => {
                return Err(ort::Error::new(
                    "CoreML execution provider requested but coreml feature is not enabled",
                ));
            }
        }
    }

    Ok(providers)
}
