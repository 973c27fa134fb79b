//! ONNX Runtime configuration types and utilities.

use serde::{Deserialize, Serialize};

/// Graph optimization levels for ONNX Runtime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OrtGraphOptimizationLevel {
    /// Disable all optimizations.
    DisableAll,
    /// Enable basic optimizations.
    Level1,
    /// Enable extended optimizations.
    Level2,
    /// Enable all optimizations.
    Level3,
}

impl Default for OrtGraphOptimizationLevel {
    fn default() -> Self {
        Self::Level1
    }
}

/// Execution providers for ONNX Runtime.
///
/// Only the CPU provider is compiled in unconditionally; the other variants
/// are applied when the corresponding ONNX Runtime build supports them and
/// fall back to CPU otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrtExecutionProvider {
    /// CPU execution provider (always available)
    CPU,
    /// NVIDIA CUDA execution provider
    CUDA {
        /// CUDA device ID (default: 0)
        device_id: Option<i32>,
    },
    /// DirectML execution provider (Windows only)
    DirectML {
        /// DirectML device ID (default: 0)
        device_id: Option<i32>,
    },
    /// CoreML execution provider (macOS/iOS only)
    CoreML,
}

impl Default for OrtExecutionProvider {
    fn default() -> Self {
        Self::CPU
    }
}

/// Configuration for ONNX Runtime sessions.
///
/// Covers threading, graph optimization, and execution provider preference.
/// All fields are optional; `None` keeps the ONNX Runtime default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrtSessionConfig {
    /// Number of threads used to parallelize execution within nodes
    #[serde(default)]
    pub intra_threads: Option<usize>,
    /// Number of threads used to parallelize execution across nodes
    #[serde(default)]
    pub inter_threads: Option<usize>,
    /// Enable parallel execution mode
    #[serde(default)]
    pub parallel_execution: Option<bool>,
    /// Graph optimization level
    #[serde(default)]
    pub optimization_level: Option<OrtGraphOptimizationLevel>,
    /// Execution providers in order of preference
    #[serde(default)]
    pub execution_providers: Option<Vec<OrtExecutionProvider>>,
}

impl OrtSessionConfig {
    /// Creates a new configuration with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of intra-op threads.
    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = Some(threads);
        self
    }

    /// Sets the number of inter-op threads.
    pub fn with_inter_threads(mut self, threads: usize) -> Self {
        self.inter_threads = Some(threads);
        self
    }

    /// Enables or disables parallel execution mode.
    pub fn with_parallel_execution(mut self, enabled: bool) -> Self {
        self.parallel_execution = Some(enabled);
        self
    }

    /// Sets the graph optimization level.
    pub fn with_optimization_level(mut self, level: OrtGraphOptimizationLevel) -> Self {
        self.optimization_level = Some(level);
        self
    }

    /// Sets the execution provider preference order.
    pub fn with_execution_providers(mut self, providers: Vec<OrtExecutionProvider>) -> Self {
        self.execution_providers = Some(providers);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let config = OrtSessionConfig::new()
            .with_intra_threads(4)
            .with_optimization_level(OrtGraphOptimizationLevel::Level3);
        assert_eq!(config.intra_threads, Some(4));
        assert!(matches!(
            config.optimization_level,
            Some(OrtGraphOptimizationLevel::Level3)
        ));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: OrtSessionConfig =
            serde_json::from_str(r#"{"intra_threads": 2}"#).unwrap();
        assert_eq!(config.intra_threads, Some(2));
        assert!(config.execution_providers.is_none());
    }
}
