//! Hardware capability probing.
//!
//! The probe runs once, outside this crate's control, and is only consulted
//! to annotate process statistics with the preferred compute target. It
//! never changes eviction or search behavior.

use serde::{Deserialize, Serialize};

/// Where compute-heavy work should preferably run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeTarget {
    #[default]
    Cpu,
    Gpu,
    Npu,
}

impl std::fmt::Display for ComputeTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Gpu => write!(f, "gpu"),
            Self::Npu => write!(f, "npu"),
        }
    }
}

/// Result of a one-shot capability check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareCapabilities {
    /// Graphics acceleration is available
    pub has_gpu: bool,
    /// A neural-processing API is available
    pub has_npu: bool,
    /// Logical CPU cores visible to the process
    pub logical_cores: usize,
}

impl HardwareCapabilities {
    /// NPU beats GPU beats CPU.
    pub fn preferred_target(&self) -> ComputeTarget {
        if self.has_npu {
            ComputeTarget::Npu
        } else if self.has_gpu {
            ComputeTarget::Gpu
        } else {
            ComputeTarget::Cpu
        }
    }
}

/// Read-only view of the host's compute capabilities.
pub trait HardwareProbe: Send + Sync {
    /// Capabilities detected by the probe.
    fn capabilities(&self) -> HardwareCapabilities;

    /// Preferred compute target derived from the capabilities.
    fn preferred_compute_target(&self) -> ComputeTarget {
        self.capabilities().preferred_target()
    }
}

/// Probe that reports a fixed set of capabilities.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    capabilities: HardwareCapabilities,
}

impl StaticProbe {
    pub fn new(capabilities: HardwareCapabilities) -> Self {
        Self { capabilities }
    }

    /// Probe that only ever reports the given target.
    pub fn with_target(target: ComputeTarget) -> Self {
        Self::new(HardwareCapabilities {
            has_gpu: target == ComputeTarget::Gpu,
            has_npu: target == ComputeTarget::Npu,
            logical_cores: 1,
        })
    }
}

impl HardwareProbe for StaticProbe {
    fn capabilities(&self) -> HardwareCapabilities {
        self.capabilities.clone()
    }
}

/// Probe for the current host.
///
/// Core count comes from the OS. Accelerator flags are supplied by the
/// embedding host, which owns the graphics and neural-API detection.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    capabilities: HardwareCapabilities,
}

impl SystemProbe {
    /// Probe the host once with the accelerator flags the host detected.
    pub fn detect(has_gpu: bool, has_npu: bool) -> Self {
        let logical_cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        tracing::debug!(has_gpu, has_npu, logical_cores, "hardware probe complete");

        Self {
            capabilities: HardwareCapabilities {
                has_gpu,
                has_npu,
                logical_cores,
            },
        }
    }

    /// Probe with no accelerators assumed.
    pub fn cpu_only() -> Self {
        Self::detect(false, false)
    }
}

impl HardwareProbe for SystemProbe {
    fn capabilities(&self) -> HardwareCapabilities {
        self.capabilities.clone()
    }
}
