//! Accelerator probing.
//!
//! The label is informational: it tells the user which backend the tensor
//! runtime (candle) can open on this host. Conversion does not branch on it.
//!
//! Precedence, first match wins: Apple Metal, then NVIDIA CUDA, then CPU.
//! Metal and CUDA are only reported when the binary was built with the
//! `metal` / `cuda` features and device 0 actually opens.

use candle_core::{utils, Device};
use serde::Serialize;
use std::fmt;

/// Compute backend reported by the tensor runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Accelerator {
    Metal,
    Cuda,
    Cpu,
}

impl Accelerator {
    /// Open device 0 of each compiled-in backend and pick the first that works.
    pub fn probe() -> Self {
        let accel = Self::select(metal_usable(), cuda_usable());
        tracing::debug!("Accelerator probe: {:?}", accel);
        accel
    }

    pub fn select(metal: bool, cuda: bool) -> Self {
        if metal {
            Accelerator::Metal
        } else if cuda {
            Accelerator::Cuda
        } else {
            Accelerator::Cpu
        }
    }

    /// Short device name as used by tensor runtimes.
    pub fn device_name(self) -> &'static str {
        match self {
            Accelerator::Metal => "mps",
            Accelerator::Cuda => "cuda",
            Accelerator::Cpu => "cpu",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Accelerator::Metal => "Apple Silicon GPU (Metal Performance Shaders)",
            Accelerator::Cuda => "NVIDIA GPU (CUDA)",
            Accelerator::Cpu => "CPU",
        }
    }
}

impl fmt::Display for Accelerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn metal_usable() -> bool {
    utils::metal_is_available() && Device::new_metal(0).is_ok()
}

fn cuda_usable() -> bool {
    utils::cuda_is_available() && Device::new_cuda(0).is_ok()
}
