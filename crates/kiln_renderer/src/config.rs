//! Renderer configuration

use serde::{Deserialize, Serialize};

use crate::formats::PixelFormat;

fn env_u32(name: &str) -> Option<u32> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
}

fn env_f32(name: &str) -> Option<f32> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
}

/// Configuration shared by every backend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// MSAA sample count (1 or 4)
    pub sample_count: u32,
    /// Format of offscreen color targets
    pub color_format: PixelFormat,
    /// Format of stencil attachments
    pub stencil_format: PixelFormat,
    /// Multiplier on the entity transform's scale when flattening curves.
    /// Larger values produce finer tessellation.
    pub tessellation_scale: f32,
    /// Maximum turn per flattened segment in radians (0 disables)
    pub angle_tolerance: f32,
    /// Turns sharper than this are cusps (0 disables)
    pub cusp_limit: f32,
    /// Upper bound on a pass's transient host buffer, in bytes
    pub max_host_buffer_size: usize,
    /// Fill non-convex paths with stencil-then-cover. When disabled they are
    /// triangulated on the CPU instead.
    pub stencil_then_cover: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            sample_count: 1,
            color_format: PixelFormat::R8G8B8A8UNormInt,
            stencil_format: PixelFormat::S8UInt,
            tessellation_scale: 1.0,
            angle_tolerance: 0.0,
            cusp_limit: 0.0,
            max_host_buffer_size: 64 * 1024 * 1024,
            stencil_then_cover: true,
        }
    }
}

impl RendererConfig {
    /// Default configuration with environment overrides applied
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply overrides from the environment, clamped to valid ranges.
    ///
    /// Env:
    /// - KILN_SAMPLE_COUNT=4
    /// - KILN_TESSELLATION_SCALE=2.0
    /// - KILN_MAX_HOST_BUFFER_MB=128
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_u32("KILN_SAMPLE_COUNT") {
            self.sample_count = if v >= 4 { 4 } else { 1 };
            tracing::info!(
                "renderer config override: sample_count={} (requested {})",
                self.sample_count,
                v
            );
        }
        if let Some(v) = env_f32("KILN_TESSELLATION_SCALE") {
            self.tessellation_scale = v.clamp(0.01, 100.0);
            tracing::info!(
                "renderer config override: tessellation_scale={}",
                self.tessellation_scale
            );
        }
        if let Some(mib) = env_u32("KILN_MAX_HOST_BUFFER_MB") {
            let mib = mib.clamp(1, 4096) as usize;
            self.max_host_buffer_size = mib * 1024 * 1024;
            tracing::info!("renderer config override: max_host_buffer_size={} MiB", mib);
        }
        self
    }
}
