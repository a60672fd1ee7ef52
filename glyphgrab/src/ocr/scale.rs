//! Upscale planning for grayscale rasters.
//!
//! Tesseract does poorly on low density input, so small captures are enlarged
//! toward a target density. The enlargement is capped twice: the result must
//! stay addressable with signed 32-bit coordinates, and its pixel buffer must
//! fit in a fraction of the memory the host has free right now.

use std::sync::Arc;

use serde::Deserialize;

use super::raster::{Raster, Resolution};
use crate::config::{DEFAULT_MEMORY_BUDGET_FRACTION, DEFAULT_TARGET_DPI};
use crate::memory::{MemoryProbe, SystemMemoryProbe};

/// Tuning for [`ScalePlanner`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ScaleSettings {
    /// Density the shorter resolution axis is normalized toward.
    pub target_dpi: f64,
    /// Share of the probed free memory an upscaled raster may occupy.
    pub memory_budget_fraction: f64,
}

impl Default for ScaleSettings {
    fn default() -> Self {
        Self {
            target_dpi: DEFAULT_TARGET_DPI,
            memory_budget_fraction: DEFAULT_MEMORY_BUDGET_FRACTION,
        }
    }
}

pub struct ScalePlanner {
    settings: ScaleSettings,
    probe: Arc<dyn MemoryProbe>,
}

impl ScalePlanner {
    pub fn new(settings: ScaleSettings, probe: Arc<dyn MemoryProbe>) -> Self {
        Self { settings, probe }
    }

    pub fn with_system_probe(settings: ScaleSettings) -> Self {
        Self::new(settings, Arc::new(SystemMemoryProbe::default()))
    }

    pub fn settings(&self) -> ScaleSettings {
        self.settings
    }

    /// Scale factor to apply to `raster`, or `None` when it should be left
    /// alone. A returned factor is always greater than 1.0.
    pub fn plan(&self, raster: &Raster) -> Option<f64> {
        let geometry = Geometry {
            width: raster.width(),
            height: raster.height(),
            bit_depth: raster.bit_depth(),
            resolution: raster.resolution()?,
        };
        plan_scale(&geometry, &self.settings, || self.probe.available_bytes())
    }
}

impl Default for ScalePlanner {
    fn default() -> Self {
        Self::with_system_probe(ScaleSettings::default())
    }
}

#[derive(Debug, Clone, Copy)]
struct Geometry {
    width: u32,
    height: u32,
    bit_depth: u32,
    resolution: Resolution,
}

fn plan_scale(
    geometry: &Geometry,
    settings: &ScaleSettings,
    available_bytes: impl FnOnce() -> Option<u64>,
) -> Option<f64> {
    if !geometry.resolution.is_usable() || geometry.width == 0 || geometry.height == 0 {
        return None;
    }

    let preferred =
        (settings.target_dpi / f64::from(geometry.resolution.min_axis())).max(1.0);
    if preferred <= 1.0 {
        return None;
    }

    let max_addressable = f64::from(i32::MAX);
    let scale_x = preferred.min(max_addressable / f64::from(geometry.width));
    let scale_y = preferred.min(max_addressable / f64::from(geometry.height));
    let mut scale = scale_x.min(scale_y);

    let usable_memory = available_bytes().unwrap_or(0) as f64 * settings.memory_budget_fraction;
    if usable_memory < 1.0 {
        tracing::debug!("No memory estimate, skipping upscale");
        return None;
    }

    // The footprint grows with the square of the factor.
    let footprint = (f64::from(geometry.width)
        * f64::from(geometry.height)
        * f64::from(geometry.bit_depth)
        / 8.0)
        .max(1.0);
    let max_scale_memory = (usable_memory / footprint).sqrt();
    scale = scale.min(max_scale_memory);

    tracing::debug!(
        preferred,
        max_scale_memory,
        scale,
        width = geometry.width,
        height = geometry.height,
        "Planned raster scale"
    );

    (scale > 1.0).then_some(scale)
}
