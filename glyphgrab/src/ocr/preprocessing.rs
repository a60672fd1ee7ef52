use tracing::{debug, trace, warn};

use super::adapter::to_engine_raster;
use super::raster::{Bitmap, Raster};
use super::scale::{ScalePlanner, ScaleSettings};
use crate::error::Result;

/// Turns captured bitmaps into rasters ready for recognition.
#[derive(Default)]
pub struct Preprocessor {
    planner: ScalePlanner,
}

impl Preprocessor {
    pub fn new(planner: ScalePlanner) -> Self {
        Self { planner }
    }

    pub fn with_settings(settings: ScaleSettings) -> Self {
        Self::new(ScalePlanner::with_system_probe(settings))
    }

    pub fn planner(&self) -> &ScalePlanner {
        &self.planner
    }

    /// Preprocess a bitmap for OCR
    ///
    /// Applies the following transformations:
    /// 1. Converts the bitmap to an engine raster
    /// 2. Converts to 8-bit grayscale
    /// 3. Upscales low density input when the planner allows it
    ///
    /// Scaling failures are not errors: the unscaled grayscale raster is
    /// returned instead. Every intermediate raster is dropped before returning.
    pub fn prepare(&self, bitmap: &Bitmap) -> Result<Raster> {
        let converted = to_engine_raster(bitmap)?;
        trace!(
            width = converted.width(),
            height = converted.height(),
            depth = converted.bit_depth(),
            "Converted bitmap"
        );

        let gray = converted.into_gray()?;
        trace!("Created gray raster, released converted raster");

        let Some(scale) = self.planner.plan(&gray) else {
            return Ok(gray);
        };

        match gray.scaled(scale) {
            Ok(scaled) => {
                debug!(
                    scale,
                    width = scaled.width(),
                    height = scaled.height(),
                    "Scaled raster for OCR"
                );
                Ok(scaled)
            }
            Err(e) => {
                warn!(scale, error = %e, "Scaling failed, using unscaled raster");
                Ok(gray)
            }
        }
    }
}
