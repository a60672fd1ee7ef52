use std::path::Path;

use leptess::{capi, leptonica, tesseract::TessApi};

use super::adapter::encode_bmp;
use super::engine::RecognitionBackend;
use super::raster::{ppi_to_ppm, Raster};
use crate::error::{GlyphError, Result};

/// Tesseract through leptess, initialized in Tesseract's default engine mode.
pub struct LeptessBackend {
    api: TessApi,
}

impl RecognitionBackend for LeptessBackend {
    fn init(model_dir: &Path, language_code: &str) -> Result<Self> {
        let model_dir = model_dir.to_str().ok_or_else(|| {
            GlyphError::Initialization(format!(
                "Model directory is not valid UTF-8: {}",
                model_dir.display()
            ))
        })?;

        let api = TessApi::new(Some(model_dir), language_code)
            .map_err(|e| GlyphError::Initialization(format!("Tesseract init failed: {e}")))?;
        Ok(Self { api })
    }

    fn set_image(&mut self, raster: &Raster) -> Result<()> {
        // Leptonica reads the density back out of the BMP header.
        let dots_per_meter = raster
            .resolution()
            .map(|res| (ppi_to_ppm(res.x), ppi_to_ppm(res.y)));
        let bytes = encode_bmp(raster.image(), dots_per_meter)?;

        let pix = leptonica::pix_read_mem(&bytes)
            .map_err(|e| GlyphError::Recognition(format!("Failed to read image: {e:?}")))?;
        self.api.set_image(&pix);
        drop(pix);
        tracing::trace!("Released leptonica page copy");

        if let Some(res) = raster.resolution() {
            if let Ok(dpi) = i32::try_from(res.min_axis()) {
                self.api.set_source_resolution(dpi);
            }
        }
        Ok(())
    }

    fn utf8_text(&mut self) -> Result<String> {
        self.api
            .get_utf8_text()
            .map_err(|e| GlyphError::Recognition(format!("Failed to extract text: {e}")))
    }

    fn clear(&mut self) {
        // SAFETY: `raw` is the handle `TessApi::new` created; it stays valid
        // until `self.api` is dropped, and `&mut self` rules out other users.
        unsafe { capi::TessBaseAPIClear(self.api.raw) };
    }
}
