// Common test utilities for integration tests
#![allow(dead_code)]
use std::path::Path;
use std::sync::{Arc, Once};

use glyphgrab::error::{GlyphError, Result};
use glyphgrab::memory::FixedMemoryProbe;
use glyphgrab::ocr::{Bitmap, Preprocessor, Raster, RecognitionBackend, ScalePlanner, ScaleSettings};
use image::{DynamicImage, GrayImage, Luma, RgbImage};

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Backend standing in for Tesseract.
///
/// Reports the raster it was handed as `"<width>x<height> <depth>bpp <dpi>dpi"`.
/// The language code picks failure modes: `missing` fails init, `blank`
/// recognizes only whitespace, `crash` fails text extraction.
pub struct FakeBackend {
    code: String,
    page: Option<String>,
}

impl RecognitionBackend for FakeBackend {
    fn init(model_dir: &Path, language_code: &str) -> Result<Self> {
        if language_code == "missing" || model_dir.ends_with("missing") {
            return Err(GlyphError::Initialization(format!(
                "no model for {language_code}"
            )));
        }
        Ok(Self {
            code: language_code.to_string(),
            page: None,
        })
    }

    fn set_image(&mut self, raster: &Raster) -> Result<()> {
        if self.page.is_some() {
            return Err(GlyphError::Recognition("previous page not cleared".to_string()));
        }
        let dpi = raster.resolution().map(|res| res.min_axis()).unwrap_or(0);
        self.page = Some(format!(
            "{}x{} {}bpp {}dpi",
            raster.width(),
            raster.height(),
            raster.bit_depth(),
            dpi
        ));
        Ok(())
    }

    fn utf8_text(&mut self) -> Result<String> {
        let page = self
            .page
            .clone()
            .ok_or_else(|| GlyphError::Recognition("no page".to_string()))?;
        match self.code.as_str() {
            "blank" => Ok("\n \n".to_string()),
            "crash" => Err(GlyphError::Recognition("engine crashed".to_string())),
            _ => Ok(format!("\n {page} \n\n")),
        }
    }

    fn clear(&mut self) {
        self.page = None;
    }
}

/// Preprocessor whose planner sees `available` bytes of free memory.
pub fn preprocessor_with_memory(available: u64) -> Preprocessor {
    Preprocessor::new(planner_with_memory(available))
}

pub fn planner_with_memory(available: u64) -> ScalePlanner {
    ScalePlanner::new(ScaleSettings::default(), Arc::new(FixedMemoryProbe(available)))
}

/// Color bitmap with a dark bar across the middle.
pub fn color_bitmap(width: u32, height: u32) -> Bitmap {
    let image = RgbImage::from_fn(width, height, |_, y| {
        if y == height / 2 {
            image::Rgb([10, 20, 30])
        } else {
            image::Rgb([240, 240, 240])
        }
    });
    Bitmap::new(DynamicImage::ImageRgb8(image))
}

pub fn gray_bitmap(width: u32, height: u32) -> Bitmap {
    Bitmap::new(DynamicImage::ImageLuma8(GrayImage::from_pixel(
        width,
        height,
        Luma([128]),
    )))
}

// Re-export commonly used crates for convenience
pub use serial_test::serial;
pub use tempfile;
