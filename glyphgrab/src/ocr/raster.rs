//! Host bitmaps and the engine-side working raster.

use std::cell::Cell;

use image::{DynamicImage, GenericImageView, GrayImage, Luma};

use crate::error::{GlyphError, Result};

// Leptonica's default luminance weights for RGB to gray conversion.
const RED_WEIGHT: f32 = 0.3;
const GREEN_WEIGHT: f32 = 0.5;
const BLUE_WEIGHT: f32 = 0.2;

thread_local! {
    static LIVE_RASTERS: Cell<usize> = const { Cell::new(0) };
}

/// Number of [`Raster`]s currently alive on this thread.
///
/// Every pipeline stage runs on the caller's thread, so after a call returns
/// this should be back to where it started.
pub fn live_count() -> usize {
    LIVE_RASTERS.with(Cell::get)
}

#[derive(Debug)]
struct LiveToken;

impl LiveToken {
    fn acquire() -> Self {
        LIVE_RASTERS.with(|count| count.set(count.get() + 1));
        LiveToken
    }
}

impl Drop for LiveToken {
    fn drop(&mut self) {
        LIVE_RASTERS.with(|count| count.set(count.get().saturating_sub(1)));
    }
}

/// Pixel density in pixels per inch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub x: u32,
    pub y: u32,
}

impl Resolution {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Both axes set; a zero on either axis carries no density hint.
    pub fn is_usable(&self) -> bool {
        u64::from(self.x) * u64::from(self.y) != 0
    }

    pub fn min_axis(&self) -> u32 {
        self.x.min(self.y)
    }
}

/// A captured image as the host application holds it.
///
/// Any color type is accepted. The density is optional; without it the
/// preprocessing cannot tell how small the text is and will not upscale.
#[derive(Debug, Clone)]
pub struct Bitmap {
    image: DynamicImage,
    dots_per_meter: Option<(u32, u32)>,
}

impl Bitmap {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image,
            dots_per_meter: None,
        }
    }

    pub fn with_dots_per_meter(mut self, x: u32, y: u32) -> Self {
        self.dots_per_meter = Some((x, y));
        self
    }

    /// Convenience for hosts that track density in DPI.
    pub fn with_dpi(self, x: u32, y: u32) -> Self {
        self.with_dots_per_meter(ppi_to_ppm(x), ppi_to_ppm(y))
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn dots_per_meter(&self) -> Option<(u32, u32)> {
        self.dots_per_meter
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }
}

impl From<DynamicImage> for Bitmap {
    fn from(image: DynamicImage) -> Self {
        Self::new(image)
    }
}

pub(crate) const INCHES_PER_METER: f64 = 39.37;

pub(crate) fn ppm_to_ppi(ppm: u32) -> u32 {
    (f64::from(ppm) / INCHES_PER_METER + 0.5) as u32
}

pub(crate) fn ppi_to_ppm(ppi: u32) -> u32 {
    (f64::from(ppi) * INCHES_PER_METER + 0.5) as u32
}

/// Working raster handed between preprocessing stages and to the engine.
///
/// Not `Clone`: each stage consumes or borrows the raster it got and returns
/// a new one, so exactly one owner exists at any time.
#[derive(Debug)]
pub struct Raster {
    image: DynamicImage,
    resolution: Option<Resolution>,
    _live: LiveToken,
}

impl Raster {
    pub fn new(image: DynamicImage, resolution: Option<Resolution>) -> Self {
        let raster = Self {
            image,
            resolution,
            _live: LiveToken::acquire(),
        };
        tracing::trace!(
            width = raster.width(),
            height = raster.height(),
            depth = raster.bit_depth(),
            "Created raster"
        );
        raster
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Bits per pixel of the underlying buffer.
    pub fn bit_depth(&self) -> u32 {
        u32::from(self.image.color().bits_per_pixel())
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    pub fn is_gray8(&self) -> bool {
        matches!(self.image, DynamicImage::ImageLuma8(_))
    }

    /// Convert to 8-bit grayscale, releasing `self`.
    pub fn into_gray(self) -> Result<Raster> {
        let (width, height) = self.image.dimensions();
        if width == 0 || height == 0 {
            return Err(GlyphError::Preprocessing(format!(
                "Cannot convert empty {width}x{height} raster to gray"
            )));
        }

        let gray = match &self.image {
            DynamicImage::ImageLuma8(gray) => gray.clone(),
            DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_) => self.image.to_luma8(),
            _ => weighted_gray(&self.image),
        };

        Ok(Raster::new(DynamicImage::ImageLuma8(gray), self.resolution))
    }

    /// Produce a copy enlarged by `factor` on both axes.
    ///
    /// Fails when the target size is not addressable or cannot be allocated;
    /// `self` is left untouched either way.
    pub fn scaled(&self, factor: f64) -> Result<Raster> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(GlyphError::Scaling(format!("Invalid scale factor {factor}")));
        }

        let new_width = scaled_dimension(self.width(), factor)?;
        let new_height = scaled_dimension(self.height(), factor)?;

        let bytes_per_pixel = (u64::from(self.bit_depth()) / 8).max(1);
        let len = u64::from(new_width)
            .checked_mul(u64::from(new_height))
            .and_then(|pixels| pixels.checked_mul(bytes_per_pixel))
            .and_then(|bytes| usize::try_from(bytes).ok())
            .ok_or_else(|| {
                GlyphError::Scaling(format!("{new_width}x{new_height} raster is too large"))
            })?;

        // Probe the allocation up front so an impossible request turns into an
        // error instead of an abort inside the resizer.
        let mut probe: Vec<u8> = Vec::new();
        probe.try_reserve_exact(len).map_err(|e| {
            GlyphError::Scaling(format!(
                "Cannot allocate {new_width}x{new_height} raster: {e}"
            ))
        })?;
        drop(probe);

        let image = self.image.resize_exact(
            new_width,
            new_height,
            image::imageops::FilterType::Triangle,
        );
        let resolution = self.resolution.map(|res| Resolution {
            x: scale_density(res.x, factor),
            y: scale_density(res.y, factor),
        });

        Ok(Raster::new(image, resolution))
    }
}

fn weighted_gray(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let value = RED_WEIGHT * f32::from(r)
            + GREEN_WEIGHT * f32::from(g)
            + BLUE_WEIGHT * f32::from(b)
            + 0.5;
        Luma([value.min(255.0) as u8])
    })
}

fn scaled_dimension(size: u32, factor: f64) -> Result<u32> {
    let scaled = f64::from(size) * factor + 0.5;
    if scaled < 1.0 || scaled > f64::from(i32::MAX) {
        return Err(GlyphError::Scaling(format!(
            "Scaled dimension {scaled} out of range"
        )));
    }
    Ok(scaled as u32)
}

fn scale_density(density: u32, factor: f64) -> u32 {
    (f64::from(density) * factor + 0.5).min(f64::from(u32::MAX)) as u32
}
