//! Conversion between host bitmaps and engine rasters.
//!
//! The two sides never share memory: the bitmap is written out as an
//! uncompressed BMP (density included) and the engine raster is decoded from
//! those bytes, so pixel layout and channel order never have to line up.

use std::io::Cursor;

use image::codecs::bmp::BmpEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat};

use super::raster::{ppi_to_ppm, ppm_to_ppi, Bitmap, Raster, Resolution};
use crate::error::{GlyphError, Result};

const BMP_INFO_HEADER_OFFSET: usize = 14;
const BMP_X_PELS_OFFSET: usize = 38;
const BMP_Y_PELS_OFFSET: usize = 42;
const BMP_INFO_HEADER_MIN_SIZE: u32 = 40;

/// Turn a host bitmap into an engine raster.
pub fn to_engine_raster(bitmap: &Bitmap) -> Result<Raster> {
    if bitmap.is_empty() {
        return Err(GlyphError::Preprocessing(format!(
            "Cannot convert empty {}x{} bitmap",
            bitmap.width(),
            bitmap.height()
        )));
    }

    let bytes = encode_bmp(bitmap.image(), bitmap.dots_per_meter())?;
    let (image, dots_per_meter) = decode_bmp(&bytes)?;
    let resolution = dots_per_meter.map(|(x, y)| Resolution::new(ppm_to_ppi(x), ppm_to_ppi(y)));

    Ok(Raster::new(image, resolution))
}

/// Turn an engine raster back into a host bitmap, for diagnostics and display.
pub fn from_engine_raster(raster: &Raster) -> Result<Bitmap> {
    let dots_per_meter = raster
        .resolution()
        .map(|res| (ppi_to_ppm(res.x), ppi_to_ppm(res.y)));
    let bytes = encode_bmp(raster.image(), dots_per_meter)?;
    let (image, dots_per_meter) = decode_bmp(&bytes)?;

    let bitmap = Bitmap::new(image);
    Ok(match dots_per_meter {
        Some((x, y)) => bitmap.with_dots_per_meter(x, y),
        None => bitmap,
    })
}

/// Encode `image` as BMP, stamping the density into the info header.
pub(crate) fn encode_bmp(
    image: &DynamicImage,
    dots_per_meter: Option<(u32, u32)>,
) -> Result<Vec<u8>> {
    let (width, height) = (image.width(), image.height());
    let mut bytes = Vec::new();
    let encoder = BmpEncoder::new(&mut bytes);

    let written = match image {
        DynamicImage::ImageLuma8(gray) => {
            encoder.write_image(gray.as_raw(), width, height, ExtendedColorType::L8)
        }
        DynamicImage::ImageLumaA8(gray) => {
            encoder.write_image(gray.as_raw(), width, height, ExtendedColorType::La8)
        }
        DynamicImage::ImageRgb8(rgb) => {
            encoder.write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
        }
        DynamicImage::ImageRgba8(rgba) => {
            encoder.write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
        }
        other if other.color().has_alpha() => encoder.write_image(
            other.to_rgba8().as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
        other => encoder.write_image(
            other.to_rgb8().as_raw(),
            width,
            height,
            ExtendedColorType::Rgb8,
        ),
    };
    written.map_err(|e| GlyphError::Preprocessing(format!("Failed to encode BMP: {e}")))?;

    // Zero density means "unknown" to every BMP reader.
    let (x, y) = dots_per_meter.unwrap_or((0, 0));
    if info_header_size(&bytes) >= BMP_INFO_HEADER_MIN_SIZE {
        write_i32(&mut bytes, BMP_X_PELS_OFFSET, clamp_density(x));
        write_i32(&mut bytes, BMP_Y_PELS_OFFSET, clamp_density(y));
    }

    Ok(bytes)
}

/// Decode BMP bytes, returning the image and its density if the header has one.
fn decode_bmp(bytes: &[u8]) -> Result<(DynamicImage, Option<(u32, u32)>)> {
    let image = image::ImageReader::with_format(Cursor::new(bytes), ImageFormat::Bmp)
        .decode()
        .map_err(|e| GlyphError::Preprocessing(format!("Failed to decode BMP: {e}")))?;

    let dots_per_meter = if info_header_size(bytes) >= BMP_INFO_HEADER_MIN_SIZE {
        match (read_i32(bytes, BMP_X_PELS_OFFSET), read_i32(bytes, BMP_Y_PELS_OFFSET)) {
            (Some(x), Some(y)) if x > 0 && y > 0 => Some((x as u32, y as u32)),
            _ => None,
        }
    } else {
        None
    };

    Ok((image, dots_per_meter))
}

fn info_header_size(bytes: &[u8]) -> u32 {
    bytes
        .get(BMP_INFO_HEADER_OFFSET..BMP_INFO_HEADER_OFFSET + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .unwrap_or(0)
}

fn read_i32(bytes: &[u8], offset: usize) -> Option<i32> {
    bytes
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(i32::from_le_bytes)
}

fn write_i32(bytes: &mut [u8], offset: usize, value: i32) {
    if let Some(slot) = bytes.get_mut(offset..offset + 4) {
        slot.copy_from_slice(&value.to_le_bytes());
    }
}

fn clamp_density(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
