//! Adaptive preprocessing and engine lifecycle for recognizing text in
//! captured bitmaps.
//!
//! A capture goes through [`ocr::Preprocessor`] (BMP round trip into an engine
//! raster, 8-bit gray, upscaling planned against the raster density, the
//! 32-bit addressing limit and the free memory) and is then recognized by an
//! [`ocr::OcrEngine`] bound to one language and model directory.
//! [`worker::RecognitionWorker`] keeps one engine per language around.

pub mod config;
pub mod error;
pub mod language;
pub mod memory;
pub mod ocr;
pub mod worker;

pub use error::{GlyphError, Result};
