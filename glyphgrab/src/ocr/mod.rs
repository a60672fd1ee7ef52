//! OCR (Optical Character Recognition) Module
//!
//! Turns captured bitmaps into text with a Tesseract-style engine.
//!
//! # Architecture
//!
//! - `raster`: host `Bitmap` and engine-side `Raster` types
//! - `adapter`: BMP round trip between the two representations
//! - `scale`: `ScalePlanner`, which decides how far to upscale a raster given
//!   its density, the 32-bit addressing limit and the free memory
//! - `preprocessing`: `Preprocessor`, gray conversion plus planned upscaling
//! - `engine`: `RecognitionBackend` trait and the `OcrEngine` lifecycle wrapper
//! - `tesseract`: `LeptessBackend` (feature `tesseract`)
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut engine = TesseractEngine::new(&LanguageId::from("eng"), "/usr/share/tessdata");
//! let text = engine.recognize(&Bitmap::new(image).with_dpi(96, 96));
//! if text.is_empty() {
//!     eprintln!("{}", engine.last_error());
//! }
//! ```

pub mod adapter;
mod engine;
mod preprocessing;
pub mod raster;
mod scale;
#[cfg(feature = "tesseract")]
mod tesseract;

pub use adapter::{from_engine_raster, to_engine_raster};
pub use engine::{OcrEngine, RecognitionBackend, INIT_FAILED, NO_TEXT};
pub use preprocessing::Preprocessor;
pub use raster::{Bitmap, Raster, Resolution};
pub use scale::{ScalePlanner, ScaleSettings};
#[cfg(feature = "tesseract")]
pub use tesseract::LeptessBackend;

#[cfg(feature = "tesseract")]
pub type TesseractEngine = OcrEngine<LeptessBackend>;
