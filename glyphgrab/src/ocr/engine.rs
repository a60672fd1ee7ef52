use std::path::{Path, PathBuf};

use tracing::{debug, info, trace, warn};

use super::preprocessing::Preprocessor;
use super::raster::{Bitmap, Raster};
use crate::error::{GlyphError, Result};
use crate::language::{tesseract_code, LanguageId};

pub const INIT_FAILED: &str = "init failed";
pub const NO_TEXT: &str = "Failed to recognize text or no text selected";

/// A text recognition library bound to one trained model.
///
/// Implementations are initialized once in the library's default engine mode,
/// then fed one raster per recognition. `clear` is called after every
/// recognition so the next one starts from a clean session.
pub trait RecognitionBackend: Send + Sized {
    fn init(model_dir: &Path, language_code: &str) -> Result<Self>;

    fn set_image(&mut self, raster: &Raster) -> Result<()>;

    fn utf8_text(&mut self) -> Result<String>;

    fn clear(&mut self);
}

enum EngineState<B> {
    /// Construction was handed an empty language or model path.
    Uninitialized,
    Ready(B),
    Failed(String),
}

/// Recognizes text in bitmaps with a backend bound to one language.
///
/// The binding is fixed at construction; use a new instance for another
/// language or model directory. Not meant for concurrent use: `recognize`
/// takes `&mut self`.
pub struct OcrEngine<B: RecognitionBackend> {
    state: EngineState<B>,
    language: LanguageId,
    model_dir: PathBuf,
    preprocessor: Preprocessor,
    error: String,
}

impl<B: RecognitionBackend> OcrEngine<B> {
    pub fn new(language: &LanguageId, model_dir: impl AsRef<Path>) -> Self {
        Self::with_preprocessor(language, model_dir, Preprocessor::default())
    }

    pub fn with_preprocessor(
        language: &LanguageId,
        model_dir: impl AsRef<Path>,
        preprocessor: Preprocessor,
    ) -> Self {
        let model_dir = model_dir.as_ref().to_path_buf();
        let mut engine = Self {
            state: EngineState::Uninitialized,
            language: language.clone(),
            model_dir,
            preprocessor,
            error: String::new(),
        };

        if let Err(e) = engine.validate_binding() {
            warn!("{}", e);
            return engine;
        }

        engine.init();
        engine
    }

    fn validate_binding(&self) -> Result<()> {
        if self.model_dir.as_os_str().is_empty() {
            return Err(GlyphError::Configuration(
                "model directory is empty".to_string(),
            ));
        }
        if self.language.is_empty() {
            return Err(GlyphError::Configuration("language is empty".to_string()));
        }
        Ok(())
    }

    fn init(&mut self) {
        let code = tesseract_code(&self.language);
        match B::init(&self.model_dir, code) {
            Ok(backend) => {
                info!(
                    language = %self.language,
                    code,
                    model_dir = %self.model_dir.display(),
                    "OCR engine initialized"
                );
                self.state = EngineState::Ready(backend);
            }
            Err(e) => {
                warn!(
                    language = %self.language,
                    model_dir = %self.model_dir.display(),
                    error = %e,
                    "OCR engine initialization failed"
                );
                self.error = INIT_FAILED.to_string();
                self.state = EngineState::Failed(e.to_string());
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.state, EngineState::Ready(_))
    }

    /// The most recent error message, empty if none.
    pub fn last_error(&self) -> &str {
        &self.error
    }

    /// Why initialization failed, as reported by the backend.
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.state {
            EngineState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn language(&self) -> &LanguageId {
        &self.language
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Recognize the text in `bitmap`, trimmed.
    ///
    /// Returns an empty string when the engine is not ready or the bitmap is
    /// empty (leaving `last_error` untouched), when preprocessing fails, or
    /// when nothing was recognized (setting `last_error`).
    pub fn recognize(&mut self, bitmap: &Bitmap) -> String {
        let EngineState::Ready(backend) = &mut self.state else {
            debug!("Recognition requested on an engine that is not ready");
            return String::new();
        };
        if bitmap.is_empty() {
            debug!("Recognition requested on an empty bitmap");
            return String::new();
        }

        self.error.clear();

        let raster = match self.preprocessor.prepare(bitmap) {
            Ok(raster) => raster,
            Err(e) => {
                warn!(error = %e, "Preprocessing failed");
                return String::new();
            }
        };
        trace!(
            width = raster.width(),
            height = raster.height(),
            "Preprocessed raster for OCR"
        );

        let text = run_backend(backend, &raster);
        drop(raster);
        trace!("Released preprocessed raster");

        match text {
            Ok(text) => {
                let trimmed = text.trim().to_string();
                if trimmed.is_empty() {
                    self.error = NO_TEXT.to_string();
                }
                trimmed
            }
            Err(e) => {
                warn!(error = %e, "Recognition failed");
                self.error = NO_TEXT.to_string();
                String::new()
            }
        }
    }
}

fn run_backend<B: RecognitionBackend>(backend: &mut B, raster: &Raster) -> Result<String> {
    let text = backend
        .set_image(raster)
        .and_then(|()| backend.utf8_text());
    backend.clear();
    trace!("Cleared engine session");
    text
}
