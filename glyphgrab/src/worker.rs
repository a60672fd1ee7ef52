//! Keeps one recognition engine per language warm for a model directory.
//!
//! Capture applications recognize many regions in a row, usually in the same
//! language, and initializing Tesseract is far slower than a recognition. The
//! worker caches engines by language and drops the ones that were last used
//! in an older settings generation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::OcrConfig;
use crate::error::{GlyphError, Result};
use crate::language::LanguageId;
use crate::memory::{MemoryProbe, SystemMemoryProbe};
use crate::ocr::{
    Bitmap, OcrEngine, Preprocessor, RecognitionBackend, ScalePlanner, ScaleSettings, INIT_FAILED,
};

pub const MODEL_DIR_UNSET: &str = "model directory is not set";
pub const LANGUAGE_UNSET: &str = "language is not set";

/// One bitmap to recognize.
#[derive(Debug, Clone)]
pub struct RecognitionTask {
    pub language: LanguageId,
    pub bitmap: Bitmap,
    /// Settings generation the task was issued under.
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionOutcome {
    pub text: String,
    pub error: Option<String>,
    pub generation: u64,
}

impl RecognitionOutcome {
    fn failed(error: impl Into<String>, generation: u64) -> Self {
        Self {
            text: String::new(),
            error: Some(error.into()),
            generation,
        }
    }
}

pub struct RecognitionWorker<B: RecognitionBackend> {
    engines: HashMap<LanguageId, OcrEngine<B>>,
    last_generations: HashMap<LanguageId, u64>,
    model_dir: PathBuf,
    settings: ScaleSettings,
    probe: Arc<dyn MemoryProbe>,
}

impl<B: RecognitionBackend> RecognitionWorker<B> {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self::with_probe(
            model_dir,
            ScaleSettings::default(),
            Arc::new(SystemMemoryProbe::default()),
        )
    }

    pub fn with_probe(
        model_dir: impl Into<PathBuf>,
        settings: ScaleSettings,
        probe: Arc<dyn MemoryProbe>,
    ) -> Self {
        Self {
            engines: HashMap::new(),
            last_generations: HashMap::new(),
            model_dir: model_dir.into(),
            settings,
            probe,
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::with_probe(
            &config.model_dir,
            config.scale_settings(),
            Arc::new(SystemMemoryProbe::default()),
        )
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn engine_count(&self) -> usize {
        self.engines.len()
    }

    pub fn has_engine(&self, language: &LanguageId) -> bool {
        self.engines.contains_key(language)
    }

    pub fn handle(&mut self, task: RecognitionTask) -> RecognitionOutcome {
        let RecognitionTask {
            language,
            bitmap,
            generation,
        } = task;

        if self.model_dir.as_os_str().is_empty() {
            return RecognitionOutcome::failed(MODEL_DIR_UNSET, generation);
        }
        if language.is_empty() {
            return RecognitionOutcome::failed(LANGUAGE_UNSET, generation);
        }

        let model_dir = &self.model_dir;
        let settings = self.settings;
        let probe = &self.probe;
        let engine = self.engines.entry(language.clone()).or_insert_with(|| {
            debug!(language = %language, "Creating OCR engine");
            let preprocessor =
                Preprocessor::new(ScalePlanner::new(settings, Arc::clone(probe)));
            OcrEngine::with_preprocessor(&language, model_dir, preprocessor)
        });

        if !engine.is_valid() {
            let error = match engine.last_error() {
                "" => INIT_FAILED.to_string(),
                message => message.to_string(),
            };
            self.engines.remove(&language);
            self.last_generations.remove(&language);
            return RecognitionOutcome::failed(error, generation);
        }

        let text = engine.recognize(&bitmap);
        let error = Some(engine.last_error())
            .filter(|message| !message.is_empty())
            .map(str::to_string);

        self.last_generations.insert(language, generation);
        self.remove_unused(generation);

        RecognitionOutcome {
            text,
            error,
            generation,
        }
    }

    /// Drop every engine last used before `current`.
    pub fn remove_unused(&mut self, current: u64) {
        let last_generations = &mut self.last_generations;
        self.engines.retain(|language, _| {
            let keep = last_generations
                .get(language)
                .is_some_and(|&generation| generation >= current);
            if !keep {
                debug!(language = %language, "Removing unused OCR engine");
                last_generations.remove(language);
            }
            keep
        });
    }

    /// Drop every engine and switch to another model directory.
    pub fn reset(&mut self, model_dir: impl Into<PathBuf>) {
        self.engines.clear();
        self.last_generations.clear();
        self.model_dir = model_dir.into();
        info!(model_dir = %self.model_dir.display(), "OCR worker reset");
    }
}

/// Shares a [`RecognitionWorker`] between async tasks.
///
/// Recognition is CPU bound and the engines are not reentrant, so each task
/// runs on the blocking pool while holding the worker lock.
pub struct AsyncRecognizer<B: RecognitionBackend> {
    worker: Arc<Mutex<RecognitionWorker<B>>>,
}

impl<B: RecognitionBackend + 'static> AsyncRecognizer<B> {
    pub fn new(worker: RecognitionWorker<B>) -> Self {
        Self {
            worker: Arc::new(Mutex::new(worker)),
        }
    }

    pub async fn recognize(&self, task: RecognitionTask) -> Result<RecognitionOutcome> {
        let worker = Arc::clone(&self.worker);

        tokio::task::spawn_blocking(move || {
            let mut worker = worker.blocking_lock();
            worker.handle(task)
        })
        .await
        .map_err(|e| GlyphError::Internal(format!("OCR task panicked: {e}")))
    }

    pub async fn reset(&self, model_dir: impl Into<PathBuf>) {
        self.worker.lock().await.reset(model_dir);
    }

    pub async fn engine_count(&self) -> usize {
        self.worker.lock().await.engine_count()
    }
}

impl<B: RecognitionBackend> Clone for AsyncRecognizer<B> {
    fn clone(&self) -> Self {
        Self {
            worker: Arc::clone(&self.worker),
        }
    }
}
