use thiserror::Error;

#[derive(Error, Debug)]
pub enum GlyphError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Preprocessing error: {0}")]
    Preprocessing(String),

    #[error("Scaling error: {0}")]
    Scaling(String),

    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("Failed to recognize text or no text selected")]
    NoText,

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, GlyphError>;
