use serde::Deserialize;
use std::env;

use crate::language::{self, LanguageId};
use crate::ocr::ScaleSettings;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

pub const DEFAULT_TARGET_DPI: f64 = 500.0;
pub const DEFAULT_MEMORY_BUDGET_FRACTION: f64 = 0.95;
pub const DEFAULT_MODEL_EXTENSION: &str = "traineddata";

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Directory holding `<code>.traineddata` files. Empty means unset.
    pub model_dir: String,
    pub language: String,
    pub target_dpi: f64,
    pub memory_budget_fraction: f64,
    pub model_extension: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: env::var("OCR_MODEL_DIR").unwrap_or_default(),
            language: env::var("OCR_LANGUAGE").unwrap_or_else(|_| "eng".to_string()),
            target_dpi: parse_env_or("OCR_TARGET_DPI", DEFAULT_TARGET_DPI),
            memory_budget_fraction: parse_env_or(
                "OCR_MEMORY_BUDGET",
                DEFAULT_MEMORY_BUDGET_FRACTION,
            ),
            model_extension: env::var("OCR_MODEL_EXTENSION")
                .unwrap_or_else(|_| DEFAULT_MODEL_EXTENSION.to_string()),
        }
    }
}

impl OcrConfig {
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Language recognized when the caller does not pick one.
    pub fn language_id(&self) -> LanguageId {
        LanguageId::from(self.language.trim())
    }

    /// Languages with a `<code>.<model_extension>` model in `model_dir`.
    pub fn available_languages(&self) -> Vec<LanguageId> {
        language::available_languages(&self.model_dir, &self.model_extension)
    }

    /// Planner tuning derived from this config, with out-of-range values
    /// replaced by the defaults.
    pub fn scale_settings(&self) -> ScaleSettings {
        let target_dpi = if self.target_dpi.is_finite() && self.target_dpi > 0.0 {
            self.target_dpi
        } else {
            tracing::warn!(
                "Invalid target DPI {}. Using default {}.",
                self.target_dpi,
                DEFAULT_TARGET_DPI
            );
            DEFAULT_TARGET_DPI
        };

        let fraction = self.memory_budget_fraction;
        let memory_budget_fraction = if fraction > 0.0 && fraction <= 1.0 {
            fraction
        } else {
            tracing::warn!(
                "Invalid memory budget fraction {}. Using default {}.",
                fraction,
                DEFAULT_MEMORY_BUDGET_FRACTION
            );
            DEFAULT_MEMORY_BUDGET_FRACTION
        };

        ScaleSettings {
            target_dpi,
            memory_budget_fraction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "OCR_MODEL_DIR",
            "OCR_LANGUAGE",
            "OCR_TARGET_DPI",
            "OCR_MEMORY_BUDGET",
            "OCR_MODEL_EXTENSION",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_ocr_config_defaults() {
        clear_env();

        let config = OcrConfig::default();
        assert!(config.model_dir.is_empty());
        assert_eq!(config.language, "eng");
        assert_eq!(config.target_dpi, 500.0);
        assert_eq!(config.memory_budget_fraction, 0.95);
        assert_eq!(config.model_extension, "traineddata");
    }

    #[test]
    #[serial]
    fn test_ocr_config_from_env() {
        clear_env();
        env::set_var("OCR_MODEL_DIR", "/usr/share/tessdata");
        env::set_var("OCR_LANGUAGE", "deu");
        env::set_var("OCR_TARGET_DPI", "300");
        env::set_var("OCR_MEMORY_BUDGET", "0.5");

        let config = OcrConfig::from_env();
        assert_eq!(config.model_dir, "/usr/share/tessdata");
        assert_eq!(config.language, "deu");
        assert_eq!(config.target_dpi, 300.0);
        assert_eq!(config.memory_budget_fraction, 0.5);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_env_value_falls_back_to_default() {
        clear_env();
        env::set_var("OCR_TARGET_DPI", "lots");

        let config = OcrConfig::from_env();
        assert_eq!(config.target_dpi, DEFAULT_TARGET_DPI);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_scale_settings_replaces_out_of_range_values() {
        clear_env();
        let config = OcrConfig {
            target_dpi: -10.0,
            memory_budget_fraction: 1.5,
            ..OcrConfig::default()
        };

        let settings = config.scale_settings();
        assert_eq!(settings.target_dpi, DEFAULT_TARGET_DPI);
        assert_eq!(settings.memory_budget_fraction, DEFAULT_MEMORY_BUDGET_FRACTION);
    }

    #[test]
    #[serial]
    fn test_scale_settings_keeps_valid_values() {
        clear_env();
        let config = OcrConfig {
            target_dpi: 300.0,
            memory_budget_fraction: 0.8,
            ..OcrConfig::default()
        };

        let settings = config.scale_settings();
        assert_eq!(settings.target_dpi, 300.0);
        assert_eq!(settings.memory_budget_fraction, 0.8);
    }

    #[test]
    #[serial]
    fn test_language_id_from_config() {
        clear_env();
        env::set_var("OCR_LANGUAGE", " zho ");

        let config = OcrConfig::from_env();
        assert_eq!(config.language_id(), LanguageId::from("zho"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_available_languages_use_model_extension() {
        clear_env();
        let dir = tempfile::TempDir::new().unwrap();
        for file in ["eng.traineddata", "deu.best", "chi_sim.best"] {
            std::fs::write(dir.path().join(file), b"model").unwrap();
        }

        let config = OcrConfig {
            model_dir: dir.path().to_string_lossy().into_owned(),
            model_extension: "best".to_string(),
            ..OcrConfig::default()
        };
        assert_eq!(
            config.available_languages(),
            vec![LanguageId::from("deu"), LanguageId::from("zho")]
        );

        let config = OcrConfig {
            model_extension: DEFAULT_MODEL_EXTENSION.to_string(),
            ..config
        };
        assert_eq!(config.available_languages(), vec![LanguageId::from("eng")]);
    }
}
