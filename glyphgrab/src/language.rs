//! Language identifiers and their Tesseract model codes.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

/// Opaque name of a human language, normally an ISO 639-2 code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct LanguageId(String);

impl LanguageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for LanguageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for LanguageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct LanguageCode {
    id: &'static str,
    tesseract: &'static str,
    name: &'static str,
}

const fn code(id: &'static str, tesseract: &'static str, name: &'static str) -> LanguageCode {
    LanguageCode {
        id,
        tesseract,
        name,
    }
}

const LANGUAGES: &[LanguageCode] = &[
    code("ara", "ara", "Arabic"),
    code("ces", "ces", "Czech"),
    code("dan", "dan", "Danish"),
    code("deu", "deu", "German"),
    code("ell", "ell", "Greek"),
    code("eng", "eng", "English"),
    code("fin", "fin", "Finnish"),
    code("fra", "fra", "French"),
    code("heb", "heb", "Hebrew"),
    code("hin", "hin", "Hindi"),
    code("hun", "hun", "Hungarian"),
    code("ind", "ind", "Indonesian"),
    code("ita", "ita", "Italian"),
    code("jpn", "jpn", "Japanese"),
    code("kor", "kor", "Korean"),
    code("nld", "nld", "Dutch"),
    code("nor", "nor", "Norwegian"),
    code("pol", "pol", "Polish"),
    code("por", "por", "Portuguese"),
    code("ron", "ron", "Romanian"),
    code("rus", "rus", "Russian"),
    code("spa", "spa", "Spanish"),
    code("swe", "swe", "Swedish"),
    code("tha", "tha", "Thai"),
    code("tur", "tur", "Turkish"),
    code("ukr", "ukr", "Ukrainian"),
    code("vie", "vie", "Vietnamese"),
    code("zho", "chi_sim", "Chinese (Simplified)"),
    code("zho_hant", "chi_tra", "Chinese (Traditional)"),
];

/// Tesseract model code for `id`. Unknown ids are passed through unchanged.
pub fn tesseract_code(id: &LanguageId) -> &str {
    LANGUAGES
        .iter()
        .find(|lang| lang.id == id.as_str())
        .map(|lang| lang.tesseract)
        .unwrap_or_else(|| id.as_str())
}

/// Language id for a Tesseract model code, the code itself when unknown.
pub fn id_for_tesseract(code: &str) -> LanguageId {
    LANGUAGES
        .iter()
        .find(|lang| lang.tesseract == code)
        .map(|lang| LanguageId::from(lang.id))
        .unwrap_or_else(|| LanguageId::from(code))
}

/// English display name of a known language.
pub fn name(id: &LanguageId) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|lang| lang.id == id.as_str())
        .map(|lang| lang.name)
}

/// Languages with a trained model in `model_dir`.
///
/// Every regular file named `<code>.<...>.<extension>` counts, with `<code>`
/// being the file name up to its first dot. The result is sorted and free of
/// duplicates; an unreadable or missing directory gives an empty list.
pub fn available_languages(model_dir: impl AsRef<Path>, extension: &str) -> Vec<LanguageId> {
    let model_dir = model_dir.as_ref();
    if model_dir.as_os_str().is_empty() || !model_dir.is_dir() {
        return Vec::new();
    }

    let entries = match std::fs::read_dir(model_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(
                model_dir = %model_dir.display(),
                error = %e,
                "Cannot list model directory"
            );
            return Vec::new();
        }
    };

    let suffix = format!(".{extension}");
    let mut languages: Vec<LanguageId> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|file_name| file_name.ends_with(&suffix))
        .filter_map(|file_name| {
            let code = file_name.split('.').next()?;
            (!code.is_empty()).then(|| id_for_tesseract(code))
        })
        .collect();

    languages.sort();
    languages.dedup();
    languages
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_tesseract_code_mapping() {
        assert_eq!(tesseract_code(&LanguageId::from("eng")), "eng");
        assert_eq!(tesseract_code(&LanguageId::from("zho")), "chi_sim");
        assert_eq!(tesseract_code(&LanguageId::from("zho_hant")), "chi_tra");
    }

    #[test]
    fn test_unknown_language_passes_through() {
        assert_eq!(tesseract_code(&LanguageId::from("frk")), "frk");
        assert_eq!(id_for_tesseract("frk"), LanguageId::from("frk"));
        assert_eq!(name(&LanguageId::from("frk")), None);
    }

    #[test]
    fn test_id_for_tesseract() {
        assert_eq!(id_for_tesseract("chi_sim"), LanguageId::from("zho"));
        assert_eq!(id_for_tesseract("deu"), LanguageId::from("deu"));
    }

    #[test]
    fn test_language_names() {
        assert_eq!(name(&LanguageId::from("eng")), Some("English"));
        assert_eq!(name(&LanguageId::from("zho")), Some("Chinese (Simplified)"));
    }

    #[test]
    fn test_language_table_ids_are_unique() {
        for (i, lang) in LANGUAGES.iter().enumerate() {
            assert!(
                LANGUAGES[i + 1..].iter().all(|other| other.id != lang.id
                    && other.tesseract != lang.tesseract),
                "duplicate entry for {}",
                lang.id
            );
        }
    }

    #[test]
    fn test_available_languages_scans_model_files() {
        let dir = TempDir::new().unwrap();
        for file in [
            "eng.traineddata",
            "chi_sim.traineddata",
            "deu.best.traineddata",
            "deu.traineddata",
            "notes.txt",
            "fra.traineddata.bak",
        ] {
            fs::write(dir.path().join(file), b"model").unwrap();
        }
        fs::create_dir(dir.path().join("rus.traineddata")).unwrap();

        let languages = available_languages(dir.path(), "traineddata");
        assert_eq!(
            languages,
            vec![
                LanguageId::from("deu"),
                LanguageId::from("eng"),
                LanguageId::from("zho"),
            ]
        );
    }

    #[test]
    fn test_available_languages_missing_directory() {
        assert!(available_languages("/nonexistent/tessdata", "traineddata").is_empty());
        assert!(available_languages("", "traineddata").is_empty());
    }

    #[test]
    fn test_available_languages_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert!(available_languages(dir.path(), "traineddata").is_empty());
    }

    #[test]
    fn test_language_id_basics() {
        let id = LanguageId::new("eng");
        assert_eq!(id.as_str(), "eng");
        assert_eq!(id.to_string(), "eng");
        assert!(!id.is_empty());
        assert!(LanguageId::default().is_empty());
    }
}
