//! Track `models*.ini` parsing.
//!
//! A layout lists its 3D models as `[MODEL_n]` sections:
//!
//! ```text
//! [MODEL_0]
//! FILE=monza.kn5
//! POSITION=0,0,0
//! ROTATION=0,0,0
//! ```
//!
//! Only the `FILE` keys of `MODEL` sections matter for installation.

use crate::error::{Error, Result};
use cm_core::paths;

/// Model file name of a layout: `models.ini` for the base layout, `models_<id>.ini` otherwise.
pub fn models_ini_name(layout_id: &str) -> String {
    if layout_id.is_empty() {
        "models.ini".to_string()
    } else {
        format!("models_{layout_id}.ini")
    }
}

/// Whether a root-level file name is a layout models ini.
pub fn is_models_ini(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    lower == "models.ini" || (lower.starts_with("models_") && lower.ends_with(".ini"))
}

/// Parse the model files a layout references, deduplicated case-insensitively.
///
/// `path` is only used for error reporting.
pub fn parse_models_ini(path: &str, text: &str) -> Result<Vec<String>> {
    let mut section = String::new();
    let mut files: Vec<String> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix('[') {
            let Some(name) = rest.strip_suffix(']') else {
                return Err(malformed(path, idx, "unterminated section header"));
            };
            section = name.trim().to_uppercase();
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(malformed(path, idx, "expected KEY=VALUE"));
        };

        if section.starts_with("MODEL") && key.trim().eq_ignore_ascii_case("FILE") {
            let value = value.trim();
            if value.is_empty() {
                return Err(malformed(path, idx, "empty FILE value"));
            }
            if !files.iter().any(|f| paths::eq_ignore_case(f, value)) {
                files.push(value.to_string());
            }
        }
    }

    Ok(files)
}

fn strip_comment(line: &str) -> &str {
    let mut end = line.len();
    for marker in [";", "//"] {
        if let Some(idx) = line.find(marker) {
            end = end.min(idx);
        }
    }
    if line.trim_start().starts_with('#') {
        return "";
    }
    &line[..end]
}

fn malformed(path: &str, idx: usize, message: &str) -> Error {
    Error::MalformedIni {
        path: path.to_string(),
        line: idx + 1,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_model_files() {
        let text = "[MODEL_0]\nFILE=monza.kn5\nPOSITION=0,0,0\n\n[model_1]\nfile = Monza_Trees.kn5 ; trees\n[MODEL_2]\nFILE=monza.KN5\n";
        let files = parse_models_ini("models.ini", text).unwrap();
        assert_eq!(files, vec!["monza.kn5", "Monza_Trees.kn5"]);
    }

    #[test]
    fn test_ignores_other_sections() {
        let text = "[HEADER]\nFILE=not_a_model.kn5\n[MODEL_0]\nFILE=a.kn5\n";
        assert_eq!(parse_models_ini("models.ini", text).unwrap(), vec!["a.kn5"]);
    }

    #[test]
    fn test_malformed_line() {
        let err = parse_models_ini("models_gp.ini", "[MODEL_0]\nFILE=a.kn5\ngarbage\n").unwrap_err();
        match err {
            Error::MalformedIni { path, line, .. } => {
                assert_eq!(path, "models_gp.ini");
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unterminated_section() {
        assert!(parse_models_ini("models.ini", "[MODEL_0\nFILE=a.kn5").is_err());
    }

    #[test]
    fn test_ini_names() {
        assert_eq!(models_ini_name(""), "models.ini");
        assert_eq!(models_ini_name("gp"), "models_gp.ini");
        assert!(is_models_ini("Models_GP.ini"));
        assert!(!is_models_ini("surfaces.ini"));
    }
}
