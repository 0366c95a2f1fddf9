//! Payload path helpers.
//!
//! Payload keys are relative paths with `/` separators, regardless of whether
//! they came from a directory walk on Windows or from an archive listing. Game
//! content lives on a case-insensitive filesystem, so every comparison here
//! ignores case while the returned strings keep their original spelling.

use camino::{Utf8Path, Utf8PathBuf};

/// Normalize a payload path into key form.
///
/// Backslashes become `/`, empty and `.` segments are dropped and `..` pops the
/// previous segment (never escaping the root):
///
/// - `ui\\ui_car.json` -> `ui/ui_car.json`
/// - `/data/./car.ini/` -> `data/car.ini`
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

/// Lowercase form used as a set/map key for case-insensitive lookups.
pub fn fold_case(value: &str) -> String {
    value.to_lowercase()
}

/// Normalized, case-folded key under which two spellings of a path collide.
pub fn path_key(path: &str) -> String {
    fold_case(&normalize(path))
}

/// Case-insensitive equality of two strings.
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Whether two payload paths point to the same location.
pub fn are_same(a: &str, b: &str) -> bool {
    eq_ignore_case(&normalize(a), &normalize(b))
}

/// Whether `path` is `prefix` itself or lies somewhere below it.
///
/// An empty prefix stands for the payload root and affects every path.
pub fn is_affected_by(path: &str, prefix: &str) -> bool {
    let prefix = normalize(prefix);
    if prefix.is_empty() {
        return true;
    }
    let path = path_key(path);
    let prefix = fold_case(&prefix);
    path == prefix
        || (path.len() > prefix.len()
            && path.starts_with(&prefix)
            && path.as_bytes()[prefix.len()] == b'/')
}

/// Path of `path` relative to `base`, or `None` when it is not under `base`.
///
/// The original spelling of the remaining segments is preserved.
pub fn relative_path(path: &str, base: &str) -> Option<String> {
    let path = normalize(path);
    let base = normalize(base);
    if base.is_empty() {
        return Some(path);
    }
    if !is_affected_by(&path, &base) {
        return None;
    }
    if path.len() == base.len() {
        return Some(String::new());
    }
    Some(path[base.len() + 1..].to_string())
}

/// Last segment of a payload path.
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    match trimmed.rfind(['/', '\\']) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Everything before the last segment; empty for root-level paths.
pub fn parent_dir(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    match trimmed.rfind(['/', '\\']) {
        Some(idx) => &trimmed[..idx],
        None => "",
    }
}

/// Case-insensitive extension check; `ext` is given without the dot.
pub fn has_extension(path: &str, ext: &str) -> bool {
    let name = file_name(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 => eq_ignore_case(&name[idx + 1..], ext),
        _ => false,
    }
}

/// Join a normalized relative key onto a destination directory.
pub fn join_relative(destination: &Utf8Path, relative: &str) -> Utf8PathBuf {
    let mut result = destination.to_path_buf();
    for segment in normalize(relative).split('/').filter(|s| !s.is_empty()) {
        result.push(segment);
    }
    result
}
