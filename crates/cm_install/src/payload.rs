//! Payload abstraction.
//!
//! A payload is the set of files offered for installation: an unpacked
//! archive, a dropped folder, or anything else that can list relative keys and
//! read small text files (ui descriptions, layout inis). Archive readers live
//! outside this crate and only need to implement [`Payload`].
//!
//! Keys are normalized with [`cm_core::paths::normalize`]: relative, `/`
//! separated, no leading or trailing separator.

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use cm_core::paths;
use std::collections::{BTreeSet, HashMap};
use walkdir::WalkDir;

pub trait Payload: Send + Sync {
    /// All file keys in the payload.
    fn files(&self) -> &[String];

    /// Read a file as text. Invalid UTF-8 is replaced rather than rejected.
    fn read_text(&self, key: &str) -> Result<String>;

    /// Name of the payload itself (folder or archive name), used as the id of
    /// content that sits at the payload root.
    fn root_name(&self) -> Option<String> {
        None
    }

    /// Every directory implied by the file keys, excluding the root.
    fn directories(&self) -> Vec<String> {
        let mut dirs = BTreeSet::new();
        for file in self.files() {
            let mut parent = paths::parent_dir(file);
            while !parent.is_empty() {
                if !dirs.insert(parent.to_string()) {
                    break;
                }
                parent = paths::parent_dir(parent);
            }
        }
        dirs.into_iter().collect()
    }
}

/// A payload backed by a directory on disk.
pub struct FsPayload {
    root: Utf8PathBuf,
    files: Vec<String>,
}

impl FsPayload {
    /// Walk `root` and index every file under it.
    pub fn open(root: impl Into<Utf8PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.as_std_path().is_dir() {
            return Err(Error::DirectoryNotFound(root));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root.as_std_path()).follow_links(false) {
            let entry = entry.map_err(|e| Error::Io(std::io::Error::other(e)))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = match Utf8PathBuf::from_path_buf(entry.into_path()) {
                Ok(p) => p,
                Err(p) => {
                    tracing::warn!("Skipping non-UTF-8 payload path: {}", p.display());
                    continue;
                }
            };
            let Ok(relative) = path.strip_prefix(&root) else {
                continue;
            };
            files.push(paths::normalize(relative.as_str()));
        }
        files.sort();

        tracing::debug!("Indexed {} payload files under {}", files.len(), root);
        Ok(Self { root, files })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

impl Payload for FsPayload {
    fn files(&self) -> &[String] {
        &self.files
    }

    fn read_text(&self, key: &str) -> Result<String> {
        let path = paths::join_relative(&self.root, key);
        let bytes = std::fs::read(path.as_std_path())?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn root_name(&self) -> Option<String> {
        self.root.file_name().map(str::to_string)
    }
}

/// An in-memory payload, for archive listings and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryPayload {
    name: Option<String>,
    files: Vec<String>,
    contents: HashMap<String, String>,
}

impl MemoryPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Add a file whose content is never read.
    pub fn with_file(mut self, key: &str) -> Self {
        self.push(key);
        self
    }

    /// Add several files whose contents are never read.
    pub fn with_files<'a, I>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        for key in keys {
            self.push(key);
        }
        self
    }

    /// Add a file with text content.
    pub fn with_text(mut self, key: &str, content: &str) -> Self {
        let key = self.push(key);
        self.contents.insert(paths::fold_case(&key), content.to_string());
        self
    }

    fn push(&mut self, key: &str) -> String {
        let key = paths::normalize(key);
        if !self.files.iter().any(|f| paths::eq_ignore_case(f, &key)) {
            self.files.push(key.clone());
        }
        key
    }
}

impl Payload for MemoryPayload {
    fn files(&self) -> &[String] {
        &self.files
    }

    fn read_text(&self, key: &str) -> Result<String> {
        self.contents
            .get(&paths::fold_case(&paths::normalize(key)))
            .cloned()
            .ok_or_else(|| Error::InvalidPayload(format!("no content for {key}")))
    }

    fn root_name(&self) -> Option<String> {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_fs_payload_lists_normalized_keys() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("abarth500/ui")).unwrap();
        fs::write(root.join("abarth500/data.acd"), b"acd").unwrap();
        fs::write(root.join("abarth500/ui/ui_car.json"), br#"{"name":"Abarth"}"#).unwrap();

        let root = Utf8PathBuf::from_path_buf(root.to_path_buf()).unwrap();
        let payload = FsPayload::open(root).unwrap();
        assert_eq!(
            payload.files(),
            &["abarth500/data.acd".to_string(), "abarth500/ui/ui_car.json".to_string()]
        );
        assert_eq!(
            payload.read_text("abarth500/ui/ui_car.json").unwrap(),
            r#"{"name":"Abarth"}"#
        );
    }

    #[test]
    fn test_fs_payload_missing_root() {
        let dir = tempdir().unwrap();
        let missing = Utf8PathBuf::from_path_buf(dir.path().join("nope")).unwrap();
        assert!(matches!(
            FsPayload::open(missing),
            Err(Error::DirectoryNotFound(_))
        ));
    }

    #[test]
    fn test_directories_are_derived() {
        let payload = MemoryPayload::new().with_files(["a/b/c.txt", "a/d.txt", "e.txt"]);
        assert_eq!(payload.directories(), vec!["a".to_string(), "a/b".to_string()]);
    }

    #[test]
    fn test_memory_payload_reads_case_insensitively() {
        let payload = MemoryPayload::new().with_text("Track\\Models.ini", "[MODEL_0]");
        assert_eq!(payload.files(), &["Track/Models.ini".to_string()]);
        assert_eq!(payload.read_text("track/models.ini").unwrap(), "[MODEL_0]");
        assert!(payload.read_text("track/other.ini").is_err());
    }
}
