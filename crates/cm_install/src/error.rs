//! Error types for installation planning.
//!
//! All fallible functions in this crate return [`Result<T>`], which uses [`Error`]
//! as the error type. External error types (`std::io::Error`, `serde_json::Error`)
//! are automatically converted via `From` impls.
//!
//! Most of these errors never abort a batch: the planner turns a failing entry
//! into a skipped one and keeps going with its siblings.

use crate::kind::ContentKind;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving or planning an installation.
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem I/O failed (walking a payload, scanning the library).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a `ui_*.json` description.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload is missing a file it was expected to have.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// A layout `models*.ini` could not be parsed.
    #[error("Malformed ini {path} (line {line}): {message}")]
    MalformedIni {
        path: String,
        line: usize,
        message: String,
    },

    /// The object library could not answer a lookup.
    #[error("Library error: {0}")]
    Library(String),

    /// No directory could be allocated for a new object.
    #[error("Cannot resolve destination for {kind} '{id}': {reason}")]
    DestinationUnavailable {
        kind: ContentKind,
        id: String,
        reason: String,
    },

    /// Disabling or re-enabling a generic mod failed.
    #[error("Failed to toggle mod '{name}': {message}")]
    ModToggle { name: String, message: String },

    /// A directory the library expects is missing.
    #[error("Directory not found: {0}")]
    DirectoryNotFound(Utf8PathBuf),

    /// The operation was cancelled before it could complete.
    #[error("Operation cancelled")]
    Cancelled,

    /// Failed to acquire a poisoned mutex.
    #[error("Failed to acquire mutex lock")]
    MutexLockFailed,

    /// Catch-all for errors from external collaborators.
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

/// Extension trait for converting `Result<T, PoisonError>` into [`Result<T>`].
pub trait MutexResultExt<T> {
    fn mutex_err(self) -> Result<T>;
}

impl<T, E> MutexResultExt<T> for std::result::Result<T, std::sync::PoisonError<E>> {
    fn mutex_err(self) -> Result<T> {
        self.map_err(|_| Error::MutexLockFailed)
    }
}
