//! Core shared logic for content installation.
//!
//! This crate provides the small, dependency-light helpers used by both the
//! `cm_install` engine and the `content-manager` CLI: payload path handling
//! and the lenient version comparator used to tell updates from downgrades.

pub mod paths;
pub mod version;

pub use paths::{
    are_same, eq_ignore_case, file_name, fold_case, has_extension, is_affected_by, join_relative,
    normalize, parent_dir, relative_path,
};
pub use version::{
    compare_versions, is_version_newer_than, is_version_older_than, parse_version,
    ContentVersion,
};
