// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Path Normalizer Domain Service
//!
//! Canonicalizes the file paths carried by deltas before conflict detection.
//! Two spellings of one file (`./src/a.rs`, `src//a.rs`) must collide, or the
//! reconciler would miss a genuine overlap.
//!
//! Paths are logical, `/`-separated strings; nothing here touches the
//! filesystem.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements path canonicalization for delta file sets

use thiserror::Error;

/// Path normalization errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathNormalizerError {
    #[error("Empty path")]
    Empty,

    #[error("Path traversal attempt detected: {0}")]
    PathTraversal(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path too long: {0}")]
    PathTooLong(String),
}

/// Path normalizer domain service
///
/// # Guarantees
/// - Rejects paths containing `..` components and NUL bytes
/// - Treats `\` as an ordinary filename character (`dir\file` is not `dir/file`)
/// - Drops `.` components and repeated separators
/// - Keeps absolute and relative paths distinct (`/a` is not `a`)
pub struct PathNormalizer {
    /// Maximum allowed path length (default: 4096)
    max_path_len: usize,
}

impl PathNormalizer {
    pub fn new() -> Self {
        Self { max_path_len: 4096 }
    }

    pub fn with_max_length(max_path_len: usize) -> Self {
        Self { max_path_len }
    }

    /// Canonicalize a delta file path.
    ///
    /// # Examples
    /// ```
    /// use kgc_core::domain::path_normalizer::PathNormalizer;
    ///
    /// let normalizer = PathNormalizer::new();
    /// assert_eq!(normalizer.normalize("./src//lib.rs").unwrap(), "src/lib.rs");
    /// assert!(normalizer.normalize("src/../etc/passwd").is_err());
    /// ```
    pub fn normalize(&self, path: &str) -> Result<String, PathNormalizerError> {
        if path.is_empty() {
            return Err(PathNormalizerError::Empty);
        }

        if path.len() > self.max_path_len {
            return Err(PathNormalizerError::PathTooLong(path.to_string()));
        }

        if path.contains('\0') {
            tracing::warn!(path = %path.escape_debug(), "Delta path contains null byte");
            return Err(PathNormalizerError::InvalidPath(
                "Path contains null byte".to_string(),
            ));
        }

        let absolute = path.starts_with('/');

        let mut segments = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    tracing::warn!(
                        path = %path,
                        "Path traversal attempt detected: contains '..' component"
                    );
                    return Err(PathNormalizerError::PathTraversal(path.to_string()));
                }
                part => segments.push(part),
            }
        }

        if segments.is_empty() {
            return Err(PathNormalizerError::InvalidPath(format!(
                "'{}' does not name a file",
                path
            )));
        }

        let joined = segments.join("/");
        Ok(if absolute { format!("/{}", joined) } else { joined })
    }
}

impl Default for PathNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_path() {
        let normalizer = PathNormalizer::new();
        assert_eq!(normalizer.normalize("src/lib.rs").unwrap(), "src/lib.rs");
        assert_eq!(normalizer.normalize("/agent-1/t1.result").unwrap(), "/agent-1/t1.result");
    }

    #[test]
    fn test_reject_parent_dir() {
        let normalizer = PathNormalizer::new();
        let result = normalizer.normalize("/workspace/../etc/passwd");
        assert!(matches!(result, Err(PathNormalizerError::PathTraversal(_))));
    }

    #[test]
    fn test_normalize_current_dir_and_separators() {
        let normalizer = PathNormalizer::new();
        assert_eq!(normalizer.normalize("./a").unwrap(), "a");
        assert_eq!(normalizer.normalize("src//./mod.rs").unwrap(), "src/mod.rs");
        assert_eq!(normalizer.normalize("dir/").unwrap(), "dir");
    }

    #[test]
    fn test_backslash_is_not_a_separator() {
        let normalizer = PathNormalizer::new();
        assert_eq!(normalizer.normalize("dir\\file").unwrap(), "dir\\file");
        assert_ne!(
            normalizer.normalize("dir\\file").unwrap(),
            normalizer.normalize("dir/file").unwrap()
        );
    }

    #[test]
    fn test_absolute_and_relative_stay_distinct() {
        let normalizer = PathNormalizer::new();
        assert_ne!(normalizer.normalize("/a").unwrap(), normalizer.normalize("a").unwrap());
    }

    #[test]
    fn test_rejects_empty_and_root() {
        let normalizer = PathNormalizer::new();
        assert_eq!(normalizer.normalize(""), Err(PathNormalizerError::Empty));
        assert!(matches!(normalizer.normalize("/"), Err(PathNormalizerError::InvalidPath(_))));
        assert!(matches!(normalizer.normalize("./"), Err(PathNormalizerError::InvalidPath(_))));
    }

    #[test]
    fn test_path_too_long() {
        let normalizer = PathNormalizer::with_max_length(10);
        let result = normalizer.normalize("/very/long/path/that/exceeds/limit");
        assert!(matches!(result, Err(PathNormalizerError::PathTooLong(_))));
    }

    #[test]
    fn test_null_byte() {
        let normalizer = PathNormalizer::new();
        assert!(matches!(
            normalizer.normalize("/path\0/with/null"),
            Err(PathNormalizerError::InvalidPath(_))
        ));
    }
}
