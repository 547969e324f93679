//! Project path functions - single source of truth for all file paths.
//!
//! ## Environment Variables
//!
//! - `DATA_DIR`: Override the base data directory (default: "data")
//!
//! This allows running multiple isolated server instances side by side:
//! ```bash
//! DATA_DIR=data/test PORT=5001 cargo run
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Lazily initialized data directory from DATA_DIR env var
static DATA_DIR_VALUE: OnceLock<String> = OnceLock::new();

/// Get the base data directory (from DATA_DIR env var or default "data")
pub fn data_dir() -> &'static str {
    DATA_DIR_VALUE.get_or_init(|| env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()))
}

/// SQLite database path
pub fn db_path() -> String {
    format!("{}/lms.db", data_dir())
}

// ==================== Upload Paths ====================

/// Default upload root, served under the same URL prefix
pub const UPLOADS_DIR: &str = "uploads";

/// Profile pictures
pub const IMAGES_SUBDIR: &str = "images";

/// Lecture notes (pdf, docx, ...)
pub const LECTURE_NOTES_SUBDIR: &str = "lectureNotes";

/// Topic content JSON documents
pub const CONTENTS_SUBDIR: &str = "contents";

/// Quiz question and solution files
pub const QUIZZES_SUBDIR: &str = "quizzes";

/// All upload sub-directories, created at startup
pub const UPLOAD_SUBDIRS: [&str; 4] = [
    IMAGES_SUBDIR,
    LECTURE_NOTES_SUBDIR,
    CONTENTS_SUBDIR,
    QUIZZES_SUBDIR,
];

/// Get an upload sub-directory below the given root
pub fn upload_subdir(root: &Path, subdir: &str) -> PathBuf {
    root.join(subdir)
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    // Note: We can't easily test env var override because OnceLock
    // initializes once. These tests verify the default behavior.

    #[test]
    fn test_data_dir_default() {
        let dir = data_dir();
        assert!(!dir.is_empty());
    }

    #[test]
    fn test_db_path_format() {
        assert!(db_path().ends_with("/lms.db"));
    }

    #[test]
    fn test_upload_subdir() {
        let dir = upload_subdir(Path::new("uploads"), LECTURE_NOTES_SUBDIR);
        assert_eq!(dir, PathBuf::from("uploads/lectureNotes"));
    }

    #[test]
    fn test_upload_subdirs_are_distinct() {
        let mut dirs = UPLOAD_SUBDIRS.to_vec();
        dirs.sort();
        dirs.dedup();
        assert_eq!(dirs.len(), UPLOAD_SUBDIRS.len());
    }
}
