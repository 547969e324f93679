//! Uploaded file handling.
//!
//! Multipart bodies are collected fully before anything touches the disk or
//! the database. Files are saved as `{stem}-{uuid}.{ext}` under the upload
//! root and referenced by their public path (`uploads/<subdir>/<name>`), which
//! is also the URL they are served from.
//!
//! Every file saved during a request is registered with an [`UploadGuard`].
//! Unless the guard is committed after the database work succeeds, dropping
//! it deletes those files again.

use axum::body::Bytes;
use axum::extract::Multipart;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::db::LogOnError;
use crate::error::{AppError, AppResult};
use crate::paths::{self, UPLOADS_DIR};

/// A file part of a multipart body
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// A fully read multipart body: text fields and file fields by name
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field.bytes().await?;
                    // browsers send an empty part for an untouched file input
                    if !bytes.is_empty() {
                        form.files.insert(name, UploadedFile { file_name, content_type, bytes });
                    }
                }
                None => {
                    let text = field.text().await?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Text field, empty string when absent
    pub fn text_or_empty(&self, name: &str) -> String {
        self.text(name).unwrap_or_default().to_string()
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}

/// Where an uploaded file belongs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    LectureNote,
    Content,
    Quiz,
}

impl UploadKind {
    pub fn subdir(&self) -> &'static str {
        match self {
            Self::Image => paths::IMAGES_SUBDIR,
            Self::LectureNote => paths::LECTURE_NOTES_SUBDIR,
            Self::Content => paths::CONTENTS_SUBDIR,
            Self::Quiz => paths::QUIZZES_SUBDIR,
        }
    }

    /// Topic files go by type: JSON documents are content, the rest lecture notes
    pub fn for_topic_file(content_type: &str) -> Self {
        if mime_essence(content_type) == "application/json" {
            Self::Content
        } else {
            Self::LectureNote
        }
    }
}

const IMAGE_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/jpg"];

/// `type/subtype` of a Content-Type header, parameters dropped and lowercased
fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// File extension derived from a MIME type, limited to characters safe on disk
pub fn extension_for(content_type: &str) -> String {
    let essence = mime_essence(content_type);
    let subtype = match essence.as_str() {
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        "application/msword" => "doc",
        other => other.rsplit('/').next().unwrap_or_default(),
    };
    let cleaned: String = subtype
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '.' || *c == '+')
        .take(16)
        .collect();
    match cleaned.trim_matches('.') {
        "" => "bin".to_string(),
        ext => ext.to_string(),
    }
}

/// Stem of the client's file name, reduced to characters safe on disk
fn safe_stem(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let cleaned: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(64)
        .collect();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Tracks files written during one request
#[derive(Debug, Default)]
pub struct UploadGuard {
    saved: Vec<PathBuf>,
    committed: bool,
}

impl UploadGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the saved files; the request succeeded
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for path in &self.saved {
            tracing::debug!("Rolling back upload {}", path.display());
            std::fs::remove_file(path).log_warn(&format!("Could not remove {}", path.display()));
        }
    }
}

/// Files below the upload root
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the upload root and its sub-directories
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for subdir in paths::UPLOAD_SUBDIRS {
            std::fs::create_dir_all(paths::upload_subdir(&self.root, subdir))?;
        }
        Ok(())
    }

    /// Save a file and return its public path
    pub fn save(&self, kind: UploadKind, file: &UploadedFile, guard: &mut UploadGuard) -> AppResult<String> {
        if kind == UploadKind::Image && !IMAGE_TYPES.contains(&mime_essence(&file.content_type).as_str()) {
            return Err(AppError::unprocessable("Invalid image type!"));
        }

        let name = format!(
            "{}-{}.{}",
            safe_stem(&file.file_name),
            uuid::Uuid::new_v4(),
            extension_for(&file.content_type)
        );
        let dir = paths::upload_subdir(&self.root, kind.subdir());
        std::fs::create_dir_all(&dir)?;
        let target = dir.join(&name);
        std::fs::write(&target, &file.bytes)?;
        guard.saved.push(target);

        Ok(format!("{}/{}/{}", UPLOADS_DIR, kind.subdir(), name))
    }

    /// Save an optional file
    pub fn save_opt(
        &self,
        kind: UploadKind,
        file: Option<&UploadedFile>,
        guard: &mut UploadGuard,
    ) -> AppResult<Option<String>> {
        file.map(|f| self.save(kind, f, guard)).transpose()
    }

    /// Filesystem location of a public path; None for anything outside the upload tree
    pub fn resolve(&self, stored: &str) -> Option<PathBuf> {
        let rest = stored.strip_prefix(UPLOADS_DIR)?.strip_prefix('/')?;
        let relative = Path::new(rest);
        let safe = relative
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)));
        safe.then(|| self.root.join(relative))
    }

    /// Best-effort delete of a stored file
    pub fn remove(&self, stored: &str) {
        if stored.is_empty() {
            return;
        }
        match self.resolve(stored) {
            Some(path) => {
                if let Err(e) = std::fs::remove_file(&path) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!("Could not remove {}: {}", path.display(), e);
                    }
                }
            }
            None => tracing::warn!("Refusing to remove path outside uploads: {}", stored),
        }
    }

    pub fn remove_all<I, S>(&self, stored: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for file in stored {
            self.remove(file.as_ref());
        }
    }

    /// Parse a stored JSON document. Missing or malformed files read as None.
    pub fn read_json(&self, stored: Option<&str>) -> Option<Value> {
        let path = self.resolve(stored?)?;
        let raw = std::fs::read(&path)
            .log_warn(&format!("Could not read {}", path.display()))?;
        serde_json::from_slice::<Value>(&raw).log_warn(&format!("Invalid JSON in {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file(name: &str, content_type: &str, body: &'static [u8]) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: content_type.to_string(),
            bytes: Bytes::from_static(body),
        }
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("application/pdf"), "pdf");
        assert_eq!(extension_for("application/msword"), "doc");
        assert_eq!(
            extension_for("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
            "docx"
        );
    }

    #[test]
    fn test_extension_drops_parameters_and_unsafe_characters() {
        assert_eq!(extension_for("application/json; charset=utf-8"), "json");
        assert_eq!(extension_for("Image/PNG"), "png");
        assert_eq!(extension_for("text/../../x"), "x");
        assert_eq!(extension_for("text/%00 ;x"), "00");
        assert_eq!(extension_for("garbage"), "garbage");
        assert_eq!(extension_for(""), "bin");
        assert_eq!(extension_for("a/;"), "bin");
    }

    #[test]
    fn test_safe_stem() {
        assert_eq!(safe_stem("My Notes.v2.pdf"), "MyNotesv2");
        assert_eq!(safe_stem("../../etc/passwd"), "passwd");
        assert_eq!(safe_stem("???.pdf"), "file");
    }

    #[test]
    fn test_topic_kind_by_type() {
        assert_eq!(UploadKind::for_topic_file("application/json"), UploadKind::Content);
        assert_eq!(UploadKind::for_topic_file("application/pdf"), UploadKind::LectureNote);
        assert_eq!(
            UploadKind::for_topic_file("application/json; charset=utf-8"),
            UploadKind::Content
        );
    }

    #[test]
    fn test_saved_name_ignores_type_parameters() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::new(temp.path());
        let mut guard = UploadGuard::new();
        let json = file("intro.json", "application/json; charset=utf-8", b"{}");
        let stored = store
            .save(UploadKind::for_topic_file(&json.content_type), &json, &mut guard)
            .unwrap();
        guard.commit();
        assert!(stored.starts_with("uploads/contents/intro-"));
        assert!(stored.ends_with(".json"));
        assert!(store.resolve(&stored).unwrap().exists());
    }

    #[test]
    fn test_committed_upload_is_kept() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::new(temp.path());
        let mut guard = UploadGuard::new();
        let stored = store
            .save(UploadKind::Content, &file("intro.json", "application/json", b"{\"a\":1}"), &mut guard)
            .unwrap();
        guard.commit();

        assert!(stored.starts_with("uploads/contents/intro-"));
        assert!(stored.ends_with(".json"));
        assert_eq!(store.read_json(Some(&stored)).unwrap()["a"], 1);
    }

    #[test]
    fn test_dropped_guard_rolls_back() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::new(temp.path());
        let stored = {
            let mut guard = UploadGuard::new();
            store
                .save(UploadKind::Image, &file("me.png", "image/png", b"png"), &mut guard)
                .unwrap()
        };
        assert!(!store.resolve(&stored).unwrap().exists());
    }

    #[test]
    fn test_image_type_checked() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::new(temp.path());
        let mut guard = UploadGuard::new();
        let err = store
            .save(UploadKind::Image, &file("x.pdf", "application/pdf", b"%PDF"), &mut guard)
            .unwrap_err();
        assert!(matches!(err, AppError::Unprocessable(_)));
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let store = UploadStore::new("/srv/uploads");
        assert_eq!(
            store.resolve("uploads/images/a.png"),
            Some(PathBuf::from("/srv/uploads/images/a.png"))
        );
        assert!(store.resolve("uploads/../secret").is_none());
        assert!(store.resolve("/etc/passwd").is_none());
        assert!(store.resolve("uploadsX/a").is_none());
    }

    #[test]
    fn test_read_json_missing_or_invalid() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::new(temp.path());
        assert!(store.read_json(None).is_none());
        assert!(store.read_json(Some("uploads/contents/nope.json")).is_none());

        let mut guard = UploadGuard::new();
        let stored = store
            .save(UploadKind::Content, &file("bad.json", "application/json", b"not json"), &mut guard)
            .unwrap();
        guard.commit();
        assert!(store.read_json(Some(&stored)).is_none());
    }

    #[test]
    fn test_remove_deletes_file() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::new(temp.path());
        let mut guard = UploadGuard::new();
        let stored = store
            .save(UploadKind::Quiz, &file("q.json", "application/json", b"[]"), &mut guard)
            .unwrap();
        guard.commit();

        store.remove(&stored);
        assert!(!store.resolve(&stored).unwrap().exists());
        // removing twice is silent
        store.remove(&stored);
    }
}
