//! Test utilities for database setup.
//!
//! Builds databases through the authoritative `db::open` path so tests see
//! exactly the production schema, plus small fixtures for the catalogue tree.

use rusqlite::Connection;
use std::path::Path;
use tempfile::TempDir;

use crate::db;
use crate::domain::{NewUser, Role};

/// Test environment with a migrated lms.db in a temporary directory.
pub struct TestEnv {
    /// Temporary directory (kept alive for database file persistence)
    pub temp: TempDir,
    pub conn: Connection,
}

impl TestEnv {
    pub fn new() -> rusqlite::Result<Self> {
        let temp =
            TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        let conn = db::open(&temp.path().join("lms.db"))?;
        Ok(Self { temp, conn })
    }

    /// Get the temporary directory path for creating test files.
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn user(&self, role: Role, email: &str) -> i64 {
        let new_user = NewUser {
            role,
            name: format!("{} user", role),
            email: email.to_string(),
            phone: "12345678".to_string(),
            password_hash: "hash".to_string(),
            image: String::new(),
            grade: (role == Role::Student).then(|| "7".to_string()),
            student_id: None,
        };
        db::users::insert_user(&self.conn, &new_user).unwrap()
    }

    pub fn subject(&self, code: &str) -> i64 {
        db::subjects::insert_subject(&self.conn, "Maths", code, "7", "Numbers").unwrap()
    }

    pub fn chapter(&self, subject_id: i64) -> i64 {
        db::chapters::insert_chapter(&self.conn, subject_id, "Chapter").unwrap()
    }

    pub fn section(&self, chapter_id: i64) -> i64 {
        db::sections::insert_section(&self.conn, chapter_id, "Section").unwrap()
    }

    pub fn topic(&self, section_id: i64, title: &str) -> i64 {
        let topic = db::topics::TopicInput {
            title: title.to_string(),
            description: None,
            lecture_note: None,
            content: None,
        };
        db::topics::insert_topic(&self.conn, section_id, &topic).unwrap()
    }

    /// subject → chapter → section → quiz; returns (subject, chapter, section, quiz)
    pub fn quiz_tree(&self, code: &str) -> (i64, i64, i64, i64) {
        let subject_id = self.subject(code);
        let chapter_id = self.chapter(subject_id);
        let section_id = self.section(chapter_id);
        let quiz_id = db::quizzes::insert_quiz(&self.conn, section_id).unwrap();
        (subject_id, chapter_id, section_id, quiz_id)
    }
}
