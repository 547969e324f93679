//! Shared setup for API tests: a server over a temporary data directory.

#![allow(dead_code)]

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

use lms_backend::config::AppConfig;
use lms_backend::{db, routes, state::AppState};

pub struct TestApp {
    pub server: TestServer,
    temp: TempDir,
}

/// A signed-up account
pub struct Account {
    pub id: i64,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let config = AppConfig {
            database_path: temp.path().join("lms.db"),
            uploads_dir: temp.path().join("uploads"),
            ..AppConfig::default()
        };
        let pool = db::init_db(&config.database_path).unwrap();
        let state = AppState::new(pool, config);
        state.uploads.ensure_dirs().unwrap();
        let server = TestServer::new(routes::app(state)).unwrap();
        Self { server, temp }
    }

    /// Data directory; stored upload paths resolve below it
    pub fn dir(&self) -> &Path {
        self.temp.path()
    }

    pub fn profile_form(email: &str) -> MultipartForm {
        MultipartForm::new()
            .add_text("name", "Test User")
            .add_text("email", email)
            .add_text("phone", "12345678")
            .add_text("password", "secret")
    }

    pub async fn signup_with(&self, role: &str, form: MultipartForm) -> Account {
        let response = self
            .server
            .post(&format!("/api/{}/signup", role))
            .multipart(form)
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        Account {
            id: body["user"]["id"].as_i64().unwrap(),
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    pub async fn admin(&self) -> Account {
        self.signup_with("admin", Self::profile_form("admin@example.com")).await
    }

    /// Sign up a non-admin account and have `admin` approve it
    pub async fn approved(&self, admin: &Account, role: &str, form: MultipartForm) -> Account {
        let account = self.signup_with(role, form).await;
        self.server
            .patch(&format!("/api/admin/{}-requests", role))
            .authorization_bearer(&admin.token)
            .json(&json!({ "userId": account.id, "action": "approved" }))
            .await
            .assert_status_ok();
        account
    }

    pub async fn approved_student(&self, admin: &Account, email: &str) -> Account {
        let form = Self::profile_form(email).add_text("grade", "7");
        self.approved(admin, "student", form).await
    }

    pub async fn approved_educator(&self, admin: &Account, email: &str) -> Account {
        self.approved(admin, "educator", Self::profile_form(email)).await
    }

    /// Create subject → chapter → section as admin; returns their ids
    pub async fn catalogue(&self, admin: &Account, code: &str) -> (i64, i64, i64) {
        let subject: Value = self
            .server
            .post("/api/admin/subjects")
            .authorization_bearer(&admin.token)
            .json(&json!({
                "name": "Maths",
                "code": code,
                "grade": "7",
                "description": "Numbers and shapes",
            }))
            .await
            .json();
        let subject_id = subject["subject"]["id"].as_i64().unwrap();

        let chapter: Value = self
            .server
            .post("/api/admin/chapters")
            .authorization_bearer(&admin.token)
            .json(&json!({ "name": "Fractions", "subId": subject_id }))
            .await
            .json();
        let chapter_id = chapter["chapter"]["id"].as_i64().unwrap();

        let section: Value = self
            .server
            .post("/api/admin/sections")
            .authorization_bearer(&admin.token)
            .json(&json!({ "name": "Adding fractions", "chapterId": chapter_id }))
            .await
            .json();
        let section_id = section["section"]["id"].as_i64().unwrap();

        (subject_id, chapter_id, section_id)
    }

    pub async fn create_quiz(&self, educator: &Account, section_id: i64) -> i64 {
        let response = self
            .server
            .post("/api/educator/quiz")
            .authorization_bearer(&educator.token)
            .json(&json!({ "sectionId": section_id }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        body["quiz"]["id"].as_i64().unwrap()
    }

    /// Upload a topic with a lecture note into `section_id`; returns its id and stored path
    pub async fn create_topic(&self, educator: &Account, section_id: i64, file_name: &str) -> (i64, String) {
        let form = MultipartForm::new()
            .add_text("sectionId", section_id.to_string())
            .add_text("title", "Halves")
            .add_part("lectureNote", pdf_part(file_name));
        let response = self
            .server
            .post("/api/educator/topic")
            .authorization_bearer(&educator.token)
            .multipart(form)
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        (
            body["topic"]["id"].as_i64().unwrap(),
            body["topic"]["lectureNote"].as_str().unwrap().to_string(),
        )
    }
}

/// A small PDF-typed file part
pub fn pdf_part(name: &str) -> Part {
    Part::bytes(b"%PDF-1.4 test".to_vec())
        .file_name(name)
        .mime_type("application/pdf")
}
