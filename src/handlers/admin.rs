//! Admin routes: dashboard, catalogue maintenance and account approval.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::found;
use crate::config::DASHBOARD_TOPIC_LIMIT;
use crate::db::{self, chapters, requests, sections, subjects, topics};
use crate::db::topics::Scope;
use crate::domain::{Approval, Role, TopicDetail};
use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;
use crate::validation::required;

/// GET topics: the latest topics across all subjects
pub async fn dashboard(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let conn = db::try_lock(&state.db)?;
    let topics = topics::latest_topics(&conn, DASHBOARD_TOPIC_LIMIT)?;
    Ok(Json(json!({ "topics": topics })))
}

/// Delete a catalogue node in one transaction, then remove the files that hung below it
fn delete_node(
    state: &AppState,
    scope: Scope,
    delete: impl FnOnce(&Connection) -> rusqlite::Result<bool>,
    missing: &str,
) -> AppResult<()> {
    let files = {
        let conn = db::try_lock(&state.db)?;
        let tx = conn.unchecked_transaction()?;
        let files = topics::stored_files(&tx, scope)?;
        if !delete(&tx)? {
            return Err(AppError::not_found(missing));
        }
        tx.commit()?;
        files
    };

    tracing::info!("Deleted {:?}, removing {} stored files", scope, files.len());
    state.uploads.remove_all(&files);
    Ok(())
}

// ==================== Subjects ====================

#[derive(Debug, Deserialize)]
pub struct SubjectBody {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub description: String,
}

struct SubjectFields {
    name: String,
    code: String,
    grade: String,
    description: String,
}

impl SubjectBody {
    fn validate(&self) -> AppResult<SubjectFields> {
        Ok(SubjectFields {
            name: required(Some(&self.name), "invalid subject name!")?,
            code: required(Some(&self.code), "invalid subject code!")?,
            grade: required(Some(&self.grade), "invalid grade!")?,
            description: required(Some(&self.description), "invalid description!")?,
        })
    }
}

/// POST subjects
pub async fn create_subject(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SubjectBody>,
) -> AppResult<impl IntoResponse> {
    let fields = body.validate()?;
    let conn = db::try_lock(&state.db)?;
    let id = subjects::insert_subject(&conn, &fields.name, &fields.code, &fields.grade, &fields.description)?;
    let subject = found(subjects::get_subject(&conn, id)?, "Subject could not be found!")?;
    Ok((StatusCode::CREATED, Json(json!({ "subject": subject }))))
}

/// PATCH subjects
pub async fn update_subject(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SubjectBody>,
) -> AppResult<impl IntoResponse> {
    let id = body.id.ok_or_else(|| AppError::unprocessable("invalid subject Id!"))?;
    let fields = body.validate()?;
    let conn = db::try_lock(&state.db)?;
    if !subjects::update_subject(&conn, id, &fields.name, &fields.code, &fields.grade, &fields.description)? {
        return Err(AppError::not_found("Subject could not be found!"));
    }
    let subject = found(subjects::get_subject(&conn, id)?, "Subject could not be found!")?;
    Ok(Json(json!({ "subject": subject })))
}

/// DELETE subject/{id}
pub async fn delete_subject(
    State(state): State<AppState>,
    ApiPath(subject_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    delete_node(
        &state,
        Scope::Subject(subject_id),
        |conn| subjects::delete_subject(conn, subject_id),
        "Subject could not be found!",
    )?;
    Ok(Json(json!({ "message": "Subject has been deleted" })))
}

// ==================== Chapters ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChapterBody {
    #[serde(default)]
    pub name: String,
    pub sub_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditChapterBody {
    #[serde(default)]
    pub name: String,
    pub chapter_id: i64,
}

/// GET chapters/{subjectId}
pub async fn list_chapters(
    State(state): State<AppState>,
    ApiPath(subject_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let conn = db::try_lock(&state.db)?;
    found(subjects::get_subject(&conn, subject_id)?, "Subject could not be found!")?;
    let chapters = chapters::list_chapters(&conn, subject_id)?;
    Ok(Json(json!({ "chapters": chapters })))
}

/// POST chapters
pub async fn create_chapter(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewChapterBody>,
) -> AppResult<impl IntoResponse> {
    let name = required(Some(&body.name), "invalid chapter name!")?;
    let conn = db::try_lock(&state.db)?;
    found(subjects::get_subject(&conn, body.sub_id)?, "Subject could not be found!")?;
    let id = chapters::insert_chapter(&conn, body.sub_id, &name)?;
    let chapter = found(chapters::get_chapter(&conn, id)?, "Chapter could not be found!")?;
    Ok((StatusCode::CREATED, Json(json!({ "chapter": chapter }))))
}

/// PATCH chapters
pub async fn rename_chapter(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<EditChapterBody>,
) -> AppResult<impl IntoResponse> {
    let name = required(Some(&body.name), "invalid chapter name!")?;
    let conn = db::try_lock(&state.db)?;
    if !chapters::rename_chapter(&conn, body.chapter_id, &name)? {
        return Err(AppError::not_found("Chapter could not be found!"));
    }
    let chapter = found(chapters::get_chapter(&conn, body.chapter_id)?, "Chapter could not be found!")?;
    Ok(Json(json!({ "chapter": chapter })))
}

/// DELETE chapter/{id}
pub async fn delete_chapter(
    State(state): State<AppState>,
    ApiPath(chapter_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    delete_node(
        &state,
        Scope::Chapter(chapter_id),
        |conn| chapters::delete_chapter(conn, chapter_id),
        "Chapter could not be found!",
    )?;
    Ok(Json(json!({ "message": "Chapter has been deleted" })))
}

// ==================== Sections ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSectionBody {
    #[serde(default)]
    pub name: String,
    pub chapter_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditSectionBody {
    #[serde(default)]
    pub name: String,
    pub section_id: i64,
}

/// GET sections/{chapterId}
pub async fn list_sections(
    State(state): State<AppState>,
    ApiPath(chapter_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let conn = db::try_lock(&state.db)?;
    found(chapters::get_chapter(&conn, chapter_id)?, "Chapter could not be found!")?;
    let sections = sections::list_sections(&conn, chapter_id)?;
    Ok(Json(json!({ "sections": sections })))
}

/// POST sections
pub async fn create_section(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewSectionBody>,
) -> AppResult<impl IntoResponse> {
    let name = required(Some(&body.name), "invalid section name!")?;
    let conn = db::try_lock(&state.db)?;
    found(chapters::get_chapter(&conn, body.chapter_id)?, "Chapter could not be found!")?;
    let id = sections::insert_section(&conn, body.chapter_id, &name)?;
    let section = found(sections::get_section(&conn, id)?, "Section could not be found!")?;
    Ok((StatusCode::CREATED, Json(json!({ "section": section }))))
}

/// PATCH sections
pub async fn rename_section(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<EditSectionBody>,
) -> AppResult<impl IntoResponse> {
    let name = required(Some(&body.name), "invalid section name!")?;
    let conn = db::try_lock(&state.db)?;
    if !sections::rename_section(&conn, body.section_id, &name)? {
        return Err(AppError::not_found("Section could not be found!"));
    }
    let section = found(sections::get_section(&conn, body.section_id)?, "Section could not be found!")?;
    Ok(Json(json!({ "section": section })))
}

/// DELETE sections/{id}
pub async fn delete_section(
    State(state): State<AppState>,
    ApiPath(section_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    delete_node(
        &state,
        Scope::Section(section_id),
        |conn| sections::delete_section(conn, section_id),
        "Section could not be found!",
    )?;
    Ok(Json(json!({ "message": "Section has been deleted" })))
}

// ==================== Topics ====================

/// GET topics/{sectionId}, content files parsed
pub async fn list_topic_details(
    State(state): State<AppState>,
    ApiPath(section_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let topics = {
        let conn = db::try_lock(&state.db)?;
        found(sections::get_section(&conn, section_id)?, "Section could not be found!")?;
        topics::list_topics(&conn, section_id)?
    };
    let topics: Vec<TopicDetail> = topics
        .into_iter()
        .map(|topic| {
            let content = state.uploads.read_json(topic.content.as_deref());
            TopicDetail::new(topic, content)
        })
        .collect();
    Ok(Json(json!({ "topics": topics })))
}

// ==================== Account requests ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionBody {
    pub user_id: i64,
    #[serde(default)]
    pub action: String,
}

/// GET {educator,student,parent}-requests
pub async fn list_requests(state: AppState, role: Role) -> AppResult<impl IntoResponse> {
    let conn = db::try_lock(&state.db)?;
    let requests = requests::list_requests(&conn, role)?;
    let mut body = Map::new();
    body.insert(role.request_list_key().to_string(), json!(requests));
    Ok(Json(Value::Object(body)))
}

/// PATCH {educator,student,parent}-requests
pub async fn decide_request(
    state: AppState,
    role: Role,
    ApiJson(body): ApiJson<DecisionBody>,
) -> AppResult<impl IntoResponse> {
    let approval = Approval::from_action(body.action.trim());
    let conn = db::try_lock(&state.db)?;
    let request = found(
        requests::set_approval(&conn, role, body.user_id, approval)?,
        "Account request could not be found!",
    )?;

    tracing::info!("{} account {} {}", role, body.user_id, approval.as_str());
    Ok(Json(json!({ "accReq": request })))
}
