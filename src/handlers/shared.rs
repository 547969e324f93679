//! Catalogue reads, comments and quiz views mounted on more than one role router.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;

use super::found;
use crate::auth::AuthContext;
use crate::db::{self, chapters, comments, quizzes, sections, subjects, topics};
use crate::domain::{QuestionView, Quiz, QuizDetail, Role, TopicDetail};
use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, ApiPath};
use crate::services::uploads::UploadStore;
use crate::state::AppState;
use crate::validation;

// ==================== Catalogue ====================

/// GET subjects
pub async fn list_subjects(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let conn = db::try_lock(&state.db)?;
    let subjects = subjects::list_subjects(&conn)?;
    Ok(Json(json!({ "subjects": subjects })))
}

/// GET chapters/{subjectId}, each chapter with its section, topic and quiz counts
pub async fn chapter_summaries(
    State(state): State<AppState>,
    ApiPath(subject_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let conn = db::try_lock(&state.db)?;
    found(subjects::get_subject(&conn, subject_id)?, "Subject could not be found!")?;
    let chapters = chapters::list_chapter_summaries(&conn, subject_id)?;
    Ok(Json(json!({ "chapters": chapters })))
}

/// GET sections/{chapterId}, each section with its topic count and quiz availability
pub async fn section_summaries(
    State(state): State<AppState>,
    ApiPath(chapter_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let conn = db::try_lock(&state.db)?;
    found(chapters::get_chapter(&conn, chapter_id)?, "Chapter could not be found!")?;
    let sections = sections::list_section_summaries(&conn, chapter_id)?;
    Ok(Json(json!({ "sections": sections })))
}

/// GET topics/{sectionId}
pub async fn list_topics(
    State(state): State<AppState>,
    ApiPath(section_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let conn = db::try_lock(&state.db)?;
    found(sections::get_section(&conn, section_id)?, "Section could not be found!")?;
    let topics = topics::list_topics(&conn, section_id)?;
    Ok(Json(json!({ "topics": topics })))
}

/// GET topic/{id} with its content file parsed
pub async fn get_topic(
    State(state): State<AppState>,
    ApiPath(topic_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let topic = {
        let conn = db::try_lock(&state.db)?;
        found(topics::get_topic(&conn, topic_id)?, "Topic could not be found!")?
    };
    let content = state.uploads.read_json(topic.content.as_deref());
    Ok(Json(json!({ "topic": TopicDetail::new(topic, content) })))
}

/// DELETE topic/{id}, removing its lecture note and content files
pub async fn delete_topic(
    State(state): State<AppState>,
    ApiPath(topic_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let topic = {
        let conn = db::try_lock(&state.db)?;
        let topic = found(topics::get_topic(&conn, topic_id)?, "Topic could not be found!")?;
        topics::delete_topic(&conn, topic_id)?;
        topic
    };

    state.uploads.remove_all(topic.lecture_note.iter().chain(topic.content.iter()));
    Ok(Json(json!({ "message": "Topic has been deleted" })))
}

// ==================== Comments ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCommentBody {
    pub section_id: i64,
    #[serde(default)]
    pub comment_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCommentBody {
    #[serde(default)]
    pub comment_text: String,
}

/// GET comments/{sectionId}
pub async fn list_comments(
    State(state): State<AppState>,
    ApiPath(section_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let conn = db::try_lock(&state.db)?;
    found(sections::get_section(&conn, section_id)?, "Section could not be found!")?;
    let comments = comments::list_comments(&conn, section_id)?;
    Ok(Json(json!({ "comments": comments })))
}

/// POST comment, authored by the caller
pub async fn add_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(body): ApiJson<NewCommentBody>,
) -> AppResult<impl IntoResponse> {
    let text = validation::required(Some(&body.comment_text), "invalid comment!")?;
    let conn = db::try_lock(&state.db)?;
    found(sections::get_section(&conn, body.section_id)?, "Section could not be found!")?;

    let id = comments::insert_comment(&conn, body.section_id, &auth.user, &text)?;
    let comment = found(comments::get_comment(&conn, id)?, "Comment could not be found!")?;
    Ok((StatusCode::CREATED, Json(json!({ "comment": comment }))))
}

/// PATCH comment/{id}, author only
pub async fn edit_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(comment_id): ApiPath<i64>,
    ApiJson(body): ApiJson<EditCommentBody>,
) -> AppResult<impl IntoResponse> {
    let text = validation::required(Some(&body.comment_text), "invalid comment!")?;
    let conn = db::try_lock(&state.db)?;
    let comment = found(comments::get_comment(&conn, comment_id)?, "Comment could not be found!")?;
    if comment.user_id != auth.user_id() {
        return Err(AppError::forbidden("You can only edit your own comments!"));
    }

    comments::update_comment(&conn, comment_id, &text)?;
    let comment = found(comments::get_comment(&conn, comment_id)?, "Comment could not be found!")?;
    Ok(Json(json!({ "comment": comment })))
}

/// DELETE comment/{id}: the author, any educator or an admin
pub async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(comment_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let conn = db::try_lock(&state.db)?;
    let comment = found(comments::get_comment(&conn, comment_id)?, "Comment could not be found!")?;
    let moderator = matches!(auth.role(), Role::Educator | Role::Admin);
    if comment.user_id != auth.user_id() && !moderator {
        return Err(AppError::forbidden("You can only delete your own comments!"));
    }

    comments::delete_comment(&conn, comment_id)?;
    tracing::info!("Comment {} deleted by user {}", comment_id, auth.user_id());
    Ok(Json(json!({ "message": "Comment has been deleted" })))
}

// ==================== Quizzes ====================

/// A quiz with its questions; question files are parsed as JSON
pub(crate) fn quiz_detail(conn: &Connection, uploads: &UploadStore, quiz: Quiz) -> AppResult<QuizDetail> {
    let questions = quizzes::list_questions(conn, quiz.id)?
        .into_iter()
        .map(|q| {
            let parsed = uploads.read_json(Some(&q.question));
            QuestionView::new(q, parsed)
        })
        .collect();
    Ok(QuizDetail { quiz, questions })
}
