//! Educator routes: subject registration, topics, quizzes and quiz statistics.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::shared::quiz_detail;
use super::{ensure_registered, found};
use crate::auth::AuthContext;
use crate::db::{self, quizzes, sections, subjects, topics, users};
use crate::db::quizzes::QuestionInput;
use crate::db::topics::TopicInput;
use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, ApiPath};
use crate::services::progress;
use crate::services::uploads::{MultipartForm, UploadGuard, UploadKind, UploadedFile};
use crate::state::AppState;
use crate::validation::{parse_id, required};

// ==================== Registration ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBody {
    pub sub_id: i64,
}

/// GET registered-subjects/{educatorId}
pub async fn registered_subjects(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(educator_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    auth.ensure_self(educator_id)?;
    let conn = db::try_lock(&state.db)?;
    let subjects = subjects::registered_subjects(&conn, educator_id)?;
    Ok(Json(json!({ "subjects": subjects })))
}

/// POST register: take a subject that has no educator yet
pub async fn register(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(body): ApiJson<RegisterBody>,
) -> AppResult<impl IntoResponse> {
    let conn = db::try_lock(&state.db)?;
    found(subjects::get_subject(&conn, body.sub_id)?, "Subject could not be found!")?;
    if subjects::has_educator(&conn, body.sub_id)? {
        return Err(AppError::unprocessable("This subject already has an educator!"));
    }

    let tx = conn.unchecked_transaction()?;
    subjects::register_educator(&tx, auth.user_id(), &auth.user.name, body.sub_id)?;
    tx.commit()?;

    let subject = found(subjects::get_subject(&conn, body.sub_id)?, "Subject could not be found!")?;
    tracing::info!("Educator {} registered for subject {}", auth.user_id(), body.sub_id);
    Ok((StatusCode::CREATED, Json(json!({ "educatorSubject": subject }))))
}

/// DELETE unregister/{educatorId}/{subjectId}
pub async fn unregister(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath((educator_id, subject_id)): ApiPath<(i64, i64)>,
) -> AppResult<impl IntoResponse> {
    auth.ensure_self(educator_id)?;
    let conn = db::try_lock(&state.db)?;
    let tx = conn.unchecked_transaction()?;
    if !subjects::unregister_educator(&tx, educator_id, subject_id)? {
        return Err(AppError::not_found("Registration could not be found!"));
    }
    tx.commit()?;
    Ok(Json(json!({ "message": "Subject has been unregistered" })))
}

/// GET view-students/{subjectId}
pub async fn view_students(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(subject_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let conn = db::try_lock(&state.db)?;
    ensure_registered(&conn, auth.user_id(), subject_id)?;
    let students = users::students_in_subject(&conn, subject_id)?;
    Ok(Json(json!({ "students": students })))
}

// ==================== Topics ====================

/// Save an optional topic file into the directory matching its type
fn save_topic_file(
    state: &AppState,
    file: Option<UploadedFile>,
    guard: &mut UploadGuard,
) -> AppResult<Option<String>> {
    file.map(|f| state.uploads.save(UploadKind::for_topic_file(&f.content_type), &f, guard))
        .transpose()
}

/// Title, description and files of a topic form; files are saved under `guard`
fn topic_input(state: &AppState, form: &mut MultipartForm, guard: &mut UploadGuard) -> AppResult<TopicInput> {
    let title = required(form.text("title"), "invalid title!")?;
    let description = form
        .text("description")
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);
    let lecture_note = save_topic_file(state, form.take_file("lectureNote"), guard)?;
    let content = save_topic_file(state, form.take_file("content"), guard)?;
    Ok(TopicInput { title, description, lecture_note, content })
}

/// POST topic - multipart: sectionId, title, description?, lectureNote?, content?
pub async fn create_topic(State(state): State<AppState>, multipart: Multipart) -> AppResult<impl IntoResponse> {
    let mut form = MultipartForm::read(multipart).await?;
    let section_id = parse_id(form.text("sectionId"), "invalid section Id!")?;
    let mut guard = UploadGuard::new();
    let input = topic_input(&state, &mut form, &mut guard)?;

    let topic = {
        let conn = db::try_lock(&state.db)?;
        found(sections::get_section(&conn, section_id)?, "Section could not be found!")?;
        let id = topics::insert_topic(&conn, section_id, &input)?;
        found(topics::get_topic(&conn, id)?, "Topic could not be found!")?
    };

    guard.commit();
    Ok((StatusCode::CREATED, Json(json!({ "topic": topic }))))
}

/// PATCH topic/{id} - multipart: title, description?, lectureNote?, content?.
/// A newly uploaded file replaces and deletes the stored one.
pub async fn update_topic(
    State(state): State<AppState>,
    ApiPath(topic_id): ApiPath<i64>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut form = MultipartForm::read(multipart).await?;
    let mut guard = UploadGuard::new();
    let input = topic_input(&state, &mut form, &mut guard)?;

    let (old, topic) = {
        let conn = db::try_lock(&state.db)?;
        let old = found(topics::get_topic(&conn, topic_id)?, "Topic could not be found!")?;
        topics::update_topic(&conn, topic_id, &input)?;
        let topic = found(topics::get_topic(&conn, topic_id)?, "Topic could not be found!")?;
        (old, topic)
    };

    guard.commit();
    let replaced = [
        input.lecture_note.and(old.lecture_note),
        input.content.and(old.content),
    ];
    state.uploads.remove_all(replaced.iter().flatten());
    Ok(Json(json!({ "topic": topic })))
}

// ==================== Quizzes ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuizBody {
    pub section_id: i64,
}

/// POST quiz: at most one per section
pub async fn create_quiz(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewQuizBody>,
) -> AppResult<impl IntoResponse> {
    let conn = db::try_lock(&state.db)?;
    found(sections::get_section(&conn, body.section_id)?, "Section could not be found!")?;
    if quizzes::quiz_for_section(&conn, body.section_id)?.is_some() {
        return Err(AppError::unprocessable("This section already has a quiz!"));
    }
    let id = quizzes::insert_quiz(&conn, body.section_id)?;
    let quiz = found(quizzes::get_quiz(&conn, id)?, "Quiz could not be found!")?;
    Ok((StatusCode::CREATED, Json(json!({ "quiz": quiz }))))
}

/// GET quiz/{sectionId}
pub async fn quiz_for_section(
    State(state): State<AppState>,
    ApiPath(section_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let conn = db::try_lock(&state.db)?;
    let quiz = found(quizzes::quiz_for_section(&conn, section_id)?, "Quiz could not be found!")?;
    let quiz = quiz_detail(&conn, &state.uploads, quiz)?;
    Ok(Json(json!({ "quiz": quiz })))
}

/// POST question - multipart: quizId, question (file), solution (file)?,
/// option1..option4, answer
pub async fn create_question(State(state): State<AppState>, multipart: Multipart) -> AppResult<impl IntoResponse> {
    let mut form = MultipartForm::read(multipart).await?;
    let quiz_id = parse_id(form.text("quizId"), "invalid quiz Id!")?;
    let options = [
        required(form.text("option1"), "invalid option1!")?,
        required(form.text("option2"), "invalid option2!")?,
        required(form.text("option3"), "invalid option3!")?,
        required(form.text("option4"), "invalid option4!")?,
    ];
    let answer = required(form.text("answer"), "invalid answer!")?;
    let question_file = form
        .take_file("question")
        .ok_or_else(|| AppError::unprocessable("question file is required!"))?;

    let mut guard = UploadGuard::new();
    let question = state.uploads.save(UploadKind::Quiz, &question_file, &mut guard)?;
    let solution = state
        .uploads
        .save_opt(UploadKind::Quiz, form.take_file("solution").as_ref(), &mut guard)?;

    let created = {
        let conn = db::try_lock(&state.db)?;
        found(quizzes::get_quiz(&conn, quiz_id)?, "Quiz could not be found!")?;
        let input = QuestionInput { question, solution, options, answer };
        let id = quizzes::insert_question(&conn, quiz_id, &input)?;
        found(quizzes::get_question(&conn, id)?, "Question could not be found!")?
    };

    guard.commit();
    Ok((StatusCode::CREATED, Json(json!({ "question": created }))))
}

/// DELETE quiz/{quizId}: questions, answers and records go with it
pub async fn delete_quiz(
    State(state): State<AppState>,
    ApiPath(quiz_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let files = {
        let conn = db::try_lock(&state.db)?;
        let tx = conn.unchecked_transaction()?;
        let files = quizzes::question_files(&tx, quiz_id)?;
        if !quizzes::delete_quiz(&tx, quiz_id)? {
            return Err(AppError::not_found("Quiz could not be found!"));
        }
        tx.commit()?;
        files
    };

    state.uploads.remove_all(&files);
    Ok(Json(json!({ "message": "Quiz has been deleted" })))
}

/// GET quiz-stats-students/{subjectId}/{quizId}
pub async fn quiz_stats(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath((subject_id, quiz_id)): ApiPath<(i64, i64)>,
) -> AppResult<impl IntoResponse> {
    let conn = db::try_lock(&state.db)?;
    ensure_registered(&conn, auth.user_id(), subject_id)?;
    found(quizzes::get_quiz(&conn, quiz_id)?, "Quiz could not be found!")?;
    let stats = progress::quiz_stats(&conn, subject_id, quiz_id)?;
    Ok(Json(json!({ "quizStats": stats })))
}
