//! Student routes: enrollment, favorites, answer sheets and quiz records.
//!
//! Every route that names a student id only serves the caller's own data.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use super::found;
use super::shared::quiz_detail;
use crate::auth::AuthContext;
use crate::db::{self, answers, chapters, favorites, quizzes, records, sections, subjects, topics};
use crate::db::answers::Placement;
use crate::db::records::RecordInput;
use crate::domain::Answer;
use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;
use crate::validation::{required, validate_marks};

/// The caller's answer sheet with this id
fn own_answer(conn: &rusqlite::Connection, auth: &AuthContext, answer_id: i64) -> AppResult<Answer> {
    let answer = found(answers::get_answer(conn, answer_id)?, "Answer could not be found!")?;
    if answer.student_id != auth.user_id() {
        return Err(AppError::forbidden("This answer belongs to another student!"));
    }
    Ok(answer)
}

// ==================== Enrollment ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollBody {
    pub sub_id: i64,
}

/// GET enrolled-subjects/{studentId}
pub async fn enrolled_subjects(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(student_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    auth.ensure_self(student_id)?;
    let conn = db::try_lock(&state.db)?;
    let subjects = subjects::enrolled_subjects(&conn, student_id)?;
    Ok(Json(json!({ "subjects": subjects })))
}

/// POST enroll: join a subject and bump its enrollment counter
pub async fn enroll(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(body): ApiJson<EnrollBody>,
) -> AppResult<impl IntoResponse> {
    let conn = db::try_lock(&state.db)?;
    found(subjects::get_subject(&conn, body.sub_id)?, "Subject could not be found!")?;
    if subjects::is_enrolled(&conn, auth.user_id(), body.sub_id)? {
        return Err(AppError::unprocessable("You are already enrolled in this subject!"));
    }

    let tx = conn.unchecked_transaction()?;
    subjects::enroll_student(&tx, auth.user_id(), body.sub_id)?;
    tx.commit()?;

    let subject = found(subjects::get_subject(&conn, body.sub_id)?, "Subject could not be found!")?;
    tracing::info!("Student {} enrolled in subject {}", auth.user_id(), body.sub_id);
    Ok((StatusCode::CREATED, Json(json!({ "subject": subject }))))
}

// ==================== Favorites ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteBody {
    pub topic_id: i64,
}

/// GET favorites/{subjectId}/{studentId}
pub async fn favorites_in_subject(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath((subject_id, student_id)): ApiPath<(i64, i64)>,
) -> AppResult<impl IntoResponse> {
    auth.ensure_self(student_id)?;
    let conn = db::try_lock(&state.db)?;
    let favorites = favorites::favorites_in_subject(&conn, student_id, subject_id)?;
    Ok(Json(json!({ "favorites": favorites })))
}

/// GET favorite/{studentId}/{topicId}
pub async fn get_favorite(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath((student_id, topic_id)): ApiPath<(i64, i64)>,
) -> AppResult<impl IntoResponse> {
    auth.ensure_self(student_id)?;
    let conn = db::try_lock(&state.db)?;
    let favorite = found(
        favorites::get_favorite(&conn, student_id, topic_id)?,
        "Favorite could not be found!",
    )?;
    Ok(Json(json!({ "favorite": favorite })))
}

/// POST favorite
pub async fn add_favorite(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(body): ApiJson<FavoriteBody>,
) -> AppResult<impl IntoResponse> {
    let conn = db::try_lock(&state.db)?;
    found(topics::get_topic(&conn, body.topic_id)?, "Topic could not be found!")?;
    if favorites::get_favorite(&conn, auth.user_id(), body.topic_id)?.is_some() {
        return Err(AppError::unprocessable("Topic is already a favorite!"));
    }
    let favorite = favorites::insert_favorite(&conn, auth.user_id(), body.topic_id)?;
    Ok((StatusCode::CREATED, Json(json!({ "favorite": favorite }))))
}

/// DELETE favorite/{studentId}/{topicId}
pub async fn delete_favorite(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath((student_id, topic_id)): ApiPath<(i64, i64)>,
) -> AppResult<impl IntoResponse> {
    auth.ensure_self(student_id)?;
    let conn = db::try_lock(&state.db)?;
    if !favorites::delete_favorite(&conn, student_id, topic_id)? {
        return Err(AppError::not_found("Favorite could not be found!"));
    }
    Ok(Json(json!({ "message": "Favorite has been deleted" })))
}

// ==================== Answers ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerBody {
    pub quiz_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleAnswerBody {
    #[serde(default)]
    pub answer: String,
    pub answer_id: i64,
    #[serde(default)]
    pub counter: Option<i64>,
}

/// POST answer: open the caller's answer sheet for a quiz
pub async fn create_answer(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(body): ApiJson<AnswerBody>,
) -> AppResult<impl IntoResponse> {
    let conn = db::try_lock(&state.db)?;
    found(quizzes::get_quiz(&conn, body.quiz_id)?, "Quiz could not be found!")?;
    if answers::answer_for_quiz(&conn, auth.user_id(), body.quiz_id)?.is_some() {
        return Err(AppError::unprocessable("An answer for this quiz exists already!"));
    }
    let id = answers::insert_answer(&conn, auth.user_id(), body.quiz_id)?;
    let answer = found(answers::get_answer(&conn, id)?, "Answer could not be found!")?;
    Ok((StatusCode::CREATED, Json(json!({ "answer": answer }))))
}

/// POST single-answer: append, or replace the answer at `counter`
pub async fn put_single_answer(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(body): ApiJson<SingleAnswerBody>,
) -> AppResult<impl IntoResponse> {
    let text = required(Some(&body.answer), "invalid answer!")?;
    let conn = db::try_lock(&state.db)?;
    own_answer(&conn, &auth, body.answer_id)?;

    let (single, placement) = answers::put_single_answer(&conn, body.answer_id, body.counter, &text)?
        .ok_or_else(|| AppError::unprocessable("invalid counter!"))?;
    let status = match placement {
        Placement::Appended => StatusCode::CREATED,
        Placement::Replaced => StatusCode::OK,
    };
    Ok((status, Json(json!({ "singleAnswer": single }))))
}

/// GET answer/{quizId}: the caller's answer sheet
pub async fn answer_for_quiz(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(quiz_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let conn = db::try_lock(&state.db)?;
    let answer = found(
        answers::answer_for_quiz(&conn, auth.user_id(), quiz_id)?,
        "Answer could not be found!",
    )?;
    Ok(Json(json!({ "answer": answer })))
}

/// GET answers/{answerId}: single answers in position order
pub async fn single_answers(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(answer_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let conn = db::try_lock(&state.db)?;
    own_answer(&conn, &auth, answer_id)?;
    let answers = answers::list_single_answers(&conn, answer_id)?;
    Ok(Json(json!({ "answers": answers })))
}

// ==================== Quizzes & records ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordBody {
    pub quiz_id: i64,
    pub subject_id: i64,
    pub chapter_id: i64,
    pub section_id: i64,
    pub marks: i64,
}

/// GET quiz/{quizId}
pub async fn get_quiz(
    State(state): State<AppState>,
    ApiPath(quiz_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    let conn = db::try_lock(&state.db)?;
    let quiz = found(quizzes::get_quiz(&conn, quiz_id)?, "Quiz could not be found!")?;
    let quiz = quiz_detail(&conn, &state.uploads, quiz)?;
    Ok(Json(json!({ "quiz": quiz })))
}

/// POST quiz-record: store the caller's marks, overwriting an earlier attempt
pub async fn save_record(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(body): ApiJson<RecordBody>,
) -> AppResult<impl IntoResponse> {
    let marks = validate_marks(body.marks)?;
    let conn = db::try_lock(&state.db)?;
    let quiz = found(quizzes::get_quiz(&conn, body.quiz_id)?, "Quiz could not be found!")?;
    let lineage = sections::section_lineage(&conn, quiz.section_id)?;
    if quiz.section_id != body.section_id || lineage != Some((body.subject_id, body.chapter_id)) {
        return Err(AppError::unprocessable("Quiz does not belong to this section!"));
    }

    let record = records::upsert_record(
        &conn,
        &RecordInput {
            student_id: auth.user_id(),
            quiz_id: body.quiz_id,
            subject_id: body.subject_id,
            chapter_id: body.chapter_id,
            section_id: body.section_id,
            marks,
        },
    )?;
    Ok((StatusCode::CREATED, Json(json!({ "record": record }))))
}

/// GET quiz-records/{studentId}/{subjectId}
pub async fn records_in_subject(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath((student_id, subject_id)): ApiPath<(i64, i64)>,
) -> AppResult<impl IntoResponse> {
    auth.ensure_self(student_id)?;
    let conn = db::try_lock(&state.db)?;
    let records = records::records_in_subject(&conn, student_id, subject_id)?;
    Ok(Json(json!({ "records": records })))
}

/// GET quiz-records-for-chapter/{studentId}/{subjectId}/{chapterId}
pub async fn records_in_chapter(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath((student_id, subject_id, chapter_id)): ApiPath<(i64, i64, i64)>,
) -> AppResult<impl IntoResponse> {
    auth.ensure_self(student_id)?;
    let conn = db::try_lock(&state.db)?;
    let records = records::records_in_chapter(&conn, student_id, subject_id, chapter_id)?;
    let total_sections = chapters::count_sections(&conn, chapter_id)?;
    Ok(Json(json!({ "records": records, "totalSections": total_sections })))
}

/// GET quiz-record/{studentId}/{sectionId}
pub async fn record_for_section(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath((student_id, section_id)): ApiPath<(i64, i64)>,
) -> AppResult<impl IntoResponse> {
    auth.ensure_self(student_id)?;
    let conn = db::try_lock(&state.db)?;
    let quiz = found(quizzes::quiz_for_section(&conn, section_id)?, "Quiz could not be found!")?;
    let record = found(
        records::record_for_quiz(&conn, student_id, quiz.id)?,
        "Quiz record could not be found!",
    )?;
    Ok(Json(json!({ "record": record })))
}
