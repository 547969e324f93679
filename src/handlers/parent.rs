//! Parent routes. A parent only sees the student linked to their account.

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;

use super::find_student;
use crate::auth::AuthContext;
use crate::db::{self, subjects, users};
use crate::domain::{Subject, User};
use crate::error::{AppError, AppResult};
use crate::extract::ApiPath;
use crate::services::progress;
use crate::state::AppState;

/// Educator to contact about one of the student's subjects
#[derive(Debug, Serialize)]
pub struct Contact {
    pub subject: Subject,
    pub educator: User,
}

fn ensure_linked(auth: &AuthContext, student_id: i64) -> AppResult<()> {
    if auth.user.student_id == Some(student_id) {
        Ok(())
    } else {
        Err(AppError::forbidden("This student is not linked to your account!"))
    }
}

/// GET student-details/{studentId}
pub async fn student_details(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(student_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    ensure_linked(&auth, student_id)?;
    let conn = db::try_lock(&state.db)?;
    let student = find_student(&conn, student_id)?;
    Ok(Json(json!({ "student": student })))
}

/// GET student-progress/{studentId}
pub async fn student_progress(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(student_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    ensure_linked(&auth, student_id)?;
    let conn = db::try_lock(&state.db)?;
    find_student(&conn, student_id)?;
    let progress = progress::student_progress(&conn, student_id)?;
    Ok(Json(json!({ "progress": progress })))
}

/// GET quiz-records/subjects/{studentId}: the subjects the student is enrolled in
pub async fn enrolled_subjects(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(student_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    ensure_linked(&auth, student_id)?;
    let conn = db::try_lock(&state.db)?;
    let subjects = subjects::enrolled_subjects(&conn, student_id)?;
    Ok(Json(json!({ "subjects": subjects })))
}

/// GET get-contacts/{studentId}: the educator of each enrolled subject
pub async fn contacts(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(student_id): ApiPath<i64>,
) -> AppResult<impl IntoResponse> {
    ensure_linked(&auth, student_id)?;
    let conn = db::try_lock(&state.db)?;

    let mut contacts = Vec::new();
    for subject in subjects::enrolled_subjects(&conn, student_id)? {
        if let Some(educator) = users::educator_of_subject(&conn, subject.id)? {
            contacts.push(Contact { subject, educator });
        }
    }
    Ok(Json(json!({ "contacts": contacts })))
}
