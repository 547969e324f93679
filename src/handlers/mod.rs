//! HTTP handlers, one module per role router plus the reads they share.

pub mod admin;
pub mod educator;
pub mod parent;
pub mod shared;
pub mod student;

use rusqlite::Connection;

use crate::db::{subjects, users};
use crate::domain::{Role, User};
use crate::error::{AppError, AppResult};

/// Unwrap a looked-up row or fail with 404 `message`
pub(crate) fn found<T>(row: Option<T>, message: &str) -> AppResult<T> {
    row.ok_or_else(|| AppError::not_found(message))
}

/// The student with this id
pub(crate) fn find_student(conn: &Connection, student_id: i64) -> AppResult<User> {
    found(
        users::get_user_with_role(conn, student_id, Role::Student)?,
        "Student could not be found!",
    )
}

/// Reject an educator acting on a subject they are not registered for
pub(crate) fn ensure_registered(conn: &Connection, educator_id: i64, subject_id: i64) -> AppResult<()> {
    if subjects::is_registered(conn, educator_id, subject_id)? {
        Ok(())
    } else {
        Err(AppError::forbidden("You are not registered for this subject!"))
    }
}
