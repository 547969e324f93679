//! Subjects, educator registrations and student enrollments

use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use super::{now, parse_timestamp};
use crate::domain::Subject;

const SUBJECT_COLUMNS: &str =
  "s.id, s.name, s.code, s.grade, s.description, s.educator, s.enrollment, s.created_at, s.updated_at";

pub fn insert_subject(
  conn: &Connection,
  name: &str,
  code: &str,
  grade: &str,
  description: &str,
) -> Result<i64> {
  let now = now();
  conn.execute(
    r#"
    INSERT INTO subjects (name, code, grade, description, enrollment, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)
    "#,
    params![name, code, grade, description, now],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn get_subject(conn: &Connection, id: i64) -> Result<Option<Subject>> {
  conn
    .query_row(
      &format!("SELECT {SUBJECT_COLUMNS} FROM subjects s WHERE s.id = ?1"),
      params![id],
      row_to_subject,
    )
    .optional()
}

pub fn list_subjects(conn: &Connection) -> Result<Vec<Subject>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {SUBJECT_COLUMNS} FROM subjects s ORDER BY s.grade, s.name"
  ))?;
  let subjects = stmt
    .query_map([], row_to_subject)?
    .collect::<Result<Vec<_>>>()?;
  Ok(subjects)
}

pub fn update_subject(
  conn: &Connection,
  id: i64,
  name: &str,
  code: &str,
  grade: &str,
  description: &str,
) -> Result<bool> {
  let changed = conn.execute(
    r#"
    UPDATE subjects SET name = ?1, code = ?2, grade = ?3, description = ?4, updated_at = ?5
    WHERE id = ?6
    "#,
    params![name, code, grade, description, now(), id],
  )?;
  Ok(changed > 0)
}

/// Delete a subject; chapters, sections, topics, quizzes and records cascade
pub fn delete_subject(conn: &Connection, id: i64) -> Result<bool> {
  let changed = conn.execute("DELETE FROM subjects WHERE id = ?1", params![id])?;
  Ok(changed > 0)
}

// ==================== Educator registration ====================

/// Register an educator for a subject and record their name on it.
/// A subject already taken by any educator fails the UNIQUE constraint.
pub fn register_educator(conn: &Connection, educator_id: i64, educator_name: &str, subject_id: i64) -> Result<()> {
  let now = now();
  conn.execute(
    "INSERT INTO educator_subjects (educator_id, subject_id, created_at) VALUES (?1, ?2, ?3)",
    params![educator_id, subject_id, now],
  )?;
  conn.execute(
    "UPDATE subjects SET educator = ?1, updated_at = ?2 WHERE id = ?3",
    params![educator_name, now, subject_id],
  )?;
  Ok(())
}

pub fn unregister_educator(conn: &Connection, educator_id: i64, subject_id: i64) -> Result<bool> {
  let changed = conn.execute(
    "DELETE FROM educator_subjects WHERE educator_id = ?1 AND subject_id = ?2",
    params![educator_id, subject_id],
  )?;
  if changed > 0 {
    conn.execute(
      "UPDATE subjects SET educator = NULL, updated_at = ?1 WHERE id = ?2",
      params![now(), subject_id],
    )?;
  }
  Ok(changed > 0)
}

pub fn has_educator(conn: &Connection, subject_id: i64) -> Result<bool> {
  let count: i64 = conn.query_row(
    "SELECT COUNT(*) FROM educator_subjects WHERE subject_id = ?1",
    params![subject_id],
    |row| row.get(0),
  )?;
  Ok(count > 0)
}

pub fn is_registered(conn: &Connection, educator_id: i64, subject_id: i64) -> Result<bool> {
  let count: i64 = conn.query_row(
    "SELECT COUNT(*) FROM educator_subjects WHERE educator_id = ?1 AND subject_id = ?2",
    params![educator_id, subject_id],
    |row| row.get(0),
  )?;
  Ok(count > 0)
}

pub fn registered_subjects(conn: &Connection, educator_id: i64) -> Result<Vec<Subject>> {
  let mut stmt = conn.prepare(&format!(
    r#"
    SELECT {SUBJECT_COLUMNS}
    FROM educator_subjects es
    JOIN subjects s ON s.id = es.subject_id
    WHERE es.educator_id = ?1
    ORDER BY s.grade, s.name
    "#
  ))?;
  let subjects = stmt
    .query_map(params![educator_id], row_to_subject)?
    .collect::<Result<Vec<_>>>()?;
  Ok(subjects)
}

// ==================== Student enrollment ====================

/// Enroll a student and bump the subject's counter. Callers wrap this in a
/// transaction; a repeated enrollment fails on the primary key.
pub fn enroll_student(conn: &Connection, student_id: i64, subject_id: i64) -> Result<()> {
  let now = now();
  conn.execute(
    "INSERT INTO student_subjects (student_id, subject_id, created_at) VALUES (?1, ?2, ?3)",
    params![student_id, subject_id, now],
  )?;
  conn.execute(
    "UPDATE subjects SET enrollment = enrollment + 1, updated_at = ?1 WHERE id = ?2",
    params![now, subject_id],
  )?;
  Ok(())
}

pub fn is_enrolled(conn: &Connection, student_id: i64, subject_id: i64) -> Result<bool> {
  let count: i64 = conn.query_row(
    "SELECT COUNT(*) FROM student_subjects WHERE student_id = ?1 AND subject_id = ?2",
    params![student_id, subject_id],
    |row| row.get(0),
  )?;
  Ok(count > 0)
}

pub fn enrolled_subjects(conn: &Connection, student_id: i64) -> Result<Vec<Subject>> {
  let mut stmt = conn.prepare(&format!(
    r#"
    SELECT {SUBJECT_COLUMNS}
    FROM student_subjects ss
    JOIN subjects s ON s.id = ss.subject_id
    WHERE ss.student_id = ?1
    ORDER BY s.grade, s.name
    "#
  ))?;
  let subjects = stmt
    .query_map(params![student_id], row_to_subject)?
    .collect::<Result<Vec<_>>>()?;
  Ok(subjects)
}

pub fn count_enrolled(conn: &Connection, subject_id: i64) -> Result<i64> {
  conn.query_row(
    "SELECT COUNT(*) FROM student_subjects WHERE subject_id = ?1",
    params![subject_id],
    |row| row.get(0),
  )
}

fn row_to_subject(row: &Row) -> Result<Subject> {
  let created_at: String = row.get(7)?;
  let updated_at: String = row.get(8)?;
  Ok(Subject {
    id: row.get(0)?,
    name: row.get(1)?,
    code: row.get(2)?,
    grade: row.get(3)?,
    description: row.get(4)?,
    educator: row.get(5)?,
    enrollment: row.get(6)?,
    created_at: parse_timestamp(&created_at),
    updated_at: parse_timestamp(&updated_at),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Role;
  use crate::testing::TestEnv;

  #[test]
  fn test_subject_code_is_unique() {
    let env = TestEnv::new().unwrap();
    env.subject("MA7");
    assert!(insert_subject(&env.conn, "Other", "MA7", "8", "x").is_err());
  }

  #[test]
  fn test_update_subject() {
    let env = TestEnv::new().unwrap();
    let id = env.subject("MA7");
    assert!(update_subject(&env.conn, id, "Algebra", "AL7", "7", "Letters").unwrap());
    let subject = get_subject(&env.conn, id).unwrap().unwrap();
    assert_eq!(subject.name, "Algebra");
    assert_eq!(subject.code, "AL7");
    assert!(!update_subject(&env.conn, 999, "a", "b", "c", "d").unwrap());
  }

  #[test]
  fn test_enroll_increments_counter_once() {
    let env = TestEnv::new().unwrap();
    let subject_id = env.subject("MA7");
    let student_id = env.user(Role::Student, "s@example.com");

    enroll_student(&env.conn, student_id, subject_id).unwrap();
    assert_eq!(get_subject(&env.conn, subject_id).unwrap().unwrap().enrollment, 1);

    // second enrollment fails before touching the counter
    assert!(enroll_student(&env.conn, student_id, subject_id).is_err());
    assert_eq!(get_subject(&env.conn, subject_id).unwrap().unwrap().enrollment, 1);
    assert!(is_enrolled(&env.conn, student_id, subject_id).unwrap());
    assert_eq!(enrolled_subjects(&env.conn, student_id).unwrap().len(), 1);
  }

  #[test]
  fn test_one_educator_per_subject() {
    let env = TestEnv::new().unwrap();
    let subject_id = env.subject("MA7");
    let first = env.user(Role::Educator, "a@example.com");
    let second = env.user(Role::Educator, "b@example.com");

    register_educator(&env.conn, first, "Alice", subject_id).unwrap();
    assert!(register_educator(&env.conn, second, "Bob", subject_id).is_err());

    let subject = get_subject(&env.conn, subject_id).unwrap().unwrap();
    assert_eq!(subject.educator.as_deref(), Some("Alice"));
    assert_eq!(registered_subjects(&env.conn, first).unwrap().len(), 1);
  }

  #[test]
  fn test_unregister_clears_educator() {
    let env = TestEnv::new().unwrap();
    let subject_id = env.subject("MA7");
    let educator = env.user(Role::Educator, "a@example.com");
    register_educator(&env.conn, educator, "Alice", subject_id).unwrap();

    assert!(unregister_educator(&env.conn, educator, subject_id).unwrap());
    assert!(!has_educator(&env.conn, subject_id).unwrap());
    assert!(get_subject(&env.conn, subject_id).unwrap().unwrap().educator.is_none());
    assert!(!unregister_educator(&env.conn, educator, subject_id).unwrap());
  }
}
