//! Quiz records: a student's scored attempt at a section's quiz

use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use super::{now, parse_timestamp};
use crate::domain::{NamedQuizRecord, QuizRecord};

const RECORD_COLUMNS: &str =
  "id, student_id, quiz_id, subject_id, chapter_id, section_id, marks, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct RecordInput {
  pub student_id: i64,
  pub quiz_id: i64,
  pub subject_id: i64,
  pub chapter_id: i64,
  pub section_id: i64,
  pub marks: i64,
}

/// Insert a record, or overwrite the marks of the student's existing record for the quiz
pub fn upsert_record(conn: &Connection, input: &RecordInput) -> Result<QuizRecord> {
  let now = now();
  conn.query_row(
    &format!(
      r#"
      INSERT INTO quiz_records (student_id, quiz_id, subject_id, chapter_id, section_id, marks, created_at, updated_at)
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
      ON CONFLICT (student_id, quiz_id) DO UPDATE SET marks = excluded.marks, updated_at = excluded.updated_at
      RETURNING {RECORD_COLUMNS}
      "#
    ),
    params![
      input.student_id,
      input.quiz_id,
      input.subject_id,
      input.chapter_id,
      input.section_id,
      input.marks,
      now,
    ],
    row_to_record,
  )
}

pub fn record_for_quiz(conn: &Connection, student_id: i64, quiz_id: i64) -> Result<Option<QuizRecord>> {
  conn
    .query_row(
      &format!("SELECT {RECORD_COLUMNS} FROM quiz_records WHERE student_id = ?1 AND quiz_id = ?2"),
      params![student_id, quiz_id],
      row_to_record,
    )
    .optional()
}

/// A student's records in a subject with chapter and section names
pub fn records_in_subject(conn: &Connection, student_id: i64, subject_id: i64) -> Result<Vec<NamedQuizRecord>> {
  let mut stmt = conn.prepare(
    r#"
    SELECT r.id, r.student_id, r.quiz_id, r.subject_id, c.name, s.name, r.marks, r.created_at, r.updated_at
    FROM quiz_records r
    JOIN chapters c ON c.id = r.chapter_id
    JOIN sections s ON s.id = r.section_id
    WHERE r.student_id = ?1 AND r.subject_id = ?2
    ORDER BY r.created_at, r.id
    "#,
  )?;
  let records = stmt
    .query_map(params![student_id, subject_id], |row| {
      let created_at: String = row.get(7)?;
      let updated_at: String = row.get(8)?;
      Ok(NamedQuizRecord {
        id: row.get(0)?,
        student_id: row.get(1)?,
        quiz_id: row.get(2)?,
        subject_id: row.get(3)?,
        chapter: row.get(4)?,
        section: row.get(5)?,
        marks: row.get(6)?,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
      })
    })?
    .collect::<Result<Vec<_>>>()?;
  Ok(records)
}

pub fn records_in_chapter(
  conn: &Connection,
  student_id: i64,
  subject_id: i64,
  chapter_id: i64,
) -> Result<Vec<QuizRecord>> {
  let mut stmt = conn.prepare(&format!(
    r#"
    SELECT {RECORD_COLUMNS} FROM quiz_records
    WHERE student_id = ?1 AND subject_id = ?2 AND chapter_id = ?3
    ORDER BY created_at, id
    "#
  ))?;
  let records = stmt
    .query_map(params![student_id, subject_id, chapter_id], row_to_record)?
    .collect::<Result<Vec<_>>>()?;
  Ok(records)
}

/// Marks of one student in one subject, oldest first
pub fn subject_marks(conn: &Connection, student_id: i64, subject_id: i64) -> Result<Vec<i64>> {
  let mut stmt = conn.prepare(
    "SELECT marks FROM quiz_records WHERE student_id = ?1 AND subject_id = ?2 ORDER BY id",
  )?;
  let marks = stmt
    .query_map(params![student_id, subject_id], |row| row.get(0))?
    .collect::<Result<Vec<_>>>()?;
  Ok(marks)
}

/// Marks of every student who took a quiz in a subject
pub fn quiz_marks(conn: &Connection, subject_id: i64, quiz_id: i64) -> Result<Vec<i64>> {
  let mut stmt = conn.prepare(
    "SELECT marks FROM quiz_records WHERE subject_id = ?1 AND quiz_id = ?2 ORDER BY id",
  )?;
  let marks = stmt
    .query_map(params![subject_id, quiz_id], |row| row.get(0))?
    .collect::<Result<Vec<_>>>()?;
  Ok(marks)
}

fn row_to_record(row: &Row) -> Result<QuizRecord> {
  let created_at: String = row.get(7)?;
  let updated_at: String = row.get(8)?;
  Ok(QuizRecord {
    id: row.get(0)?,
    student_id: row.get(1)?,
    quiz_id: row.get(2)?,
    subject_id: row.get(3)?,
    chapter_id: row.get(4)?,
    section_id: row.get(5)?,
    marks: row.get(6)?,
    created_at: parse_timestamp(&created_at),
    updated_at: parse_timestamp(&updated_at),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Role;
  use crate::testing::TestEnv;

  fn input(student_id: i64, tree: (i64, i64, i64, i64), marks: i64) -> RecordInput {
    let (subject_id, chapter_id, section_id, quiz_id) = tree;
    RecordInput { student_id, quiz_id, subject_id, chapter_id, section_id, marks }
  }

  #[test]
  fn test_upsert_overwrites_marks() {
    let env = TestEnv::new().unwrap();
    let tree = env.quiz_tree("MA7");
    let student = env.user(Role::Student, "s@example.com");

    let first = upsert_record(&env.conn, &input(student, tree, 4)).unwrap();
    let second = upsert_record(&env.conn, &input(student, tree, 9)).unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.marks, 9);
    assert_eq!(subject_marks(&env.conn, student, tree.0).unwrap(), vec![9]);
  }

  #[test]
  fn test_marks_out_of_range_rejected() {
    let env = TestEnv::new().unwrap();
    let tree = env.quiz_tree("MA7");
    let student = env.user(Role::Student, "s@example.com");
    assert!(upsert_record(&env.conn, &input(student, tree, 11)).is_err());
  }

  #[test]
  fn test_records_in_subject_are_named() {
    let env = TestEnv::new().unwrap();
    let tree = env.quiz_tree("MA7");
    let student = env.user(Role::Student, "s@example.com");
    upsert_record(&env.conn, &input(student, tree, 7)).unwrap();

    let records = records_in_subject(&env.conn, student, tree.0).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].chapter, "Chapter");
    assert_eq!(records[0].section, "Section");
    assert_eq!(records_in_chapter(&env.conn, student, tree.0, tree.1).unwrap().len(), 1);
    assert!(record_for_quiz(&env.conn, student, tree.3).unwrap().is_some());
  }

  #[test]
  fn test_quiz_marks_across_students() {
    let env = TestEnv::new().unwrap();
    let tree = env.quiz_tree("MA7");
    let a = env.user(Role::Student, "a@example.com");
    let b = env.user(Role::Student, "b@example.com");
    upsert_record(&env.conn, &input(a, tree, 6)).unwrap();
    upsert_record(&env.conn, &input(b, tree, 8)).unwrap();
    assert_eq!(quiz_marks(&env.conn, tree.0, tree.3).unwrap(), vec![6, 8]);
  }
}
