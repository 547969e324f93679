//! Progress aggregation over the subject → chapter → section → topic tree.
//!
//! A subject's progress is the share of available marks a student earned on
//! the quizzes they took in it: `round(100 × Σmarks / (10 × records))`.
//! A student with no records in a subject sits at 0.

use rusqlite::{params, Connection, Result};
use serde::Serialize;

use crate::config::QUIZ_MAX_MARKS;
use crate::db::{records, subjects};

/// Per-subject totals and completion for one student
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectProgress {
  pub subject_id: i64,
  pub subject: String,
  pub total_chapters: i64,
  pub total_sections: i64,
  pub total_topics: i64,
  pub progress: i64,
}

/// Educator view of how a quiz went across a subject's students
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizStats {
  pub assigned: i64,
  pub completed: i64,
  pub incomplete: i64,
  pub student_percentage: i64,
  pub accuracy_percentage: i64,
}

/// Rounded percentage of `part` over `whole`; 0 when there is nothing to divide by
pub fn percent(part: i64, whole: i64) -> i64 {
  if whole <= 0 {
    return 0;
  }
  ((100 * part) as f64 / whole as f64).round() as i64
}

/// Percentage of available marks earned across a set of quiz records
pub fn marks_percentage(marks: &[i64]) -> i64 {
  let earned: i64 = marks.iter().sum();
  percent(earned, QUIZ_MAX_MARKS * marks.len() as i64)
}

/// Progress in every subject the student is enrolled in
pub fn student_progress(conn: &Connection, student_id: i64) -> Result<Vec<SubjectProgress>> {
  let enrolled = subjects::enrolled_subjects(conn, student_id)?;
  let mut progress = Vec::with_capacity(enrolled.len());

  for subject in enrolled {
    let (total_chapters, total_sections, total_topics) = subject_totals(conn, subject.id)?;
    let marks = records::subject_marks(conn, student_id, subject.id)?;
    progress.push(SubjectProgress {
      subject_id: subject.id,
      subject: subject.name,
      total_chapters,
      total_sections,
      total_topics,
      progress: marks_percentage(&marks),
    });
  }

  Ok(progress)
}

/// (chapters, sections, topics) under a subject
pub fn subject_totals(conn: &Connection, subject_id: i64) -> Result<(i64, i64, i64)> {
  conn.query_row(
    r#"
    SELECT
      (SELECT COUNT(*) FROM chapters c WHERE c.subject_id = ?1),
      (SELECT COUNT(*) FROM sections s JOIN chapters c ON c.id = s.chapter_id
        WHERE c.subject_id = ?1),
      (SELECT COUNT(*) FROM topics t JOIN sections s ON s.id = t.section_id
        JOIN chapters c ON c.id = s.chapter_id WHERE c.subject_id = ?1)
    "#,
    params![subject_id],
    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
  )
}

pub fn quiz_stats(conn: &Connection, subject_id: i64, quiz_id: i64) -> Result<QuizStats> {
  let assigned = subjects::count_enrolled(conn, subject_id)?;
  let marks = records::quiz_marks(conn, subject_id, quiz_id)?;
  let completed = marks.len() as i64;

  tracing::debug!(
    "Quiz {} stats: {} assigned, {} completed",
    quiz_id,
    assigned,
    completed
  );

  Ok(QuizStats {
    assigned,
    completed,
    incomplete: (assigned - completed).max(0),
    student_percentage: percent(completed, assigned),
    accuracy_percentage: marks_percentage(&marks),
  })
}
