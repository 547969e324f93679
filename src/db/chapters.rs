use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use super::{now, parse_timestamp};
use crate::domain::{Chapter, ChapterSummary};

pub fn insert_chapter(conn: &Connection, subject_id: i64, name: &str) -> Result<i64> {
  let now = now();
  conn.execute(
    "INSERT INTO chapters (subject_id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
    params![subject_id, name, now],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn get_chapter(conn: &Connection, id: i64) -> Result<Option<Chapter>> {
  conn
    .query_row(
      "SELECT id, subject_id, name, created_at, updated_at FROM chapters WHERE id = ?1",
      params![id],
      row_to_chapter,
    )
    .optional()
}

pub fn list_chapters(conn: &Connection, subject_id: i64) -> Result<Vec<Chapter>> {
  let mut stmt = conn.prepare(
    "SELECT id, subject_id, name, created_at, updated_at FROM chapters WHERE subject_id = ?1 ORDER BY id",
  )?;
  let chapters = stmt
    .query_map(params![subject_id], row_to_chapter)?
    .collect::<Result<Vec<_>>>()?;
  Ok(chapters)
}

/// Chapters of a subject with section, topic and quiz counts
pub fn list_chapter_summaries(conn: &Connection, subject_id: i64) -> Result<Vec<ChapterSummary>> {
  let mut stmt = conn.prepare(
    r#"
    SELECT c.id, c.subject_id, c.name, c.created_at, c.updated_at,
           (SELECT COUNT(*) FROM sections s WHERE s.chapter_id = c.id),
           (SELECT COUNT(*) FROM topics t JOIN sections s ON s.id = t.section_id
             WHERE s.chapter_id = c.id),
           (SELECT COUNT(*) FROM quizzes q JOIN sections s ON s.id = q.section_id
             WHERE s.chapter_id = c.id)
    FROM chapters c
    WHERE c.subject_id = ?1
    ORDER BY c.id
    "#,
  )?;
  let summaries = stmt
    .query_map(params![subject_id], |row| {
      Ok(ChapterSummary {
        chapter: row_to_chapter(row)?,
        total_sections: row.get(5)?,
        total_topics: row.get(6)?,
        total_quizzes: row.get(7)?,
      })
    })?
    .collect::<Result<Vec<_>>>()?;
  Ok(summaries)
}

pub fn rename_chapter(conn: &Connection, id: i64, name: &str) -> Result<bool> {
  let changed = conn.execute(
    "UPDATE chapters SET name = ?1, updated_at = ?2 WHERE id = ?3",
    params![name, now(), id],
  )?;
  Ok(changed > 0)
}

pub fn delete_chapter(conn: &Connection, id: i64) -> Result<bool> {
  let changed = conn.execute("DELETE FROM chapters WHERE id = ?1", params![id])?;
  Ok(changed > 0)
}

pub fn count_sections(conn: &Connection, chapter_id: i64) -> Result<i64> {
  conn.query_row(
    "SELECT COUNT(*) FROM sections WHERE chapter_id = ?1",
    params![chapter_id],
    |row| row.get(0),
  )
}

fn row_to_chapter(row: &Row) -> Result<Chapter> {
  let created_at: String = row.get(3)?;
  let updated_at: String = row.get(4)?;
  Ok(Chapter {
    id: row.get(0)?,
    subject_id: row.get(1)?,
    name: row.get(2)?,
    created_at: parse_timestamp(&created_at),
    updated_at: parse_timestamp(&updated_at),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::TestEnv;

  #[test]
  fn test_chapter_requires_subject() {
    let env = TestEnv::new().unwrap();
    assert!(insert_chapter(&env.conn, 42, "Orphan").is_err());
  }

  #[test]
  fn test_chapter_summary_counts() {
    let env = TestEnv::new().unwrap();
    let (subject_id, chapter_id, section_id, _quiz) = env.quiz_tree("MA7");
    env.topic(section_id, "One");
    env.topic(section_id, "Two");
    let other_section = env.section(chapter_id);
    env.topic(other_section, "Three");
    let empty_chapter = env.chapter(subject_id);

    let summaries = list_chapter_summaries(&env.conn, subject_id).unwrap();
    assert_eq!(summaries.len(), 2);

    let full = summaries.iter().find(|s| s.chapter.id == chapter_id).unwrap();
    assert_eq!(full.total_sections, 2);
    assert_eq!(full.total_topics, 3);
    assert_eq!(full.total_quizzes, 1);

    let empty = summaries.iter().find(|s| s.chapter.id == empty_chapter).unwrap();
    assert_eq!(empty.total_sections, 0);
    assert_eq!(empty.total_topics, 0);
  }

  #[test]
  fn test_rename_and_delete() {
    let env = TestEnv::new().unwrap();
    let subject_id = env.subject("MA7");
    let id = env.chapter(subject_id);
    assert!(rename_chapter(&env.conn, id, "Fractions").unwrap());
    assert_eq!(get_chapter(&env.conn, id).unwrap().unwrap().name, "Fractions");
    assert!(delete_chapter(&env.conn, id).unwrap());
    assert!(list_chapters(&env.conn, subject_id).unwrap().is_empty());
  }
}
