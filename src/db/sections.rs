use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use super::{now, parse_timestamp};
use crate::domain::{QuizAvailability, Section, SectionSummary};

pub fn insert_section(conn: &Connection, chapter_id: i64, name: &str) -> Result<i64> {
  let now = now();
  conn.execute(
    "INSERT INTO sections (chapter_id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
    params![chapter_id, name, now],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn get_section(conn: &Connection, id: i64) -> Result<Option<Section>> {
  conn
    .query_row(
      "SELECT id, chapter_id, name, created_at, updated_at FROM sections WHERE id = ?1",
      params![id],
      row_to_section,
    )
    .optional()
}

pub fn list_sections(conn: &Connection, chapter_id: i64) -> Result<Vec<Section>> {
  let mut stmt = conn.prepare(
    "SELECT id, chapter_id, name, created_at, updated_at FROM sections WHERE chapter_id = ?1 ORDER BY id",
  )?;
  let sections = stmt
    .query_map(params![chapter_id], row_to_section)?
    .collect::<Result<Vec<_>>>()?;
  Ok(sections)
}

/// Sections of a chapter with topic count and whether a quiz exists
pub fn list_section_summaries(conn: &Connection, chapter_id: i64) -> Result<Vec<SectionSummary>> {
  let mut stmt = conn.prepare(
    r#"
    SELECT s.id, s.chapter_id, s.name, s.created_at, s.updated_at,
           (SELECT COUNT(*) FROM topics t WHERE t.section_id = s.id),
           EXISTS (SELECT 1 FROM quizzes q WHERE q.section_id = s.id)
    FROM sections s
    WHERE s.chapter_id = ?1
    ORDER BY s.id
    "#,
  )?;
  let summaries = stmt
    .query_map(params![chapter_id], |row| {
      Ok(SectionSummary {
        section: row_to_section(row)?,
        total_topics: row.get(5)?,
        quiz: QuizAvailability::from_bool(row.get(6)?),
      })
    })?
    .collect::<Result<Vec<_>>>()?;
  Ok(summaries)
}

pub fn rename_section(conn: &Connection, id: i64, name: &str) -> Result<bool> {
  let changed = conn.execute(
    "UPDATE sections SET name = ?1, updated_at = ?2 WHERE id = ?3",
    params![name, now(), id],
  )?;
  Ok(changed > 0)
}

pub fn delete_section(conn: &Connection, id: i64) -> Result<bool> {
  let changed = conn.execute("DELETE FROM sections WHERE id = ?1", params![id])?;
  Ok(changed > 0)
}

/// Subject and chapter a section hangs under, as (subject_id, chapter_id)
pub fn section_lineage(conn: &Connection, section_id: i64) -> Result<Option<(i64, i64)>> {
  conn
    .query_row(
      r#"
      SELECT c.subject_id, c.id
      FROM sections s
      JOIN chapters c ON c.id = s.chapter_id
      WHERE s.id = ?1
      "#,
      params![section_id],
      |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
}

fn row_to_section(row: &Row) -> Result<Section> {
  let created_at: String = row.get(3)?;
  let updated_at: String = row.get(4)?;
  Ok(Section {
    id: row.get(0)?,
    chapter_id: row.get(1)?,
    name: row.get(2)?,
    created_at: parse_timestamp(&created_at),
    updated_at: parse_timestamp(&updated_at),
  })
}
