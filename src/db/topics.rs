//! Topics and the stored files hanging under catalogue nodes

use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use super::{now, parse_timestamp};
use crate::domain::{DashboardTopic, Topic};

const TOPIC_COLUMNS: &str =
  "t.id, t.section_id, t.title, t.description, t.lecture_note, t.content, t.created_at, t.updated_at";

/// Topic fields as submitted; file fields hold stored upload paths
#[derive(Debug, Clone, Default)]
pub struct TopicInput {
  pub title: String,
  pub description: Option<String>,
  pub lecture_note: Option<String>,
  pub content: Option<String>,
}

pub fn insert_topic(conn: &Connection, section_id: i64, topic: &TopicInput) -> Result<i64> {
  let now = now();
  conn.execute(
    r#"
    INSERT INTO topics (section_id, title, description, lecture_note, content, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
    "#,
    params![section_id, topic.title, topic.description, topic.lecture_note, topic.content, now],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn get_topic(conn: &Connection, id: i64) -> Result<Option<Topic>> {
  conn
    .query_row(
      &format!("SELECT {TOPIC_COLUMNS} FROM topics t WHERE t.id = ?1"),
      params![id],
      row_to_topic,
    )
    .optional()
}

pub fn list_topics(conn: &Connection, section_id: i64) -> Result<Vec<Topic>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {TOPIC_COLUMNS} FROM topics t WHERE t.section_id = ?1 ORDER BY t.id"
  ))?;
  let topics = stmt
    .query_map(params![section_id], row_to_topic)?
    .collect::<Result<Vec<_>>>()?;
  Ok(topics)
}

/// Update a topic. Absent files keep the stored ones.
pub fn update_topic(conn: &Connection, id: i64, topic: &TopicInput) -> Result<bool> {
  let changed = conn.execute(
    r#"
    UPDATE topics
    SET title = ?1, description = ?2,
        lecture_note = COALESCE(?3, lecture_note),
        content = COALESCE(?4, content),
        updated_at = ?5
    WHERE id = ?6
    "#,
    params![topic.title, topic.description, topic.lecture_note, topic.content, now(), id],
  )?;
  Ok(changed > 0)
}

pub fn delete_topic(conn: &Connection, id: i64) -> Result<bool> {
  let changed = conn.execute("DELETE FROM topics WHERE id = ?1", params![id])?;
  Ok(changed > 0)
}

/// Most recently created topics with subject name, grade and educator
pub fn latest_topics(conn: &Connection, limit: i64) -> Result<Vec<DashboardTopic>> {
  let mut stmt = conn.prepare(&format!(
    r#"
    SELECT {TOPIC_COLUMNS}, sub.name, sub.grade, sub.educator
    FROM topics t
    JOIN sections s ON s.id = t.section_id
    JOIN chapters c ON c.id = s.chapter_id
    JOIN subjects sub ON sub.id = c.subject_id
    ORDER BY t.created_at DESC, t.id DESC
    LIMIT ?1
    "#
  ))?;
  let topics = stmt
    .query_map(params![limit], |row| {
      Ok(DashboardTopic {
        topic: row_to_topic(row)?,
        subject: row.get(8)?,
        grade: row.get(9)?,
        educator: row.get(10)?,
      })
    })?
    .collect::<Result<Vec<_>>>()?;
  Ok(topics)
}

/// Catalogue node whose descendants' files are collected before a delete
#[derive(Debug, Clone, Copy)]
pub enum Scope {
  Subject(i64),
  Chapter(i64),
  Section(i64),
}

impl Scope {
  /// Filter selecting the section ids under this node
  fn sections_filter(&self) -> (&'static str, i64) {
    match *self {
      Scope::Subject(id) => (
        "SELECT s.id FROM sections s JOIN chapters c ON c.id = s.chapter_id WHERE c.subject_id = ?1",
        id,
      ),
      Scope::Chapter(id) => ("SELECT s.id FROM sections s WHERE s.chapter_id = ?1", id),
      Scope::Section(id) => ("SELECT ?1", id),
    }
  }
}

/// Every stored upload under a catalogue node: topic lecture notes and
/// content files, quiz question and solution files.
pub fn stored_files(conn: &Connection, scope: Scope) -> Result<Vec<String>> {
  let (sections, id) = scope.sections_filter();
  let sql = format!(
    r#"
    SELECT lecture_note FROM topics WHERE section_id IN ({sections}) AND lecture_note IS NOT NULL
    UNION ALL
    SELECT content FROM topics WHERE section_id IN ({sections}) AND content IS NOT NULL
    UNION ALL
    SELECT qu.question FROM questions qu JOIN quizzes q ON q.id = qu.quiz_id
      WHERE q.section_id IN ({sections})
    UNION ALL
    SELECT qu.solution FROM questions qu JOIN quizzes q ON q.id = qu.quiz_id
      WHERE q.section_id IN ({sections}) AND qu.solution IS NOT NULL
    "#
  );
  let mut stmt = conn.prepare(&sql)?;
  let files = stmt
    .query_map(params![id], |row| row.get::<_, String>(0))?
    .collect::<Result<Vec<_>>>()?;
  Ok(files)
}

fn row_to_topic(row: &Row) -> Result<Topic> {
  let created_at: String = row.get(6)?;
  let updated_at: String = row.get(7)?;
  Ok(Topic {
    id: row.get(0)?,
    section_id: row.get(1)?,
    title: row.get(2)?,
    description: row.get(3)?,
    lecture_note: row.get(4)?,
    content: row.get(5)?,
    created_at: parse_timestamp(&created_at),
    updated_at: parse_timestamp(&updated_at),
  })
}
