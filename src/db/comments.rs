use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use super::{now, parse_timestamp};
use crate::domain::{Comment, User};

const COMMENT_SELECT: &str = r#"
    SELECT cm.id, cm.section_id, cm.comment_text, cm.user_name, cm.user_id, cm.user_role,
           COALESCE(u.image, ''), cm.created_at, cm.updated_at
    FROM comments cm
    LEFT JOIN users u ON u.id = cm.user_id
"#;

/// Add a comment authored by `author`
pub fn insert_comment(conn: &Connection, section_id: i64, author: &User, text: &str) -> Result<i64> {
  let now = now();
  conn.execute(
    r#"
    INSERT INTO comments (section_id, comment_text, user_name, user_id, user_role, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
    "#,
    params![section_id, text, author.name, author.id, author.role.as_str(), now],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn get_comment(conn: &Connection, id: i64) -> Result<Option<Comment>> {
  conn
    .query_row(&format!("{COMMENT_SELECT} WHERE cm.id = ?1"), params![id], row_to_comment)
    .optional()
}

/// Comments of a section, oldest first, with the author's current image
pub fn list_comments(conn: &Connection, section_id: i64) -> Result<Vec<Comment>> {
  let mut stmt = conn.prepare(&format!(
    "{COMMENT_SELECT} WHERE cm.section_id = ?1 ORDER BY cm.created_at, cm.id"
  ))?;
  let comments = stmt
    .query_map(params![section_id], row_to_comment)?
    .collect::<Result<Vec<_>>>()?;
  Ok(comments)
}

pub fn update_comment(conn: &Connection, id: i64, text: &str) -> Result<bool> {
  let changed = conn.execute(
    "UPDATE comments SET comment_text = ?1, updated_at = ?2 WHERE id = ?3",
    params![text, now(), id],
  )?;
  Ok(changed > 0)
}

pub fn delete_comment(conn: &Connection, id: i64) -> Result<bool> {
  let changed = conn.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
  Ok(changed > 0)
}

fn row_to_comment(row: &Row) -> Result<Comment> {
  let created_at: String = row.get(7)?;
  let updated_at: String = row.get(8)?;
  Ok(Comment {
    id: row.get(0)?,
    section_id: row.get(1)?,
    comment_text: row.get(2)?,
    user_name: row.get(3)?,
    user_id: row.get(4)?,
    user_role: row.get(5)?,
    user_image: row.get(6)?,
    created_at: parse_timestamp(&created_at),
    updated_at: parse_timestamp(&updated_at),
  })
}
