use rusqlite::{params, Connection, OptionalExtension, Result};

use super::{now, parse_timestamp};
use crate::domain::{Favorite, FavoriteTopic};

/// Bookmark a topic; a repeated bookmark fails on the primary key
pub fn insert_favorite(conn: &Connection, student_id: i64, topic_id: i64) -> Result<Favorite> {
  let now = now();
  conn.execute(
    "INSERT INTO favorites (student_id, topic_id, created_at) VALUES (?1, ?2, ?3)",
    params![student_id, topic_id, now],
  )?;
  Ok(Favorite {
    student_id,
    topic_id,
    created_at: parse_timestamp(&now),
  })
}

pub fn get_favorite(conn: &Connection, student_id: i64, topic_id: i64) -> Result<Option<Favorite>> {
  conn
    .query_row(
      "SELECT student_id, topic_id, created_at FROM favorites WHERE student_id = ?1 AND topic_id = ?2",
      params![student_id, topic_id],
      |row| {
        let created_at: String = row.get(2)?;
        Ok(Favorite {
          student_id: row.get(0)?,
          topic_id: row.get(1)?,
          created_at: parse_timestamp(&created_at),
        })
      },
    )
    .optional()
}

/// A student's favorite topics inside one subject
pub fn favorites_in_subject(conn: &Connection, student_id: i64, subject_id: i64) -> Result<Vec<FavoriteTopic>> {
  let mut stmt = conn.prepare(
    r#"
    SELECT t.id, t.title, s.name, c.name
    FROM favorites f
    JOIN topics t ON t.id = f.topic_id
    JOIN sections s ON s.id = t.section_id
    JOIN chapters c ON c.id = s.chapter_id
    WHERE f.student_id = ?1 AND c.subject_id = ?2
    ORDER BY f.created_at, t.id
    "#,
  )?;
  let favorites = stmt
    .query_map(params![student_id, subject_id], |row| {
      Ok(FavoriteTopic {
        topic_id: row.get(0)?,
        topic_title: row.get(1)?,
        section_name: row.get(2)?,
        chapter_name: row.get(3)?,
      })
    })?
    .collect::<Result<Vec<_>>>()?;
  Ok(favorites)
}

pub fn delete_favorite(conn: &Connection, student_id: i64, topic_id: i64) -> Result<bool> {
  let changed = conn.execute(
    "DELETE FROM favorites WHERE student_id = ?1 AND topic_id = ?2",
    params![student_id, topic_id],
  )?;
  Ok(changed > 0)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Role;
  use crate::testing::TestEnv;

  #[test]
  fn test_duplicate_favorite_rejected() {
    let env = TestEnv::new().unwrap();
    let (_s, _c, section_id, _q) = env.quiz_tree("MA7");
    let topic_id = env.topic(section_id, "Fractions");
    let student_id = env.user(Role::Student, "s@example.com");

    insert_favorite(&env.conn, student_id, topic_id).unwrap();
    assert!(insert_favorite(&env.conn, student_id, topic_id).is_err());
    assert!(get_favorite(&env.conn, student_id, topic_id).unwrap().is_some());
  }

  #[test]
  fn test_favorites_filtered_by_subject() {
    let env = TestEnv::new().unwrap();
    let student_id = env.user(Role::Student, "s@example.com");
    let (maths, _c, maths_section, _q) = env.quiz_tree("MA7");
    let (_science, _c2, science_section, _q2) = env.quiz_tree("SC7");
    let maths_topic = env.topic(maths_section, "Fractions");
    let science_topic = env.topic(science_section, "Cells");
    insert_favorite(&env.conn, student_id, maths_topic).unwrap();
    insert_favorite(&env.conn, student_id, science_topic).unwrap();

    let favorites = favorites_in_subject(&env.conn, student_id, maths).unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].topic_title, "Fractions");
    assert_eq!(favorites[0].section_name, "Section");
    assert_eq!(favorites[0].chapter_name, "Chapter");
  }

  #[test]
  fn test_favorite_removed_with_topic() {
    let env = TestEnv::new().unwrap();
    let (_s, _c, section_id, _q) = env.quiz_tree("MA7");
    let topic_id = env.topic(section_id, "Fractions");
    let student_id = env.user(Role::Student, "s@example.com");
    insert_favorite(&env.conn, student_id, topic_id).unwrap();

    crate::db::topics::delete_topic(&env.conn, topic_id).unwrap();
    assert!(!delete_favorite(&env.conn, student_id, topic_id).unwrap());
  }
}
