//! Answer sheets: one master answer per (student, quiz) plus single answers

use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use super::{now, parse_timestamp};
use crate::domain::{Answer, SingleAnswer};

/// Counter value clients send to mean "append"
pub const APPEND_COUNTER: i64 = 99;

/// How [`put_single_answer`] placed the answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
  Appended,
  Replaced,
}

pub fn insert_answer(conn: &Connection, student_id: i64, quiz_id: i64) -> Result<i64> {
  let now = now();
  conn.execute(
    "INSERT INTO answers (student_id, quiz_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
    params![student_id, quiz_id, now],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn get_answer(conn: &Connection, id: i64) -> Result<Option<Answer>> {
  conn
    .query_row(
      "SELECT id, student_id, quiz_id, created_at, updated_at FROM answers WHERE id = ?1",
      params![id],
      row_to_answer,
    )
    .optional()
}

pub fn answer_for_quiz(conn: &Connection, student_id: i64, quiz_id: i64) -> Result<Option<Answer>> {
  conn
    .query_row(
      "SELECT id, student_id, quiz_id, created_at, updated_at FROM answers WHERE student_id = ?1 AND quiz_id = ?2",
      params![student_id, quiz_id],
      row_to_answer,
    )
    .optional()
}

pub fn list_single_answers(conn: &Connection, answer_id: i64) -> Result<Vec<SingleAnswer>> {
  let mut stmt = conn.prepare(
    r#"
    SELECT id, answer_id, position, answer, created_at, updated_at
    FROM single_answers WHERE answer_id = ?1 ORDER BY position
    "#,
  )?;
  let answers = stmt
    .query_map(params![answer_id], row_to_single_answer)?
    .collect::<Result<Vec<_>>>()?;
  Ok(answers)
}

/// Append a single answer, or replace the one at `counter`.
///
/// `None`, [`APPEND_COUNTER`] or the next free position appends, and so does
/// any counter while the sheet is still empty. Otherwise the counter must
/// name an existing position; if it does not, `Ok(None)` is returned and
/// nothing is written.
pub fn put_single_answer(
  conn: &Connection,
  answer_id: i64,
  counter: Option<i64>,
  text: &str,
) -> Result<Option<(SingleAnswer, Placement)>> {
  let count: i64 = conn.query_row(
    "SELECT COUNT(*) FROM single_answers WHERE answer_id = ?1",
    params![answer_id],
    |row| row.get(0),
  )?;
  let now = now();

  let replace_at = match counter {
    Some(position) if position != APPEND_COUNTER && count > 0 && position != count => {
      if position < 0 || position >= count {
        return Ok(None);
      }
      Some(position)
    }
    _ => None,
  };

  let id = match replace_at {
    Some(position) => {
      conn.query_row(
        r#"
        UPDATE single_answers SET answer = ?1, updated_at = ?2
        WHERE answer_id = ?3 AND position = ?4
        RETURNING id
        "#,
        params![text, now, answer_id, position],
        |row| row.get::<_, i64>(0),
      )?
    }
    None => {
      conn.execute(
        r#"
        INSERT INTO single_answers (answer_id, position, answer, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?4)
        "#,
        params![answer_id, count, text, now],
      )?;
      conn.last_insert_rowid()
    }
  };

  let placement = if replace_at.is_some() {
    Placement::Replaced
  } else {
    Placement::Appended
  };
  let single = conn
    .query_row(
      "SELECT id, answer_id, position, answer, created_at, updated_at FROM single_answers WHERE id = ?1",
      params![id],
      row_to_single_answer,
    )
    .optional()?;
  Ok(single.map(|s| (s, placement)))
}

fn row_to_answer(row: &Row) -> Result<Answer> {
  let created_at: String = row.get(3)?;
  let updated_at: String = row.get(4)?;
  Ok(Answer {
    id: row.get(0)?,
    student_id: row.get(1)?,
    quiz_id: row.get(2)?,
    created_at: parse_timestamp(&created_at),
    updated_at: parse_timestamp(&updated_at),
  })
}

fn row_to_single_answer(row: &Row) -> Result<SingleAnswer> {
  let created_at: String = row.get(4)?;
  let updated_at: String = row.get(5)?;
  Ok(SingleAnswer {
    id: row.get(0)?,
    answer_id: row.get(1)?,
    position: row.get(2)?,
    answer: row.get(3)?,
    created_at: parse_timestamp(&created_at),
    updated_at: parse_timestamp(&updated_at),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Role;
  use crate::testing::TestEnv;

  fn sheet(env: &TestEnv) -> i64 {
    let (_s, _c, _section, quiz_id) = env.quiz_tree("MA7");
    let student_id = env.user(Role::Student, "s@example.com");
    insert_answer(&env.conn, student_id, quiz_id).unwrap()
  }

  #[test]
  fn test_one_master_answer_per_student_and_quiz() {
    let env = TestEnv::new().unwrap();
    let id = sheet(&env);
    let answer = get_answer(&env.conn, id).unwrap().unwrap();
    assert!(insert_answer(&env.conn, answer.student_id, answer.quiz_id).is_err());
    assert_eq!(
      answer_for_quiz(&env.conn, answer.student_id, answer.quiz_id).unwrap().unwrap().id,
      id
    );
  }

  #[test]
  fn test_append_then_replace() {
    let env = TestEnv::new().unwrap();
    let id = sheet(&env);

    let (first, placed) = put_single_answer(&env.conn, id, None, "a").unwrap().unwrap();
    assert_eq!(placed, Placement::Appended);
    let (second, _) = put_single_answer(&env.conn, id, Some(APPEND_COUNTER), "b").unwrap().unwrap();
    assert_eq!(first.position, 0);
    assert_eq!(second.position, 1);

    let (replaced, placed) = put_single_answer(&env.conn, id, Some(0), "c").unwrap().unwrap();
    assert_eq!(placed, Placement::Replaced);
    assert_eq!(replaced.id, first.id);
    assert_eq!(replaced.answer, "c");

    let all = list_single_answers(&env.conn, id).unwrap();
    let texts: Vec<_> = all.iter().map(|a| a.answer.as_str()).collect();
    assert_eq!(texts, vec!["c", "b"]);
  }

  #[test]
  fn test_first_answer_with_counter_zero_appends() {
    let env = TestEnv::new().unwrap();
    let id = sheet(&env);

    let (first, placed) = put_single_answer(&env.conn, id, Some(0), "a").unwrap().unwrap();
    assert_eq!(placed, Placement::Appended);
    assert_eq!(first.position, 0);

    // the next free position appends as well
    let (second, placed) = put_single_answer(&env.conn, id, Some(1), "b").unwrap().unwrap();
    assert_eq!(placed, Placement::Appended);
    assert_eq!(second.position, 1);
    assert_eq!(list_single_answers(&env.conn, id).unwrap().len(), 2);
  }

  #[test]
  fn test_out_of_range_counter_writes_nothing() {
    let env = TestEnv::new().unwrap();
    let id = sheet(&env);
    put_single_answer(&env.conn, id, None, "a").unwrap();
    assert!(put_single_answer(&env.conn, id, Some(5), "x").unwrap().is_none());
    assert!(put_single_answer(&env.conn, id, Some(-1), "x").unwrap().is_none());
    assert_eq!(list_single_answers(&env.conn, id).unwrap().len(), 1);
  }
}
