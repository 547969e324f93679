//! Quizzes (one per section) and their questions

use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use super::{now, parse_timestamp};
use crate::domain::{Question, Quiz};

const QUESTION_COLUMNS: &str =
  "id, quiz_id, question, solution, option1, option2, option3, option4, answer, created_at, updated_at";

/// Question fields as submitted; `question` and `solution` are stored upload paths
#[derive(Debug, Clone)]
pub struct QuestionInput {
  pub question: String,
  pub solution: Option<String>,
  pub options: [String; 4],
  pub answer: String,
}

/// Create the quiz of a section; a second quiz fails the UNIQUE constraint
pub fn insert_quiz(conn: &Connection, section_id: i64) -> Result<i64> {
  let now = now();
  conn.execute(
    "INSERT INTO quizzes (section_id, created_at, updated_at) VALUES (?1, ?2, ?2)",
    params![section_id, now],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn get_quiz(conn: &Connection, id: i64) -> Result<Option<Quiz>> {
  conn
    .query_row(
      "SELECT id, section_id, created_at, updated_at FROM quizzes WHERE id = ?1",
      params![id],
      row_to_quiz,
    )
    .optional()
}

pub fn quiz_for_section(conn: &Connection, section_id: i64) -> Result<Option<Quiz>> {
  conn
    .query_row(
      "SELECT id, section_id, created_at, updated_at FROM quizzes WHERE section_id = ?1",
      params![section_id],
      row_to_quiz,
    )
    .optional()
}

pub fn delete_quiz(conn: &Connection, id: i64) -> Result<bool> {
  let changed = conn.execute("DELETE FROM quizzes WHERE id = ?1", params![id])?;
  Ok(changed > 0)
}

pub fn insert_question(conn: &Connection, quiz_id: i64, input: &QuestionInput) -> Result<i64> {
  let now = now();
  let [option1, option2, option3, option4] = &input.options;
  conn.execute(
    r#"
    INSERT INTO questions (quiz_id, question, solution, option1, option2, option3, option4, answer, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
    "#,
    params![quiz_id, input.question, input.solution, option1, option2, option3, option4, input.answer, now],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn get_question(conn: &Connection, id: i64) -> Result<Option<Question>> {
  conn
    .query_row(
      &format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?1"),
      params![id],
      row_to_question,
    )
    .optional()
}

pub fn list_questions(conn: &Connection, quiz_id: i64) -> Result<Vec<Question>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {QUESTION_COLUMNS} FROM questions WHERE quiz_id = ?1 ORDER BY id"
  ))?;
  let questions = stmt
    .query_map(params![quiz_id], row_to_question)?
    .collect::<Result<Vec<_>>>()?;
  Ok(questions)
}

/// Stored question and solution files of a quiz
pub fn question_files(conn: &Connection, quiz_id: i64) -> Result<Vec<String>> {
  let files = list_questions(conn, quiz_id)?
    .into_iter()
    .flat_map(|q| std::iter::once(q.question).chain(q.solution))
    .collect();
  Ok(files)
}

fn row_to_quiz(row: &Row) -> Result<Quiz> {
  let created_at: String = row.get(2)?;
  let updated_at: String = row.get(3)?;
  Ok(Quiz {
    id: row.get(0)?,
    section_id: row.get(1)?,
    created_at: parse_timestamp(&created_at),
    updated_at: parse_timestamp(&updated_at),
  })
}

fn row_to_question(row: &Row) -> Result<Question> {
  let created_at: String = row.get(9)?;
  let updated_at: String = row.get(10)?;
  Ok(Question {
    id: row.get(0)?,
    quiz_id: row.get(1)?,
    question: row.get(2)?,
    solution: row.get(3)?,
    option1: row.get(4)?,
    option2: row.get(5)?,
    option3: row.get(6)?,
    option4: row.get(7)?,
    answer: row.get(8)?,
    created_at: parse_timestamp(&created_at),
    updated_at: parse_timestamp(&updated_at),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::TestEnv;

  fn question(file: &str, solution: Option<&str>) -> QuestionInput {
    QuestionInput {
      question: file.to_string(),
      solution: solution.map(str::to_string),
      options: ["1".into(), "2".into(), "3".into(), "4".into()],
      answer: "2".into(),
    }
  }

  #[test]
  fn test_one_quiz_per_section() {
    let env = TestEnv::new().unwrap();
    let (_s, _c, section_id, quiz_id) = env.quiz_tree("MA7");
    assert!(insert_quiz(&env.conn, section_id).is_err());
    assert_eq!(quiz_for_section(&env.conn, section_id).unwrap().unwrap().id, quiz_id);
  }

  #[test]
  fn test_questions_and_files() {
    let env = TestEnv::new().unwrap();
    let (_s, _c, _section, quiz_id) = env.quiz_tree("MA7");
    let first = insert_question(&env.conn, quiz_id, &question("q1.json", Some("s1.pdf"))).unwrap();
    insert_question(&env.conn, quiz_id, &question("q2.json", None)).unwrap();

    let stored = get_question(&env.conn, first).unwrap().unwrap();
    assert_eq!(stored.option2, "2");
    assert_eq!(stored.answer, "2");
    assert_eq!(list_questions(&env.conn, quiz_id).unwrap().len(), 2);
    assert_eq!(question_files(&env.conn, quiz_id).unwrap(), vec!["q1.json", "s1.pdf", "q2.json"]);
  }

  #[test]
  fn test_delete_quiz_cascades_questions() {
    let env = TestEnv::new().unwrap();
    let (_s, _c, _section, quiz_id) = env.quiz_tree("MA7");
    let qid = insert_question(&env.conn, quiz_id, &question("q1.json", None)).unwrap();
    assert!(delete_quiz(&env.conn, quiz_id).unwrap());
    assert!(get_question(&env.conn, qid).unwrap().is_none());
  }
}
