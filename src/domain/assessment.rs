use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
  pub id: i64,
  pub section_id: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Question row; `question` and `solution` are stored upload paths
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub id: i64,
  pub quiz_id: i64,
  pub question: String,
  pub solution: Option<String>,
  pub option1: String,
  pub option2: String,
  pub option3: String,
  pub option4: String,
  pub answer: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Question with its JSON question document parsed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
  pub id: i64,
  pub quiz_id: i64,
  pub question: Option<Value>,
  pub solution: Option<String>,
  pub option1: String,
  pub option2: String,
  pub option3: String,
  pub option4: String,
  pub answer: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl QuestionView {
  pub fn new(q: Question, parsed: Option<Value>) -> Self {
    Self {
      id: q.id,
      quiz_id: q.quiz_id,
      question: parsed,
      solution: q.solution,
      option1: q.option1,
      option2: q.option2,
      option3: q.option3,
      option4: q.option4,
      answer: q.answer,
      created_at: q.created_at,
      updated_at: q.updated_at,
    }
  }
}

/// A quiz with its questions, as shown to educators and students
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDetail {
  #[serde(flatten)]
  pub quiz: Quiz,
  pub questions: Vec<QuestionView>,
}

/// Master answer sheet of one student for one quiz
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
  pub id: i64,
  pub student_id: i64,
  pub quiz_id: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// One answered question on an answer sheet
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleAnswer {
  pub id: i64,
  pub answer_id: i64,
  pub position: i64,
  pub answer: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRecord {
  pub id: i64,
  pub student_id: i64,
  pub quiz_id: i64,
  pub subject_id: i64,
  pub chapter_id: i64,
  pub section_id: i64,
  pub marks: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Quiz record with chapter and section resolved to names
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedQuizRecord {
  pub id: i64,
  pub student_id: i64,
  pub quiz_id: i64,
  pub subject_id: i64,
  pub chapter: String,
  pub section: String,
  pub marks: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
