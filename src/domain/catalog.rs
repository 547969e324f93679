use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
  pub id: i64,
  pub name: String,
  pub code: String,
  pub grade: String,
  pub description: String,
  /// Name of the registered educator, if any
  pub educator: Option<String>,
  pub enrollment: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
  pub id: i64,
  pub subject_id: i64,
  pub name: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Chapter with counts of what hangs below it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterSummary {
  #[serde(flatten)]
  pub chapter: Chapter,
  pub total_sections: i64,
  pub total_topics: i64,
  pub total_quizzes: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
  pub id: i64,
  pub chapter_id: i64,
  pub name: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QuizAvailability {
  Available,
  Unavailable,
}

impl QuizAvailability {
  pub fn from_bool(has_quiz: bool) -> Self {
    if has_quiz { Self::Available } else { Self::Unavailable }
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSummary {
  #[serde(flatten)]
  pub section: Section,
  pub total_topics: i64,
  pub quiz: QuizAvailability,
}

/// Topic row; `lecture_note` and `content` are stored upload paths
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
  pub id: i64,
  pub section_id: i64,
  pub title: String,
  pub description: Option<String>,
  pub lecture_note: Option<String>,
  pub content: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Topic with its content file parsed into JSON
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDetail {
  pub id: i64,
  pub section_id: i64,
  pub title: String,
  pub description: Option<String>,
  pub lecture_note: Option<String>,
  pub content: Option<Value>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl TopicDetail {
  pub fn new(topic: Topic, content: Option<Value>) -> Self {
    Self {
      id: topic.id,
      section_id: topic.section_id,
      title: topic.title,
      description: topic.description,
      lecture_note: topic.lecture_note,
      content,
      created_at: topic.created_at,
      updated_at: topic.updated_at,
    }
  }
}

/// Admin dashboard row: a recent topic and where it lives
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTopic {
  #[serde(flatten)]
  pub topic: Topic,
  pub subject: String,
  pub grade: String,
  pub educator: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
  pub id: i64,
  pub section_id: i64,
  pub comment_text: String,
  pub user_name: String,
  pub user_id: i64,
  pub user_role: String,
  /// Author's profile picture, empty if the author is gone
  pub user_image: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
  pub student_id: i64,
  pub topic_id: i64,
  pub created_at: DateTime<Utc>,
}

/// Favorite topic with the names needed to render it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteTopic {
  pub topic_id: i64,
  pub topic_title: String,
  pub section_name: String,
  pub chapter_name: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_section_summary_flattens() {
    let now = Utc::now();
    let summary = SectionSummary {
      section: Section { id: 3, chapter_id: 2, name: "Intro".into(), created_at: now, updated_at: now },
      total_topics: 4,
      quiz: QuizAvailability::from_bool(true),
    };
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["id"], 3);
    assert_eq!(json["chapterId"], 2);
    assert_eq!(json["totalTopics"], 4);
    assert_eq!(json["quiz"], "Available");
  }

  #[test]
  fn test_quiz_availability() {
    assert_eq!(QuizAvailability::from_bool(false), QuizAvailability::Unavailable);
  }
}
