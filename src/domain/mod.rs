pub mod account;
pub mod assessment;
pub mod catalog;

pub use account::{AccountRequest, Approval, NewUser, Role, User};
pub use assessment::{Answer, NamedQuizRecord, Question, QuestionView, Quiz, QuizDetail, QuizRecord, SingleAnswer};
pub use catalog::{
  Chapter, ChapterSummary, Comment, DashboardTopic, Favorite, FavoriteTopic, QuizAvailability,
  Section, SectionSummary, Subject, Topic, TopicDetail,
};
