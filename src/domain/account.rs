use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four kinds of account the platform knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  Educator,
  Student,
  Parent,
}

impl Role {
  pub const ALL: [Role; 4] = [Role::Admin, Role::Educator, Role::Student, Role::Parent];

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "admin" => Some(Self::Admin),
      "educator" => Some(Self::Educator),
      "student" => Some(Self::Student),
      "parent" => Some(Self::Parent),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Admin => "admin",
      Self::Educator => "educator",
      Self::Student => "student",
      Self::Parent => "parent",
    }
  }

  /// Non-admin accounts wait for an admin decision before they can be used
  pub fn needs_approval(&self) -> bool {
    !matches!(self, Self::Admin)
  }

  /// Key under which the admin request listing is returned
  pub fn request_list_key(&self) -> &'static str {
    match self {
      Self::Admin => "adminAccReq",
      Self::Educator => "eduAccReq",
      Self::Student => "stuAccReq",
      Self::Parent => "parentAccReq",
    }
  }
}

impl std::fmt::Display for Role {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// State of an account request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Approval {
  Pending,
  Approved,
  Declined,
}

impl Approval {
  /// Unknown or missing values read as pending
  pub fn from_str(s: &str) -> Self {
    match s {
      "approved" => Self::Approved,
      "declined" => Self::Declined,
      _ => Self::Pending,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Approved => "approved",
      Self::Declined => "declined",
    }
  }

  /// Admin decision: only the literal action "approved" approves
  pub fn from_action(action: &str) -> Self {
    if action == "approved" {
      Self::Approved
    } else {
      Self::Declined
    }
  }
}

/// A registered account. The password hash is never serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: i64,
  pub role: Role,
  pub name: String,
  pub email: String,
  pub phone: String,
  pub image: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub grade: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub student_id: Option<i64>,
  #[serde(skip)]
  pub password_hash: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Fields needed to create an account
#[derive(Debug, Clone)]
pub struct NewUser {
  pub role: Role,
  pub name: String,
  pub email: String,
  pub phone: String,
  pub password_hash: String,
  pub image: String,
  pub grade: Option<String>,
  pub student_id: Option<i64>,
}

/// Pending approval record created at signup
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRequest {
  pub id: i64,
  pub user_id: i64,
  pub role: Role,
  pub name: String,
  pub email: String,
  pub phone: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub student_id: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub student_name: Option<String>,
  pub approval: Approval,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_role_round_trip_names() {
    for role in Role::ALL {
      assert_eq!(Role::from_str(role.as_str()), Some(role));
    }
    assert_eq!(Role::from_str("teacher"), None);
  }

  #[test]
  fn test_only_admin_skips_approval() {
    assert!(!Role::Admin.needs_approval());
    assert!(Role::Educator.needs_approval());
    assert!(Role::Student.needs_approval());
    assert!(Role::Parent.needs_approval());
  }

  #[test]
  fn test_approval_from_action() {
    assert_eq!(Approval::from_action("approved"), Approval::Approved);
    assert_eq!(Approval::from_action("declined"), Approval::Declined);
    // anything that is not an explicit approval declines
    assert_eq!(Approval::from_action("maybe"), Approval::Declined);
  }

  #[test]
  fn test_unknown_approval_reads_pending() {
    assert_eq!(Approval::from_str(""), Approval::Pending);
    assert_eq!(Approval::from_str("pending"), Approval::Pending);
  }

  #[test]
  fn test_user_serialization_hides_password() {
    let now = Utc::now();
    let user = User {
      id: 1,
      role: Role::Student,
      name: "Ann".into(),
      email: "ann@example.com".into(),
      phone: "12345678".into(),
      image: String::new(),
      grade: Some("7".into()),
      student_id: None,
      password_hash: "secret-hash".into(),
      created_at: now,
      updated_at: now,
    };
    let json = serde_json::to_value(&user).unwrap();
    assert!(json.get("passwordHash").is_none());
    assert!(json.get("studentId").is_none());
    assert_eq!(json["role"], "student");
    assert_eq!(json["grade"], "7");
  }
}
