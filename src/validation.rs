//! Input validation for account and catalogue forms.
//!
//! Every check returns a 422 with a short message naming the bad field.
//! Emails are normalized (trimmed, lowercased) before they are stored or
//! compared, so lookups are case-insensitive.

use crate::config::QUIZ_MAX_MARKS;
use crate::error::{AppError, AppResult};

pub const PASSWORD_MIN_LEN: usize = 4;
pub const PASSWORD_MAX_LEN: usize = 20;
pub const PHONE_MIN_LEN: usize = 8;
pub const PHONE_MAX_LEN: usize = 20;

// ============================================================================
// Field checks
// ============================================================================

/// Trim and lowercase an email, None if it is not a plausible address
pub fn normalize_email(raw: &str) -> Option<String> {
  let email = raw.trim().to_lowercase();
  let (local, domain) = email.split_once('@')?;
  if local.is_empty()
    || domain.contains('@')
    || email.chars().any(char::is_whitespace)
    || domain.starts_with('.')
    || domain.ends_with('.')
  {
    return None;
  }
  let labels_ok = domain.split('.').count() >= 2 && domain.split('.').all(|l| !l.is_empty());
  labels_ok.then_some(email)
}

pub fn is_valid_password(password: &str) -> bool {
  let len = password.chars().count();
  (PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len)
}

pub fn is_valid_phone(phone: &str) -> bool {
  (PHONE_MIN_LEN..=PHONE_MAX_LEN).contains(&phone.len()) && phone.chars().all(|c| c.is_ascii_digit())
}

/// Trimmed value, or a 422 with `message` when blank
pub fn required(value: Option<&str>, message: &str) -> AppResult<String> {
  match value.map(str::trim) {
    Some(v) if !v.is_empty() => Ok(v.to_string()),
    _ => Err(AppError::unprocessable(message)),
  }
}

pub fn validate_marks(marks: i64) -> AppResult<i64> {
  if (0..=QUIZ_MAX_MARKS).contains(&marks) {
    Ok(marks)
  } else {
    Err(AppError::unprocessable(format!(
      "invalid marks! expected 0 to {}",
      QUIZ_MAX_MARKS
    )))
  }
}

// ============================================================================
// Forms
// ============================================================================

/// Name, email, phone and password as submitted on signup or profile edit
#[derive(Debug, Clone, Default)]
pub struct ProfileFields {
  pub name: String,
  pub email: String,
  pub phone: String,
  pub password: String,
}

impl ProfileFields {
  /// Check every field and return the normalized form
  pub fn validate(self) -> AppResult<Self> {
    let name = required(Some(&self.name), "invalid name!")?;
    let email = normalize_email(&self.email).ok_or_else(|| AppError::unprocessable("invalid email!"))?;
    let phone = self.phone.trim().to_string();
    if !is_valid_phone(&phone) {
      return Err(AppError::unprocessable("invalid phone!"));
    }
    if !is_valid_password(&self.password) {
      return Err(AppError::unprocessable("invalid password!"));
    }
    Ok(Self {
      name,
      email,
      phone,
      password: self.password,
    })
  }
}

/// Login body check: a plausible email and a password of valid length
pub fn validate_login(email: &str, password: &str) -> AppResult<String> {
  let email = normalize_email(email).ok_or_else(|| AppError::unprocessable("Input data are not valid!"))?;
  if !is_valid_password(password) {
    return Err(AppError::unprocessable("Input data are not valid!"));
  }
  Ok(email)
}

/// Parse an id submitted as a text field
pub fn parse_id(value: Option<&str>, message: &str) -> AppResult<i64> {
  value
    .and_then(|v| v.trim().parse::<i64>().ok())
    .ok_or_else(|| AppError::unprocessable(message))
}
