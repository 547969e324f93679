//! Bearer token sessions. Only the SHA-256 of a token is stored.

use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};

use super::users::row_to_user;
use crate::domain::User;

/// Create a new session
pub fn create_session(
    conn: &Connection,
    user_id: i64,
    token_hash: &str,
    duration_hours: i64,
) -> Result<()> {
    let now = Utc::now();
    let expires = now + Duration::hours(duration_hours);
    conn.execute(
        "INSERT INTO sessions (token_hash, user_id, created_at, expires_at, last_access_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            token_hash,
            user_id,
            now.to_rfc3339(),
            expires.to_rfc3339(),
            now.to_rfc3339()
        ],
    )?;
    Ok(())
}

/// Resolve an unexpired session to its user and touch its access time
pub fn get_session_user(conn: &Connection, token_hash: &str) -> Result<Option<User>> {
    let now = Utc::now().to_rfc3339();
    let user = conn
        .query_row(
            r#"
            SELECT u.id, u.role, u.name, u.email, u.phone, u.image, u.grade, u.student_id,
                   u.password_hash, u.created_at, u.updated_at
            FROM sessions s
            JOIN users u ON s.user_id = u.id
            WHERE s.token_hash = ?1 AND s.expires_at > ?2
            "#,
            params![token_hash, now],
            row_to_user,
        )
        .optional()?;

    if user.is_some() {
        conn.execute(
            "UPDATE sessions SET last_access_at = ?1 WHERE token_hash = ?2",
            params![now, token_hash],
        )?;
    }
    Ok(user)
}

/// Delete a session (logout)
pub fn delete_session(conn: &Connection, token_hash: &str) -> Result<bool> {
    let count = conn.execute("DELETE FROM sessions WHERE token_hash = ?1", params![token_hash])?;
    Ok(count > 0)
}

/// Cleanup expired sessions, returns count of deleted sessions
pub fn cleanup_expired_sessions(conn: &Connection) -> Result<usize> {
    let now = Utc::now().to_rfc3339();
    let count = conn.execute("DELETE FROM sessions WHERE expires_at < ?1", params![now])?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::testing::TestEnv;

    #[test]
    fn test_session_resolves_user() {
        let env = TestEnv::new().unwrap();
        let id = env.user(Role::Educator, "e@example.com");
        create_session(&env.conn, id, "abc", 1).unwrap();

        let user = get_session_user(&env.conn, "abc").unwrap().unwrap();
        assert_eq!(user.id, id);
        assert!(get_session_user(&env.conn, "other").unwrap().is_none());
    }

    #[test]
    fn test_expired_session_is_ignored_and_pruned() {
        let env = TestEnv::new().unwrap();
        let id = env.user(Role::Student, "s@example.com");
        create_session(&env.conn, id, "old", -1).unwrap();
        create_session(&env.conn, id, "new", 1).unwrap();

        assert!(get_session_user(&env.conn, "old").unwrap().is_none());
        assert_eq!(cleanup_expired_sessions(&env.conn).unwrap(), 1);
        assert!(get_session_user(&env.conn, "new").unwrap().is_some());
    }

    #[test]
    fn test_delete_session() {
        let env = TestEnv::new().unwrap();
        let id = env.user(Role::Parent, "p@example.com");
        create_session(&env.conn, id, "tok", 1).unwrap();
        assert!(delete_session(&env.conn, "tok").unwrap());
        assert!(!delete_session(&env.conn, "tok").unwrap());
    }
}
