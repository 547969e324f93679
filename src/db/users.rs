//! Account rows for all four roles

use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use super::{now, parse_timestamp};
use crate::domain::{NewUser, Role, User};

const USER_COLUMNS: &str =
    "id, role, name, email, phone, image, grade, student_id, password_hash, created_at, updated_at";

pub fn insert_user(conn: &Connection, user: &NewUser) -> Result<i64> {
    let now = now();
    conn.execute(
        r#"
        INSERT INTO users (role, name, email, phone, password_hash, image, grade, student_id, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
        "#,
        params![
            user.role.as_str(),
            user.name,
            user.email,
            user.phone,
            user.password_hash,
            user.image,
            user.grade,
            user.student_id,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_user(conn: &Connection, user_id: i64) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![user_id],
        row_to_user,
    )
    .optional()
}

/// Look a user up by id, only if they hold `role`
pub fn get_user_with_role(conn: &Connection, user_id: i64, role: Role) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1 AND role = ?2"),
        params![user_id, role.as_str()],
        row_to_user,
    )
    .optional()
}

pub fn find_by_email(conn: &Connection, role: Role, email: &str) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE role = ?1 AND email = ?2"),
        params![role.as_str(), email],
        row_to_user,
    )
    .optional()
}

pub fn email_taken(conn: &Connection, role: Role, email: &str, except_id: Option<i64>) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE role = ?1 AND email = ?2 AND id != ?3",
        params![role.as_str(), email, except_id.unwrap_or(0)],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Profile fields a user may change about themselves
pub struct ProfileUpdate<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub password_hash: &'a str,
    pub image: Option<&'a str>,
}

pub fn update_profile(conn: &Connection, user_id: i64, update: &ProfileUpdate<'_>) -> Result<bool> {
    let changed = conn.execute(
        r#"
        UPDATE users
        SET name = ?1, email = ?2, phone = ?3, password_hash = ?4,
            image = COALESCE(?5, image), updated_at = ?6
        WHERE id = ?7
        "#,
        params![
            update.name,
            update.email,
            update.phone,
            update.password_hash,
            update.image,
            now(),
            user_id,
        ],
    )?;
    Ok(changed > 0)
}

/// Students enrolled in a subject, ordered by name
pub fn students_in_subject(conn: &Connection, subject_id: i64) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT u.id, u.role, u.name, u.email, u.phone, u.image, u.grade, u.student_id,
               u.password_hash, u.created_at, u.updated_at
        FROM student_subjects ss
        JOIN users u ON u.id = ss.student_id
        WHERE ss.subject_id = ?1
        ORDER BY u.name
        "#,
    )?;
    let users = stmt
        .query_map(params![subject_id], row_to_user)?
        .collect::<Result<Vec<_>>>()?;
    Ok(users)
}

/// Educator registered for a subject, if any
pub fn educator_of_subject(conn: &Connection, subject_id: i64) -> Result<Option<User>> {
    conn.query_row(
        r#"
        SELECT u.id, u.role, u.name, u.email, u.phone, u.image, u.grade, u.student_id,
               u.password_hash, u.created_at, u.updated_at
        FROM educator_subjects es
        JOIN users u ON u.id = es.educator_id
        WHERE es.subject_id = ?1
        "#,
        params![subject_id],
        row_to_user,
    )
    .optional()
}

pub(crate) fn row_to_user(row: &Row) -> Result<User> {
    let role_str: String = row.get(1)?;
    let role = Role::from_str(&role_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown role '{}'", role_str).into(),
        )
    })?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;

    Ok(User {
        id: row.get(0)?,
        role,
        name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        image: row.get(5)?,
        grade: row.get(6)?,
        student_id: row.get(7)?,
        password_hash: row.get(8)?,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestEnv;

    #[test]
    fn test_insert_and_find_by_email() {
        let env = TestEnv::new().unwrap();
        let id = env.user(Role::Student, "ann@example.com");

        let found = find_by_email(&env.conn, Role::Student, "ann@example.com")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.grade.as_deref(), Some("7"));

        // same email under another role is a different account
        assert!(find_by_email(&env.conn, Role::Parent, "ann@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_within_role_rejected() {
        let env = TestEnv::new().unwrap();
        env.user(Role::Educator, "ed@example.com");
        let dup = NewUser {
            role: Role::Educator,
            name: "Other".into(),
            email: "ed@example.com".into(),
            phone: "87654321".into(),
            password_hash: "h".into(),
            image: String::new(),
            grade: None,
            student_id: None,
        };
        assert!(insert_user(&env.conn, &dup).is_err());
        assert!(email_taken(&env.conn, Role::Educator, "ed@example.com", None).unwrap());
    }

    #[test]
    fn test_email_taken_ignores_self() {
        let env = TestEnv::new().unwrap();
        let id = env.user(Role::Parent, "p@example.com");
        assert!(!email_taken(&env.conn, Role::Parent, "p@example.com", Some(id)).unwrap());
    }

    #[test]
    fn test_get_user_with_role() {
        let env = TestEnv::new().unwrap();
        let id = env.user(Role::Student, "s@example.com");
        assert!(get_user_with_role(&env.conn, id, Role::Student).unwrap().is_some());
        assert!(get_user_with_role(&env.conn, id, Role::Educator).unwrap().is_none());
    }

    #[test]
    fn test_update_profile_keeps_image_when_absent() {
        let env = TestEnv::new().unwrap();
        let id = env.user(Role::Educator, "e@example.com");
        env.conn
            .execute("UPDATE users SET image = 'uploads/images/a.png' WHERE id = ?1", [id])
            .unwrap();

        let update = ProfileUpdate {
            name: "Renamed",
            email: "e@example.com",
            phone: "11112222",
            password_hash: "h2",
            image: None,
        };
        assert!(update_profile(&env.conn, id, &update).unwrap());

        let user = get_user(&env.conn, id).unwrap().unwrap();
        assert_eq!(user.name, "Renamed");
        assert_eq!(user.image, "uploads/images/a.png");
        assert_eq!(user.password_hash, "h2");
    }
}
