//! Account approval requests, one per non-admin user

use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use super::{now, parse_timestamp};
use crate::domain::{AccountRequest, Approval, Role, User};

const REQUEST_COLUMNS: &str = "id, user_id, role, name, email, phone, student_id, student_name, approval, created_at, updated_at";

/// Open a pending request for a freshly signed-up user
pub fn insert_request(conn: &Connection, user: &User, student_name: Option<&str>) -> Result<i64> {
    let now = now();
    conn.execute(
        r#"
        INSERT INTO account_requests (user_id, role, name, email, phone, student_id, student_name, approval, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
        "#,
        params![
            user.id,
            user.role.as_str(),
            user.name,
            user.email,
            user.phone,
            user.student_id,
            student_name,
            Approval::Pending.as_str(),
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_requests(conn: &Connection, role: Role) -> Result<Vec<AccountRequest>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REQUEST_COLUMNS} FROM account_requests WHERE role = ?1 ORDER BY created_at DESC, id DESC"
    ))?;
    let requests = stmt
        .query_map(params![role.as_str()], row_to_request)?
        .collect::<Result<Vec<_>>>()?;
    Ok(requests)
}

pub fn get_request_for_user(conn: &Connection, user_id: i64) -> Result<Option<AccountRequest>> {
    conn.query_row(
        &format!("SELECT {REQUEST_COLUMNS} FROM account_requests WHERE user_id = ?1"),
        params![user_id],
        row_to_request,
    )
    .optional()
}

/// Record an admin decision; returns the updated request if it exists for that role
pub fn set_approval(
    conn: &Connection,
    role: Role,
    user_id: i64,
    approval: Approval,
) -> Result<Option<AccountRequest>> {
    let changed = conn.execute(
        "UPDATE account_requests SET approval = ?1, updated_at = ?2 WHERE user_id = ?3 AND role = ?4",
        params![approval.as_str(), now(), user_id, role.as_str()],
    )?;
    if changed == 0 {
        return Ok(None);
    }
    get_request_for_user(conn, user_id)
}

/// Keep the request's contact details in line with the user's profile
pub fn sync_contact_details(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "UPDATE account_requests SET name = ?1, email = ?2, phone = ?3, updated_at = ?4 WHERE user_id = ?5",
        params![user.name, user.email, user.phone, now(), user.id],
    )?;
    Ok(())
}

fn row_to_request(row: &Row) -> Result<AccountRequest> {
    let role_str: String = row.get(2)?;
    let approval_str: String = row.get(8)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;

    Ok(AccountRequest {
        id: row.get(0)?,
        user_id: row.get(1)?,
        role: Role::from_str(&role_str).unwrap_or(Role::Student),
        name: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        student_id: row.get(6)?,
        student_name: row.get(7)?,
        approval: Approval::from_str(&approval_str),
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::users::get_user;
    use crate::testing::TestEnv;

    #[test]
    fn test_new_request_is_pending() {
        let env = TestEnv::new().unwrap();
        let id = env.user(Role::Educator, "e@example.com");
        let user = get_user(&env.conn, id).unwrap().unwrap();
        insert_request(&env.conn, &user, None).unwrap();

        let req = get_request_for_user(&env.conn, id).unwrap().unwrap();
        assert_eq!(req.approval, Approval::Pending);
        assert_eq!(req.role, Role::Educator);
        assert_eq!(list_requests(&env.conn, Role::Educator).unwrap().len(), 1);
        assert!(list_requests(&env.conn, Role::Student).unwrap().is_empty());
    }

    #[test]
    fn test_set_approval_checks_role() {
        let env = TestEnv::new().unwrap();
        let id = env.user(Role::Student, "s@example.com");
        let user = get_user(&env.conn, id).unwrap().unwrap();
        insert_request(&env.conn, &user, None).unwrap();

        assert!(set_approval(&env.conn, Role::Parent, id, Approval::Approved).unwrap().is_none());
        let req = set_approval(&env.conn, Role::Student, id, Approval::Approved)
            .unwrap()
            .unwrap();
        assert_eq!(req.approval, Approval::Approved);
    }

    #[test]
    fn test_request_deleted_with_user() {
        let env = TestEnv::new().unwrap();
        let id = env.user(Role::Parent, "p@example.com");
        let user = get_user(&env.conn, id).unwrap().unwrap();
        insert_request(&env.conn, &user, Some("Kid")).unwrap();

        env.conn.execute("DELETE FROM users WHERE id = ?1", [id]).unwrap();
        assert!(get_request_for_user(&env.conn, id).unwrap().is_none());
    }
}
