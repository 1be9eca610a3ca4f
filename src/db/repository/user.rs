use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Role, User, UserSummary};

pub fn insert_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user.id.to_string(),
            user.name,
            user.email,
            user.password_hash,
            user.role.as_str(),
            user.created_at.to_rfc3339(),
            user.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn find_user_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<User>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, email, password_hash, role, created_at, updated_at
         FROM users WHERE email = ?1",
    )?;
    let mut rows = stmt.query_map(params![email], map_user_row)?;
    rows.next().transpose()?.map(user_from_row).transpose()
}

pub fn find_user_by_id(conn: &Connection, id: &Uuid) -> Result<Option<User>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, email, password_hash, role, created_at, updated_at
         FROM users WHERE id = ?1",
    )?;
    let mut rows = stmt.query_map(params![id.to_string()], map_user_row)?;
    rows.next().transpose()?.map(user_from_row).transpose()
}

/// All users except the given one, projected for the admin screen.
pub fn list_users_except(
    conn: &Connection,
    actor_id: &Uuid,
) -> Result<Vec<UserSummary>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, email, role FROM users WHERE id != ?1 ORDER BY name",
    )?;
    let rows = stmt.query_map(params![actor_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut users = Vec::new();
    for row in rows {
        let (id, name, email, role) = row?;
        users.push(UserSummary {
            id: parse_uuid(&id)?,
            name,
            email,
            role: Role::from_str(&role)?,
        });
    }
    Ok(users)
}

/// Hard delete. Returns false when no such user existed.
pub fn delete_user(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
    Ok(deleted > 0)
}

pub fn count_users(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    Ok(count)
}

type UserRow = (String, String, String, String, String, String, String);

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn user_from_row(row: UserRow) -> Result<User, DatabaseError> {
    let (id, name, email, password_hash, role, created_at, updated_at) = row;
    Ok(User {
        id: parse_uuid(&id)?,
        name,
        email,
        password_hash,
        role: Role::from_str(&role)?,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

pub(crate) fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    fn sample_user(email: &str, role: Role) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name: "Asha Rao".into(),
            email: email.into(),
            password_hash: "pbkdf2-sha256$stub".into(),
            role,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn insert_and_find_by_email() {
        let conn = open_memory_database().unwrap();
        let user = sample_user("asha@clinic.example", Role::Doctor);
        insert_user(&conn, &user).unwrap();

        let found = find_user_by_email(&conn, "asha@clinic.example")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.role, Role::Doctor);
        assert_eq!(found.password_hash, user.password_hash);
    }

    #[test]
    fn duplicate_email_is_unique_violation() {
        let conn = open_memory_database().unwrap();
        insert_user(&conn, &sample_user("dup@clinic.example", Role::Staff)).unwrap();
        let err = insert_user(&conn, &sample_user("dup@clinic.example", Role::Doctor))
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn list_excludes_actor_and_hides_hash() {
        let conn = open_memory_database().unwrap();
        let admin = sample_user("admin@clinic.example", Role::Admin);
        let other = sample_user("staff@clinic.example", Role::Staff);
        insert_user(&conn, &admin).unwrap();
        insert_user(&conn, &other).unwrap();

        let listed = list_users_except(&conn, &admin.id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, other.id);
    }

    #[test]
    fn delete_reports_missing_target() {
        let conn = open_memory_database().unwrap();
        assert!(!delete_user(&conn, &Uuid::new_v4()).unwrap());

        let user = sample_user("gone@clinic.example", Role::Staff);
        insert_user(&conn, &user).unwrap();
        assert!(delete_user(&conn, &user.id).unwrap());
        assert!(find_user_by_id(&conn, &user.id).unwrap().is_none());
    }
}
