//! Durable refresh-token store.
//!
//! Each issued refresh token is recorded by its jti claim with an explicit
//! expiry, so validity survives process restarts and logout/user-deletion
//! revoke real state instead of filtering an in-memory list.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;

pub fn store_refresh_token(
    conn: &Connection,
    jti: &Uuid,
    user_id: &Uuid,
    expires_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO refresh_tokens (jti, user_id, expires_at, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            jti.to_string(),
            user_id.to_string(),
            expires_at.to_rfc3339(),
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// True when the jti is present and not yet expired.
pub fn refresh_token_is_active(conn: &Connection, jti: &Uuid) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM refresh_tokens WHERE jti = ?1 AND expires_at > ?2",
        params![jti.to_string(), Utc::now().to_rfc3339()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Revoke by jti. Idempotent: missing rows are not an error.
pub fn revoke_refresh_token(conn: &Connection, jti: &Uuid) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM refresh_tokens WHERE jti = ?1",
        params![jti.to_string()],
    )?;
    Ok(())
}

/// Drop expired rows. Called opportunistically at login.
pub fn prune_expired_tokens(conn: &Connection) -> Result<usize, DatabaseError> {
    let pruned = conn.execute(
        "DELETE FROM refresh_tokens WHERE expires_at <= ?1",
        params![Utc::now().to_rfc3339()],
    )?;
    Ok(pruned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::repository::user::insert_user;
    use crate::models::{Role, User};
    use chrono::Duration;

    fn seeded_user(conn: &Connection) -> Uuid {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: "T".into(),
            email: format!("{}@clinic.example", Uuid::new_v4()),
            password_hash: "h".into(),
            role: Role::Doctor,
            created_at: now,
            updated_at: now,
        };
        insert_user(conn, &user).unwrap();
        user.id
    }

    #[test]
    fn stored_token_is_active_until_revoked() {
        let conn = open_memory_database().unwrap();
        let user_id = seeded_user(&conn);
        let jti = Uuid::new_v4();

        store_refresh_token(&conn, &jti, &user_id, Utc::now() + Duration::days(14)).unwrap();
        assert!(refresh_token_is_active(&conn, &jti).unwrap());

        revoke_refresh_token(&conn, &jti).unwrap();
        assert!(!refresh_token_is_active(&conn, &jti).unwrap());
    }

    #[test]
    fn expired_token_is_inactive_and_prunable() {
        let conn = open_memory_database().unwrap();
        let user_id = seeded_user(&conn);
        let jti = Uuid::new_v4();

        store_refresh_token(&conn, &jti, &user_id, Utc::now() - Duration::minutes(1)).unwrap();
        assert!(!refresh_token_is_active(&conn, &jti).unwrap());
        assert_eq!(prune_expired_tokens(&conn).unwrap(), 1);
    }

    #[test]
    fn deleting_user_revokes_their_tokens() {
        let conn = open_memory_database().unwrap();
        let user_id = seeded_user(&conn);
        let jti = Uuid::new_v4();
        store_refresh_token(&conn, &jti, &user_id, Utc::now() + Duration::days(1)).unwrap();

        crate::db::repository::user::delete_user(&conn, &user_id).unwrap();
        assert!(!refresh_token_is_active(&conn, &jti).unwrap());
    }

    #[test]
    fn revoke_is_idempotent() {
        let conn = open_memory_database().unwrap();
        revoke_refresh_token(&conn, &Uuid::new_v4()).unwrap();
    }
}
