pub mod api;
pub mod authorization;
pub mod config;
pub mod db;
pub mod models;
pub mod passwords;
pub mod tokens;
pub mod uploads;

use chrono::Utc;
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::models::{Role, User};

/// Initialize tracing with `RUST_LOG` override.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Seed an initial admin account into an empty database.
///
/// Registration is admin-only, so a fresh install needs one account to
/// exist before the API is usable. No-op when any user already exists.
pub fn ensure_bootstrap_admin(
    conn: &Connection,
    config: &config::Config,
) -> Result<Option<Uuid>, api::error::ApiError> {
    if db::repository::user::count_users(conn)? > 0 {
        return Ok(None);
    }

    let now = Utc::now();
    let admin = User {
        id: Uuid::new_v4(),
        name: "Administrator".into(),
        email: config.bootstrap_admin_email.clone(),
        password_hash: passwords::hash_password(&config.bootstrap_admin_password)?,
        role: Role::Admin,
        created_at: now,
        updated_at: now,
    };
    db::repository::user::insert_user(conn, &admin)?;

    tracing::warn!(
        email = %admin.email,
        "bootstrap admin created; change its password before going live"
    );
    Ok(Some(admin.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_seeds_exactly_once() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config::Config::with_data_dir(tmp.path());
        let conn = db::open_database(&config.db_path).unwrap();

        let first = ensure_bootstrap_admin(&conn, &config).unwrap();
        assert!(first.is_some());

        let second = ensure_bootstrap_admin(&conn, &config).unwrap();
        assert!(second.is_none(), "existing users suppress the bootstrap");

        let admin = db::repository::user::find_user_by_email(&conn, &config.bootstrap_admin_email)
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(passwords::verify_password(
            &config.bootstrap_admin_password,
            &admin.password_hash
        ));
    }
}
