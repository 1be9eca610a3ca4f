//! Shared types for the API layer.

use std::sync::Arc;

use rusqlite::Connection;
use uuid::Uuid;

use crate::config::Config;
use crate::db::{open_connection, DatabaseError};
use crate::models::Role;

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub config: Arc<Config>,
}

impl ApiContext {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Open a connection for the current request. Migrations ran at startup;
    /// this only applies pragmas.
    pub fn open_db(&self) -> Result<Connection, DatabaseError> {
        open_connection(&self.config.db_path)
    }
}

/// Authenticated actor, injected into request extensions by the auth
/// middleware after token verification.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub user_id: Uuid,
    pub role: Role,
}
