use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Netra";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Access tokens expire after 30 minutes.
pub const ACCESS_TOKEN_TTL_MINUTES: i64 = 30;
/// Refresh tokens expire after 14 days.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 14;

pub fn default_log_filter() -> String {
    format!("{}=info,tower_http=info", env!("CARGO_PKG_NAME"))
}

/// Get the application data directory
/// ~/Netra/ on all platforms (user-visible, field laptops included)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Netra")
}

/// Runtime configuration, resolved once at startup.
///
/// Every knob has an environment override (`NETRA_*`) so deployments don't
/// need a config file; defaults keep a dev checkout runnable out of the box.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    pub uploads_dir: PathBuf,
    /// HS256 key for access tokens.
    pub access_secret: String,
    /// HS256 key for refresh tokens. Distinct from the access key so a
    /// leaked refresh token can never pass as an access token.
    pub refresh_secret: String,
    /// Credentials for the bootstrap admin seeded into an empty database.
    pub bootstrap_admin_email: String,
    pub bootstrap_admin_password: String,
}

impl Config {
    pub fn from_env() -> Self {
        let data_dir = std::env::var("NETRA_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| app_data_dir());

        let bind_addr = std::env::var("NETRA_BIND_ADDR")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)));

        Self {
            bind_addr,
            db_path: data_dir.join("netra.db"),
            uploads_dir: data_dir.join("uploads"),
            access_secret: std::env::var("NETRA_JWT_SECRET")
                .unwrap_or_else(|_| "netra-dev-access-secret".into()),
            refresh_secret: std::env::var("NETRA_REFRESH_SECRET")
                .unwrap_or_else(|_| "netra-dev-refresh-secret".into()),
            bootstrap_admin_email: std::env::var("NETRA_ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@netra.local".into()),
            bootstrap_admin_password: std::env::var("NETRA_ADMIN_PASSWORD")
                .unwrap_or_else(|_| "changeme".into()),
        }
    }

    /// Config rooted in an explicit directory (tests use a tempdir).
    pub fn with_data_dir(dir: &std::path::Path) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            db_path: dir.join("netra.db"),
            uploads_dir: dir.join("uploads"),
            access_secret: "test-access-secret".into(),
            refresh_secret: "test-refresh-secret".into(),
            bootstrap_admin_email: "admin@netra.local".into(),
            bootstrap_admin_password: "changeme".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("Netra"));
    }

    #[test]
    fn with_data_dir_places_db_and_uploads_inside() {
        let config = Config::with_data_dir(std::path::Path::new("/tmp/x"));
        assert!(config.db_path.starts_with("/tmp/x"));
        assert!(config.uploads_dir.starts_with("/tmp/x"));
    }

    #[test]
    fn secrets_differ_between_token_kinds() {
        let config = Config::with_data_dir(std::path::Path::new("/tmp/x"));
        assert_ne!(config.access_secret, config.refresh_secret);
    }

    #[test]
    fn default_config_binds_the_service_port() {
        std::env::remove_var("NETRA_BIND_ADDR");
        let config = Config::from_env();
        assert_eq!(config.bind_addr.port(), 8080);
    }
}
