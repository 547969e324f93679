//! Application configuration.
//!
//! Values are resolved with priority: config.toml > environment (.env) > defaults.

use serde::Deserialize;
use std::path::PathBuf;

use crate::paths;

// ==================== File Format ====================

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    server: Option<ServerSection>,
    database: Option<DatabaseSection>,
    uploads: Option<UploadsSection>,
    auth: Option<AuthSection>,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    addr: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct DatabaseSection {
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadsSection {
    dir: Option<String>,
    max_bytes: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct AuthSection {
    token_expiry_hours: Option<i64>,
    allow_admin_signup: Option<bool>,
}

// ==================== Defaults ====================

/// Server address to bind to
pub const SERVER_ADDR: &str = "0.0.0.0";

/// Server port
pub const SERVER_PORT: u16 = 5000;

/// Upper bound for a single request body (multipart uploads included)
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Bearer token lifetime in hours (1 week)
pub const TOKEN_EXPIRY_HOURS: i64 = 24 * 7;

/// Number of topics shown on the admin dashboard
pub const DASHBOARD_TOPIC_LIMIT: i64 = 10;

/// Marks a single quiz is worth
pub const QUIZ_MAX_MARKS: i64 = 10;

// ==================== Resolved Config ====================

/// Fully resolved runtime configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_addr: String,
    pub server_port: u16,
    pub database_path: PathBuf,
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub token_expiry_hours: i64,
    pub allow_admin_signup: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_addr: SERVER_ADDR.to_string(),
            server_port: SERVER_PORT,
            database_path: PathBuf::from(paths::db_path()),
            uploads_dir: PathBuf::from(paths::UPLOADS_DIR),
            max_upload_bytes: MAX_UPLOAD_BYTES,
            token_expiry_hours: TOKEN_EXPIRY_HOURS,
            allow_admin_signup: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from config.toml and the environment
    pub fn load() -> Self {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let file = match std::fs::read_to_string("config.toml") {
            Ok(contents) => match toml::from_str::<FileConfig>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config.toml");
                    config
                }
                Err(e) => {
                    tracing::warn!("Ignoring malformed config.toml: {}", e);
                    FileConfig::default()
                }
            },
            Err(_) => FileConfig::default(),
        };

        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merge file values, environment lookups and defaults
    fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        let server = file.server;
        if let Some(addr) = server.as_ref().and_then(|s| s.addr.clone()) {
            config.server_addr = addr;
        }
        match server.and_then(|s| s.port) {
            Some(port) => config.server_port = port,
            None => {
                if let Some(port) = env("PORT").and_then(|p| p.parse().ok()) {
                    config.server_port = port;
                }
            }
        }

        match file.database.and_then(|d| d.path) {
            Some(path) => {
                tracing::info!("Using database from config.toml: {}", path);
                config.database_path = PathBuf::from(path);
            }
            None => {
                if let Some(path) = env("DATABASE_PATH") {
                    tracing::info!("Using database from DATABASE_PATH env: {}", path);
                    config.database_path = PathBuf::from(path);
                }
            }
        }

        let uploads = file.uploads;
        match uploads.as_ref().and_then(|u| u.dir.clone()) {
            Some(dir) => config.uploads_dir = PathBuf::from(dir),
            None => {
                if let Some(dir) = env("UPLOADS_DIR") {
                    config.uploads_dir = PathBuf::from(dir);
                }
            }
        }
        if let Some(max) = uploads.and_then(|u| u.max_bytes) {
            config.max_upload_bytes = max;
        }

        if let Some(auth) = file.auth {
            if let Some(hours) = auth.token_expiry_hours {
                config.token_expiry_hours = hours;
            }
            if let Some(allow) = auth.allow_admin_signup {
                config.allow_admin_signup = allow;
            }
        }

        config
    }

    /// Get the full server bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_addr, self.server_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = AppConfig::resolve(FileConfig::default(), no_env);
        assert_eq!(config.server_port, SERVER_PORT);
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
        assert!(config.allow_admin_signup);
        assert_eq!(config.token_expiry_hours, TOKEN_EXPIRY_HOURS);
        assert!(config.database_path.ends_with("lms.db"));
    }

    #[test]
    fn test_env_used_when_file_silent() {
        let config = AppConfig::resolve(FileConfig::default(), |key| match key {
            "PORT" => Some("8080".to_string()),
            "DATABASE_PATH" => Some("/tmp/env.db".to_string()),
            "UPLOADS_DIR" => Some("/tmp/up".to_string()),
            _ => None,
        });
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.database_path, PathBuf::from("/tmp/env.db"));
        assert_eq!(config.uploads_dir, PathBuf::from("/tmp/up"));
    }

    #[test]
    fn test_file_wins_over_env() {
        let file: FileConfig = toml::from_str(
            r#"
            [server]
            port = 7000

            [database]
            path = "file.db"

            [auth]
            allow_admin_signup = false
            token_expiry_hours = 2
            "#,
        )
        .unwrap();
        let config = AppConfig::resolve(file, |key| match key {
            "PORT" => Some("8080".to_string()),
            "DATABASE_PATH" => Some("env.db".to_string()),
            _ => None,
        });
        assert_eq!(config.server_port, 7000);
        assert_eq!(config.database_path, PathBuf::from("file.db"));
        assert!(!config.allow_admin_signup);
        assert_eq!(config.token_expiry_hours, 2);
    }

    #[test]
    fn test_bad_port_env_falls_back_to_default() {
        let config = AppConfig::resolve(FileConfig::default(), |key| {
            (key == "PORT").then(|| "not-a-port".to_string())
        });
        assert_eq!(config.server_port, SERVER_PORT);
    }
}
