//! CLI argument parsing, validation, and startup helpers.

use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use crate::ServerConfig;
use crate::jwt::ACCESS_TOKEN_DURATION_SECS;
use crate::renewal::RENEWAL_TOKEN_DURATION_SECS;
use crate::store::{MAX_TTL_SECS, SqliteStore};

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

/// Which revocation store backend to run with.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StoreKind {
    /// In-process maps; revocations are lost on restart
    Memory,
    /// SQLite database file
    #[default]
    Sqlite,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tollgate",
    about = "Bearer token authentication gate with transparent renewal"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "TOLLGATE_PORT", default_value = "7291")]
    pub port: u16,

    /// Revocation store backend
    #[arg(long, env = "TOLLGATE_STORE", value_enum, default_value = "sqlite")]
    pub store: StoreKind,

    /// Path to SQLite database file (sqlite store only)
    #[arg(short, long, env = "TOLLGATE_DATABASE", default_value = "tollgate.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, env = "TOLLGATE_ACCESS_TTL_SECS", default_value_t = ACCESS_TOKEN_DURATION_SECS,
        value_parser = clap::value_parser!(u64).range(1..=MAX_TTL_SECS))]
    pub access_ttl_secs: u64,

    /// Renewal credential lifetime in seconds
    #[arg(long, env = "TOLLGATE_RENEWAL_TTL_SECS", default_value_t = RENEWAL_TOKEN_DURATION_SECS,
        value_parser = clap::value_parser!(u64).range(1..=MAX_TTL_SECS))]
    pub renewal_ttl_secs: u64,

    /// Set the Secure flag on renewal cookies (use behind HTTPS)
    #[arg(long)]
    pub secure_cookies: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    validate_jwt_secret(secret)
}

fn validate_jwt_secret(secret: String) -> Option<String> {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, jwt_secret: String) -> ServerConfig {
    ServerConfig {
        jwt_secret: jwt_secret.into_bytes(),
        access_ttl: Duration::from_secs(args.access_ttl_secs),
        renewal_ttl: Duration::from_secs(args.renewal_ttl_secs),
        secure_cookies: args.secure_cookies,
    }
}

/// Open the SQLite store, logging errors if it fails.
pub async fn open_sqlite_store(path: &str) -> Option<SqliteStore> {
    match SqliteStore::open(path).await {
        Ok(store) => {
            info!(path = %path, "Revocation store opened");
            Some(store)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open revocation store");
            None
        }
    }
}
