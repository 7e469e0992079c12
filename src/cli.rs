//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use crate::jwt::TokenSettings;
use clap::Parser;
use std::num::NonZeroU32;
use tracing::{error, info};

const MIN_TOKEN_SECRET_LENGTH: usize = 32;

/// Longest accepted token lifetime: ten years.
pub const MAX_EXPIRY_SECS: u64 = 10 * 365 * 24 * 60 * 60;

const ACCESS_SECRET_ENV: &str = "ACCESS_TOKEN_SECRET";
const REFRESH_SECRET_ENV: &str = "REFRESH_TOKEN_SECRET";

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "vidtube-auth",
    about = "User accounts and JWT sessions for a video sharing backend"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "vidtube.db")]
    pub database: String,

    /// Access token lifetime, e.g. "15m", "1d" or plain seconds
    #[arg(long, env = "ACCESS_TOKEN_EXPIRY", default_value = "1d", value_parser = parse_expiry)]
    pub access_token_expiry: u64,

    /// Refresh token lifetime, e.g. "10d" or plain seconds
    #[arg(long, env = "REFRESH_TOKEN_EXPIRY", default_value = "10d", value_parser = parse_expiry)]
    pub refresh_token_expiry: u64,

    /// Path to file containing the access token secret. Prefer ACCESS_TOKEN_SECRET env var instead
    #[arg(long)]
    pub access_token_secret_file: Option<String>,

    /// Path to file containing the refresh token secret. Prefer REFRESH_TOKEN_SECRET env var instead
    #[arg(long)]
    pub refresh_token_secret_file: Option<String>,

    /// Send cookies without the Secure flag (local development over plain HTTP)
    #[arg(long)]
    pub insecure_cookies: bool,

    /// Read the client IP from X-Forwarded-For (only behind a trusted proxy)
    #[arg(long)]
    pub trust_forwarded_for: bool,

    /// Login attempts per client IP per minute, 0 disables the limit
    #[arg(long, env = "LOGIN_RATE_LIMIT", default_value = "10")]
    pub login_rate_limit: u32,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Parse a token lifetime: `<n>s`, `<n>m`, `<n>h`, `<n>d` or bare seconds.
pub fn parse_expiry(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let (digits, multiplier) = match s.chars().last() {
        Some('s') => (&s[..s.len() - 1], 1),
        Some('m') => (&s[..s.len() - 1], 60),
        Some('h') => (&s[..s.len() - 1], 60 * 60),
        Some('d') => (&s[..s.len() - 1], 24 * 60 * 60),
        Some(c) if c.is_ascii_digit() => (s, 1),
        _ => return Err(format!("Invalid expiry: {:?}", s)),
    };

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("Invalid expiry: {:?}", s))?;

    match value.checked_mul(multiplier) {
        Some(0) => Err("Expiry must be greater than zero".to_string()),
        Some(secs) if secs <= MAX_EXPIRY_SECS => Ok(secs),
        _ => Err(format!("Expiry is too large: {:?}", s)),
    }
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load one secret from its environment variable or file.
fn load_secret(env_name: &str, file: Option<&str>, flag: &str) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var(env_name) {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(env_name) };
        secret
    } else if let Some(path) = file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read token secret file");
                return None;
            }
        }
    } else {
        error!(
            "{} is required. Set the environment variable (recommended) or use {}",
            env_name, flag
        );
        return None;
    };

    if secret.len() < MIN_TOKEN_SECRET_LENGTH {
        error!(
            "{} is shorter than {} characters. Use a longer secret",
            env_name, MIN_TOKEN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Load the access and refresh token secrets.
/// Returns None and logs an error if either is missing, too short, or both are equal.
pub fn load_token_secrets(
    access_file: Option<&str>,
    refresh_file: Option<&str>,
) -> Option<(String, String)> {
    let access = load_secret(ACCESS_SECRET_ENV, access_file, "--access-token-secret-file")?;
    let refresh = load_secret(REFRESH_SECRET_ENV, refresh_file, "--refresh-token-secret-file")?;

    if access == refresh {
        error!("Access and refresh token secrets must differ");
        return None;
    }

    Some((access, refresh))
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    db: Database,
    access_secret: String,
    refresh_secret: String,
) -> ServerConfig {
    ServerConfig {
        db,
        access_token: TokenSettings::new(access_secret, args.access_token_expiry),
        refresh_token: TokenSettings::new(refresh_secret, args.refresh_token_expiry),
        secure_cookies: !args.insecure_cookies,
        login_rate_limit: NonZeroU32::new(args.login_rate_limit),
        trust_forwarded_for: args.trust_forwarded_for,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
