use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

const SECURE_COOKIES_ENV: &str = "CARDVAULT_SECURE_COOKIES";

#[derive(Debug, Parser)]
#[command(
    name = "cardvault",
    version,
    about = "Account signup, login and per-user card records over HTTP"
)]
pub struct Cli {
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<SocketAddr>,

    /// SQLite database file, created on first start.
    #[arg(long, value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// Append-only security audit log.
    #[arg(long, value_name = "FILE")]
    pub audit_log: Option<PathBuf>,

    /// Server-side session lifetime, e.g. `30m` or `24h`.
    #[arg(long, value_name = "DURATION")]
    pub session_ttl: Option<String>,

    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub database: PathBuf,
    pub audit_log: PathBuf,
    pub session_ttl: Duration,
    pub secure_cookies: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config in {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid boolean value for env var {key}: {value}")]
    InvalidEnvBool { key: String, value: String },
    #[error("invalid session ttl {value:?}: {reason}")]
    InvalidDuration { value: String, reason: String },
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    bind: Option<SocketAddr>,
    database: Option<PathBuf>,
    audit_log: Option<PathBuf>,
    session_ttl: Option<String>,
    secure_cookies: Option<bool>,
}

impl AppConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let from_file = read_file_config(cli.config.as_deref())?;

        let bind = cli
            .bind
            .or(from_file.bind)
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8880)));
        let database = cli
            .database
            .or(from_file.database)
            .unwrap_or_else(|| PathBuf::from("users.db"));
        let audit_log = cli
            .audit_log
            .or(from_file.audit_log)
            .unwrap_or_else(|| PathBuf::from("security.log"));
        let session_ttl = parse_session_ttl(
            cli.session_ttl
                .or(from_file.session_ttl)
                .as_deref()
                .unwrap_or("24h"),
        )?;
        let secure_cookies = match from_file.secure_cookies {
            Some(value) => value,
            None => env_flag(SECURE_COOKIES_ENV)?.unwrap_or(false),
        };

        Ok(Self {
            bind,
            database,
            audit_log,
            session_ttl,
            secure_cookies,
        })
    }
}

fn read_file_config(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };

    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn parse_session_ttl(raw: &str) -> Result<Duration, ConfigError> {
    let ttl = humantime::parse_duration(raw.trim()).map_err(|err| ConfigError::InvalidDuration {
        value: String::from(raw),
        reason: err.to_string(),
    })?;
    if ttl.is_zero() {
        return Err(ConfigError::InvalidDuration {
            value: String::from(raw),
            reason: String::from("must be greater than zero"),
        });
    }
    Ok(ttl)
}

/// Reads an on/off switch from the environment. Unset is `None`; anything
/// that is not a recognised flag value is an error.
fn env_flag(key: &str) -> Result<Option<bool>, ConfigError> {
    let invalid = |value: String| ConfigError::InvalidEnvBool {
        key: String::from(key),
        value,
    };
    match std::env::var(key) {
        Ok(raw) => parse_flag(&raw).map(Some).ok_or_else(|| invalid(raw)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(invalid(String::from("<non-unicode>"))),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
