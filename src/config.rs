use std::net::SocketAddr;

use anyhow::{anyhow, bail, Context};
use base64::{engine::general_purpose, Engine};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_SESSION_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 30;
const MIN_SESSION_SECRET_LEN: usize = 64;
const CLOUD_SQL_SOCKET_DIR: &str = "/cloudsql";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Sqlite,
    MySql,
}

impl DatabaseBackend {
    pub fn from_url(url: &str) -> anyhow::Result<Self> {
        if url.starts_with("sqlite:") {
            Ok(Self::Sqlite)
        } else if url.starts_with("mysql:") || url.starts_with("mariadb:") {
            Ok(Self::MySql)
        } else {
            Err(anyhow!("unsupported database url scheme (expected sqlite: or mysql:)"))
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub backend: DatabaseBackend,
    pub max_connections: u32,
}

#[derive(Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub bind_addr: SocketAddr,
    pub auth_required: bool,
    /// Decoded cookie key material; `None` means a random key per process.
    pub session_secret: Option<Vec<u8>>,
    pub session_max_age_secs: i64,
    pub insecure_cookie: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("backend", &self.database.backend)
            .field("max_connections", &self.database.max_connections)
            .field("bind_addr", &self.bind_addr)
            .field("auth_required", &self.auth_required)
            .field("session_secret", &self.session_secret.as_ref().map(|_| "<redacted>"))
            .field("session_max_age_secs", &self.session_max_age_secs)
            .field("insecure_cookie", &self.insecure_cookie)
            .finish()
    }
}

impl Config {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let url = match get("DATABASE_URL") {
            Some(url) => url,
            None => mysql_socket_url(
                &get("DB_USER").context("DB_USER is not set")?,
                &lookup("DB_PASS").unwrap_or_default(),
                &get("DB_NAME").context("DB_NAME is not set")?,
                &get("INSTANCE_UNIX_SOCKET").context("INSTANCE_UNIX_SOCKET is not set")?,
            ),
        };
        let backend = DatabaseBackend::from_url(&url)?;

        let max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("DB_MAX_CONNECTIONS is not a number: {v}"))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let port: u16 = match get("PORT") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port: {v}"))?,
            None => DEFAULT_PORT,
        };

        let session_secret = match get("SESSION_SECRET") {
            Some(v) => {
                let bytes = general_purpose::STANDARD
                    .decode(v.trim())
                    .context("SESSION_SECRET is not valid base64")?;
                if bytes.len() < MIN_SESSION_SECRET_LEN {
                    bail!(
                        "SESSION_SECRET must decode to at least {MIN_SESSION_SECRET_LEN} bytes (got {})",
                        bytes.len()
                    );
                }
                Some(bytes)
            }
            None => None,
        };

        let session_max_age_secs = match get("SESSION_MAX_AGE_SECS") {
            Some(v) => {
                let secs: i64 = v
                    .trim()
                    .parse()
                    .with_context(|| format!("SESSION_MAX_AGE_SECS is not a number: {v}"))?;
                if secs <= 0 {
                    bail!("SESSION_MAX_AGE_SECS must be positive");
                }
                secs
            }
            None => DEFAULT_SESSION_MAX_AGE_SECS,
        };

        Ok(Self {
            database: DatabaseConfig {
                url,
                backend,
                max_connections,
            },
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            auth_required: parse_flag(get("AUTH_REQUIRED"), true)?,
            session_secret,
            session_max_age_secs,
            insecure_cookie: parse_flag(get("INSECURE_COOKIE"), false)?,
        })
    }
}

fn parse_flag(value: Option<String>, default: bool) -> anyhow::Result<bool> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("invalid boolean value: {other}")),
    }
}

/// Cloud SQL style MySQL URL over a unix socket.
fn mysql_socket_url(user: &str, password: &str, database: &str, instance: &str) -> String {
    let socket = if instance.starts_with('/') {
        instance.to_string()
    } else {
        format!("{CLOUD_SQL_SOCKET_DIR}/{instance}")
    };

    format!(
        "mysql://{}:{}@localhost/{}?socket={}",
        urlencoding::encode(user),
        urlencoding::encode(password),
        urlencoding::encode(database),
        urlencoding::encode(&socket),
    )
}
