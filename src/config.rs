use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use anyhow::Context;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Email confirmation settings. Without a mail transport the link is only
/// logged, and `auto_confirm` stands in for the user clicking it.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub base_url: String,
    pub confirmation_ttl_hours: i64,
    pub auto_confirm: bool,
    pub auto_confirm_delay_secs: u64,
}

#[derive(Debug, Clone)]
pub enum StorageConfig {
    Local {
        dir: PathBuf,
    },
    S3 {
        endpoint: String,
        bucket: String,
        access_key: String,
        secret_key: String,
        region: String,
        public_url: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub jwt: JwtConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "open-elabel".into()),
            audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| "open-elabel-users".into()),
            ttl_minutes: parse_or("JWT_TTL_MINUTES", 60 * 24 * 7)?,
            refresh_ttl_minutes: parse_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14)?,
        };
        let auth = AuthConfig {
            base_url: env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into()),
            confirmation_ttl_hours: parse_or("EMAIL_CONFIRMATION_TTL_HOURS", 24)?,
            auto_confirm: parse_or("AUTH_AUTO_CONFIRM", true)?,
            auto_confirm_delay_secs: parse_or("AUTH_AUTO_CONFIRM_DELAY_SECS", 2)?,
        };

        Ok(Self {
            database_url,
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
            jwt,
            auth,
            storage: storage_from_env()?,
        })
    }
}

fn storage_from_env() -> anyhow::Result<StorageConfig> {
    let backend = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".into());
    match backend.to_ascii_lowercase().as_str() {
        "local" => Ok(StorageConfig::Local {
            dir: env::var("UPLOADS_DIR")
                .unwrap_or_else(|_| "uploads".into())
                .into(),
        }),
        "s3" => Ok(StorageConfig::S3 {
            endpoint: env::var("S3_ENDPOINT").context("S3_ENDPOINT is not set")?,
            bucket: env::var("S3_BUCKET").context("S3_BUCKET is not set")?,
            access_key: env::var("S3_ACCESS_KEY").context("S3_ACCESS_KEY is not set")?,
            secret_key: env::var("S3_SECRET_KEY").context("S3_SECRET_KEY is not set")?,
            region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            public_url: env::var("S3_PUBLIC_URL").ok(),
        }),
        other => anyhow::bail!("unknown STORAGE_BACKEND {other:?}, expected local or s3"),
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e| {
            warn!("Invalid {key} value: {e}");
            anyhow::anyhow!("invalid {key}: {e}")
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
