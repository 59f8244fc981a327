use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{anyhow, Context};
use tracing::{debug, info};

use crate::session::ExpiryPolicy;

pub const DEFAULT_GRAPHQL_URL: &str = "https://learn.reboot01.com/api/graphql-engine/v1/graphql";
pub const DEFAULT_AUTH_URL: &str = "https://learn.reboot01.com/api/auth/signin";
pub const DEFAULT_EVENT_ID: i64 = 72;

#[derive(Debug, Clone)]
pub struct Config {
    pub graphql_url: String,
    pub auth_url: String,
    pub event_id: i64,
    pub expiry_policy: ExpiryPolicy,
    pub http_timeout: Option<Duration>,
    pub session_file: PathBuf,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let timeout_secs: Option<u64> = optional("DASHBOARD_HTTP_TIMEOUT_SECS")?;
        let session_file = match env::var("DASHBOARD_SESSION_FILE") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_session_file(),
        };

        Ok(Self {
            graphql_url: try_load("DASHBOARD_GRAPHQL_URL", DEFAULT_GRAPHQL_URL)?,
            auth_url: try_load("DASHBOARD_AUTH_URL", DEFAULT_AUTH_URL)?,
            event_id: try_load("DASHBOARD_EVENT_ID", &DEFAULT_EVENT_ID.to_string())?,
            expiry_policy: try_load("DASHBOARD_EXPIRY_POLICY", "surface")?,
            http_timeout: timeout_secs.map(Duration::from_secs),
            session_file,
        })
    }

    /// Endpoints pointed at a local server, used by transport tests.
    #[cfg(test)]
    pub fn for_base_url(base: &str, session_file: PathBuf) -> Self {
        Self {
            graphql_url: format!("{base}/graphql"),
            auth_url: format!("{base}/auth/signin"),
            event_id: DEFAULT_EVENT_ID,
            expiry_policy: ExpiryPolicy::Surface,
            http_timeout: None,
            session_file,
        }
    }
}

fn default_session_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("progress-dashboard")
        .join("session.json")
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        debug!("{key} not set, using default: {default}");
        default.to_string()
    });
    parse(key, &raw)
}

fn optional<T: FromStr>(key: &str) -> anyhow::Result<Option<T>>
where
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => {
            info!("{key} set to {raw}");
            parse(key, &raw).map(Some)
        }
        Err(_) => Ok(None),
    }
}

fn parse<T: FromStr>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("{e}"))
        .with_context(|| format!("invalid {key} value: {raw}"))
}
