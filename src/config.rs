use anyhow::{anyhow, Context, Result};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.themoviedb.org/3";
const DEFAULT_LANGUAGE: &str = "en-US";
const DEFAULT_BRANCH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_BIND: &str = "0.0.0.0:3146";

#[derive(Clone)]
pub struct TmdbConfig {
    pub api_token: String,
    pub base_url: String,
    pub language: String,
}

// Keep the token out of logs.
impl std::fmt::Debug for TmdbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TmdbConfig")
            .field("api_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("language", &self.language)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub tmdb: TmdbConfig,
    pub branch_timeout: Duration,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_token = get("TMDB_API_TOKEN")
            .ok_or_else(|| anyhow!("Missing required environment variable: TMDB_API_TOKEN"))?;
        let base_url = get("TMDB_API_BASE")
            .map(|b| b.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let language = get("TMDB_LANGUAGE").unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        let timeout_secs = match get("TMDB_BRANCH_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .parse()
                    .with_context(|| format!("TMDB_BRANCH_TIMEOUT_SECS is not a number: {raw}"))?;
                if secs == 0 {
                    anyhow::bail!("TMDB_BRANCH_TIMEOUT_SECS must be greater than zero");
                }
                secs
            }
            None => DEFAULT_BRANCH_TIMEOUT_SECS,
        };

        let bind_raw = get("CINEDECK_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr: SocketAddr = bind_raw
            .parse()
            .with_context(|| format!("CINEDECK_BIND is not a socket address: {bind_raw}"))?;

        Ok(Self {
            tmdb: TmdbConfig {
                api_token,
                base_url,
                language,
            },
            branch_timeout: Duration::from_secs(timeout_secs),
            bind_addr,
        })
    }
}
