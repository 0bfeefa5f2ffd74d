use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder secrets that must never sign production cookies.
const PLACEHOLDER_SECRETS: &[&str] = &["thisshouldbeabettersecret", "change-me", "dev-secret-change-me"];

const DEV_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub production: bool,
    pub database_path: PathBuf,
    pub secret: String,
    pub map_token: Option<String>,
    pub addr: SocketAddr,
    pub public_dir: PathBuf,
}

impl Config {
    /// Reads the process environment, loading `.env` first outside production.
    pub fn from_env() -> Result<Self> {
        let production = is_production(std::env::var("WANDERWORLD_ENV").ok().as_deref());
        if !production {
            let _ = dotenvy::dotenv();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let production = is_production(var("WANDERWORLD_ENV").as_deref());

        let secret = match var("SECRET") {
            Some(secret) if production && PLACEHOLDER_SECRETS.contains(&secret.as_str()) => {
                bail!("SECRET is still a placeholder value; set a real secret for production")
            }
            Some(secret) => secret,
            None if production => bail!("SECRET must be set in production"),
            None => DEV_SECRET.to_string(),
        };

        let database_path = var("WANDERWORLD_DATABASE_URL")
            .map(|url| url.strip_prefix("sqlite://").unwrap_or(&url).to_string())
            .unwrap_or_else(|| "wanderworld.db".into())
            .into();

        let host = var("WANDERWORLD_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = match var("PORT") {
            Some(port) => port.parse().with_context(|| format!("PORT '{port}' is not a valid port"))?,
            None => 8000,
        };
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("'{host}:{port}' is not a valid listen address"))?;

        Ok(Self {
            production,
            database_path,
            secret,
            map_token: var("MAP_TOKEN"),
            addr,
            public_dir: var("WANDERWORLD_PUBLIC_DIR").unwrap_or_else(|| "public".into()).into(),
        })
    }
}

fn is_production(env: Option<&str>) -> bool {
    env.is_some_and(|env| env.trim().eq_ignore_ascii_case("production"))
}
