use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::Url;

use coinbank_api::oauth::{
    DISCORD_AUTHORIZE_URL, DISCORD_IDENTIFY_SCOPE, DISCORD_PROFILE_URL, DISCORD_TOKEN_URL,
    OAuthSettings,
};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me", "secret"];

/// Upper bound for token and login state lifetimes: ten years.
const MAX_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub static_dir: PathBuf,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub enforce_account_match: bool,
    pub oauth: OAuthSettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = var("COINBANK_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("COINBANK_JWT_SECRET is unset or still a placeholder");
        }

        let client_id = var("COINBANK_CLIENT_ID").context("COINBANK_CLIENT_ID is not set")?;
        let client_secret = var("COINBANK_CLIENT_SECRET").context("COINBANK_CLIENT_SECRET is not set")?;

        let token_ttl_secs: i64 = parse(&var, "COINBANK_TOKEN_TTL_SECS", 15_000)?;
        let timeout_secs: u64 = parse(&var, "COINBANK_OAUTH_TIMEOUT_SECS", 5)?;
        let state_ttl_secs: i64 = parse(&var, "COINBANK_LOGIN_STATE_TTL_SECS", 600)?;
        if timeout_secs == 0 {
            bail!("COINBANK_OAUTH_TIMEOUT_SECS must be positive");
        }
        let token_ttl = ttl("COINBANK_TOKEN_TTL_SECS", token_ttl_secs)?;
        let state_ttl = ttl("COINBANK_LOGIN_STATE_TTL_SECS", state_ttl_secs)?;

        let oauth = OAuthSettings {
            client_id,
            client_secret,
            redirect_url: or("COINBANK_REDIRECT_URL", "http://localhost:3000/auth/callback"),
            authorize_url: url(&or("COINBANK_OAUTH_AUTHORIZE_URL", DISCORD_AUTHORIZE_URL))?,
            token_url: url(&or("COINBANK_OAUTH_TOKEN_URL", DISCORD_TOKEN_URL))?,
            profile_url: url(&or("COINBANK_OAUTH_PROFILE_URL", DISCORD_PROFILE_URL))?,
            scope: or("COINBANK_OAUTH_SCOPE", DISCORD_IDENTIFY_SCOPE),
            timeout: Duration::from_secs(timeout_secs),
            state_ttl,
        };
        url(&oauth.redirect_url)?;

        Ok(Self {
            host: or("COINBANK_HOST", "0.0.0.0"),
            port: parse(&var, "COINBANK_PORT", 3000)?,
            db_path: or("COINBANK_DB_PATH", "coinbank.db").into(),
            static_dir: or("COINBANK_STATIC_DIR", "./static").into(),
            jwt_secret,
            token_ttl,
            enforce_account_match: parse(&var, "COINBANK_ENFORCE_ACCOUNT_MATCH", false)?,
            oauth,
        })
    }
}

fn parse<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}

fn ttl(key: &str, secs: i64) -> Result<chrono::Duration> {
    if !(1..=MAX_TTL_SECS).contains(&secs) {
        bail!("{} must be between 1 and {} seconds, got {}", key, MAX_TTL_SECS, secs);
    }
    chrono::Duration::try_seconds(secs).with_context(|| format!("{} is out of range: {}", key, secs))
}

fn url(raw: &str) -> Result<Url> {
    Url::parse(raw).with_context(|| format!("invalid URL: {}", raw))
}
