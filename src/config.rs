use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;

/// Which denominators turn raw correct-counts into section scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DenominatorPolicy {
    /// The scored modules' own question counts.
    #[default]
    QuestionCount,
    /// Fixed bank sizes from the first question bank: 27/54 english, 22/44 math.
    Legacy,
}

impl FromStr for DenominatorPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "question_count" => Ok(DenominatorPolicy::QuestionCount),
            "legacy" => Ok(DenominatorPolicy::Legacy),
            other => Err(format!("expected question_count or legacy, got {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected pretty or json, got {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub public_rps: u32,
    pub admin_rps: u32,
    pub payment_delay_ms: u64,
    pub score_denominators: DenominatorPolicy,
    pub log_format: LogFormat,
    pub cors_origins: Vec<String>,
    pub media_dir: String,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env_or("SERVER_ADDRESS", "0.0.0.0:8000"),
            database_url: get_env("DATABASE_URL")?,
            db_max_connections: get_env_parse_or("DB_MAX_CONNECTIONS", 20)?,
            jwt_secret: get_env("JWT_SECRET")?,
            public_rps: get_env_parse_or("PUBLIC_RPS", 20)?,
            admin_rps: get_env_parse_or("ADMIN_RPS", 50)?,
            payment_delay_ms: get_env_parse_or("PAYMENT_DELAY_MS", 2000)?,
            score_denominators: get_env_parse_or(
                "SCORE_DENOMINATORS",
                DenominatorPolicy::QuestionCount,
            )?,
            log_format: get_env_parse_or("LOG_FORMAT", LogFormat::Pretty)?,
            cors_origins: parse_list(&get_env_or("CORS_ORIGINS", "*")),
            media_dir: get_env_or("MEDIA_DIR", "media"),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
