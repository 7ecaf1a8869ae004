use std::{collections::HashMap, fmt::Display, str::FromStr};

use anyhow::{anyhow, Context};

/// Runtime settings, read from the process environment (after `.env` is merged).
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub frontend_url: Option<String>,
    pub rate_limit_per_second: u64,
    pub firebase: FirebaseConfig,
    pub cloudinary: CloudinaryConfig,
}

#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub project_id: String,
    pub api_key: String,
}

/// Media host settings. Any of them may be missing; signing then refuses to run
/// and bare media keys are stored unexpanded.
#[derive(Debug, Clone, Default)]
pub struct CloudinaryConfig {
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

pub fn merge_dotenv() {
    if let Err(err) = dotenv::dotenv() {
        log::debug!("No .env file loaded: {}", err);
    }
}

impl Config {
    pub fn from_env(vars: HashMap<String, String>) -> anyhow::Result<Self> {
        let env = EnvVars(vars);

        Ok(Self {
            port: env.parse_or("PORT", 4000)?,
            database_url: env
                .get("DATABASE_URL")
                .unwrap_or_else(|| "sqlite:orbyt.db?mode=rwc".to_string()),
            database_max_connections: env.parse_or("DATABASE_MAX_CONNECTIONS", 5)?,
            frontend_url: env.get("FRONTEND_URL"),
            rate_limit_per_second: env.parse_or("RATE_LIMIT_PER_SECOND", 50)?,
            firebase: FirebaseConfig {
                project_id: env.require("FIREBASE_PROJECT_ID")?,
                api_key: env.require("FIREBASE_API_KEY")?,
            },
            cloudinary: CloudinaryConfig {
                cloud_name: env.get("CLOUDINARY_CLOUD_NAME"),
                api_key: env.get("CLOUDINARY_API_KEY"),
                api_secret: env.get("CLOUDINARY_API_SECRET"),
            },
        })
    }
}

struct EnvVars(HashMap<String, String>);

impl EnvVars {
    /// Blank values count as unset.
    fn get(&self, key: &str) -> Option<String> {
        self.0
            .get(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn require(&self, key: &str) -> anyhow::Result<String> {
        self.get(key)
            .ok_or_else(|| anyhow!("Environment variable {key} must be set"))
    }

    fn parse_or<T>(&self, key: &str, default: T) -> anyhow::Result<T>
    where
        T: FromStr + Display,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.get(key) {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("Invalid {key} value: {raw}")),
            None => {
                log::info!("{key} not set, using default: {default}");
                Ok(default)
            }
        }
    }
}
