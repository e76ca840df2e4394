use anyhow::Context;
use serde::Deserialize;

use crate::analytics::macros::MacroTarget;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    /// Used when neither the request nor the user's goal row supplies a target.
    pub default_target: MacroTarget,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "fitpulse".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "fitpulse-users".into()),
        };
        let default_target = MacroTarget {
            calories: env_f64("DEFAULT_TARGET_CALORIES", 2000.0)?,
            protein: env_f64("DEFAULT_TARGET_PROTEIN", 150.0)?,
            carbs: env_f64("DEFAULT_TARGET_CARBS", 250.0)?,
            fat: env_f64("DEFAULT_TARGET_FAT", 75.0)?,
        };
        default_target.validate()?;
        Ok(Self {
            database_url,
            jwt,
            default_target,
        })
    }
}

fn env_f64(key: &str, default: f64) -> anyhow::Result<f64> {
    parse_f64(key, std::env::var(key).ok(), default)
}

/// Unset falls back to `default`; set but unparsable is an error.
fn parse_f64(key: &str, raw: Option<String>, default: f64) -> anyhow::Result<f64> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse::<f64>()
            .with_context(|| format!("parse {}", key)),
    }
}
