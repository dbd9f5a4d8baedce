use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

use crate::player::PlayerOptions;

const MAX_EMPTY_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub guild_id: Option<u64>, // Para comandos de desarrollo

    // Paths
    pub cache_dir: PathBuf,

    // Sesiones
    pub deafen_on_join: bool,
    pub leave_on_empty: bool,
    pub empty_timeout: Duration,

    // Caché
    pub cache_enabled: bool,
    pub cache_namespace: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN")?,
            guild_id: std::env::var("GUILD_ID").ok().and_then(|s| s.parse().ok()),

            // Paths
            cache_dir: std::env::var("CACHE_DIR")
                .unwrap_or_else(|_| "/app/cache".to_string())
                .into(),

            // Sesiones
            deafen_on_join: std::env::var("DEAFEN_ON_JOIN")
                .unwrap_or_else(|_| "false".to_string())
                .parse()?,
            leave_on_empty: std::env::var("LEAVE_ON_EMPTY")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,
            empty_timeout: humantime::parse_duration(
                &std::env::var("EMPTY_TIMEOUT").unwrap_or_else(|_| "0s".to_string()),
            )?,

            // Caché
            cache_enabled: std::env::var("CACHE_ENABLED")
                .unwrap_or_else(|_| "false".to_string())
                .parse()?,
            cache_namespace: std::env::var("CACHE_NAMESPACE")
                .unwrap_or_else(|_| "lookups".to_string()),
        };

        if config.cache_enabled {
            std::fs::create_dir_all(&config.cache_dir)?;
        }

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - The Discord token must be present
    /// - The empty-channel timeout must not exceed 24 hours
    /// - The cache namespace must be a plain, non-empty file name
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("DISCORD_TOKEN must not be empty");
        }

        if self.empty_timeout > MAX_EMPTY_TIMEOUT {
            anyhow::bail!(
                "Empty channel timeout cannot exceed 24h, got: {}",
                humantime::format_duration(self.empty_timeout)
            );
        }

        if self.cache_namespace.is_empty()
            || self.cache_namespace.contains(&['/', '\\'][..])
            || self.cache_namespace.starts_with('.')
        {
            anyhow::bail!("Invalid cache namespace: {:?}", self.cache_namespace);
        }

        Ok(())
    }

    /// Process-wide defaults every queue starts from.
    pub fn player_options(&self) -> PlayerOptions {
        PlayerOptions {
            deafen_on_join: self.deafen_on_join,
            leave_on_empty: self.leave_on_empty,
            timeout: self.empty_timeout,
            cache: self.cache_enabled,
            cache_path: Some(self.cache_dir.clone()),
        }
    }

    /// Returns a summary of the current configuration for logging, without
    /// the token.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: guild {}\n  \
            Sessions: deafen_on_join={}, leave_on_empty={}, timeout={}\n  \
            Cache: enabled={}, {}/{}.json",
            self.guild_id
                .map_or("global".to_string(), |id| id.to_string()),
            self.deafen_on_join,
            self.leave_on_empty,
            humantime::format_duration(self.empty_timeout),
            self.cache_enabled,
            self.cache_dir.display(),
            self.cache_namespace
        )
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),
            guild_id: None,

            // Path defaults
            cache_dir: "/app/cache".into(),

            // Session defaults
            deafen_on_join: false,
            leave_on_empty: true,
            empty_timeout: Duration::ZERO,

            // Cache defaults
            cache_enabled: false,
            cache_namespace: "lookups".to_string(),
        }
    }
}
