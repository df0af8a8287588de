use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::core::QuotaPolicy;
use crate::models::ScoringWeights;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub quota: QuotaSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

/// Candidate-pool cache. Off unless `enabled` is set
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Without a URL the cache runs in-process only
    pub redis_url: Option<String>,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_limit")]
    pub default_limit: u16,
    #[serde(default = "default_max_limit")]
    pub max_limit: u16,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_limit() -> u16 { 20 }
fn default_max_limit() -> u16 { 100 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_same_school_weight")]
    pub same_school: f64,
    #[serde(default = "default_premium_weight")]
    pub premium: f64,
    #[serde(default = "default_distance_weight")]
    pub distance: f64,
    #[serde(default = "default_distance_falloff_km")]
    pub distance_falloff_km: f64,
    #[serde(default = "default_near_threshold_km")]
    pub near_threshold_km: f64,
    #[serde(default = "default_same_location_weight")]
    pub same_location: f64,
    #[serde(default = "default_per_shared_interest")]
    pub per_shared_interest: f64,
    #[serde(default = "default_max_interest_bonus")]
    pub max_interest_bonus: f64,
    #[serde(default = "default_similar_age_weight")]
    pub similar_age: f64,
    #[serde(default = "default_similar_age_years")]
    pub similar_age_years: u8,
    #[serde(default = "default_liked_you_boost")]
    pub liked_you_boost: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            same_school: default_same_school_weight(),
            premium: default_premium_weight(),
            distance: default_distance_weight(),
            distance_falloff_km: default_distance_falloff_km(),
            near_threshold_km: default_near_threshold_km(),
            same_location: default_same_location_weight(),
            per_shared_interest: default_per_shared_interest(),
            max_interest_bonus: default_max_interest_bonus(),
            similar_age: default_similar_age_weight(),
            similar_age_years: default_similar_age_years(),
            liked_you_boost: default_liked_you_boost(),
        }
    }
}

impl From<&WeightsConfig> for ScoringWeights {
    fn from(value: &WeightsConfig) -> Self {
        ScoringWeights {
            same_school: value.same_school,
            premium: value.premium,
            distance: value.distance,
            distance_falloff_km: value.distance_falloff_km,
            near_threshold_km: value.near_threshold_km,
            same_location: value.same_location,
            per_shared_interest: value.per_shared_interest,
            max_interest_bonus: value.max_interest_bonus,
            similar_age: value.similar_age,
            similar_age_years: value.similar_age_years,
            liked_you_boost: value.liked_you_boost,
        }
    }
}

fn default_same_school_weight() -> f64 { 100.0 }
fn default_premium_weight() -> f64 { 50.0 }
fn default_distance_weight() -> f64 { 40.0 }
fn default_distance_falloff_km() -> f64 { 20.0 }
fn default_near_threshold_km() -> f64 { 5.0 }
fn default_same_location_weight() -> f64 { 30.0 }
fn default_per_shared_interest() -> f64 { 5.0 }
fn default_max_interest_bonus() -> f64 { 25.0 }
fn default_similar_age_weight() -> f64 { 10.0 }
fn default_similar_age_years() -> u8 { 2 }
fn default_liked_you_boost() -> f64 { 200.0 }

#[derive(Debug, Clone, Deserialize)]
pub struct QuotaSettings {
    #[serde(default = "default_free_daily_limit")]
    pub free_daily_limit: u32,
    #[serde(default = "default_premium_daily_limit")]
    pub premium_daily_limit: u32,
    /// Offset from UTC, in minutes, of the day boundary
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for QuotaSettings {
    fn default() -> Self {
        Self {
            free_daily_limit: default_free_daily_limit(),
            premium_daily_limit: default_premium_daily_limit(),
            utc_offset_minutes: 0,
        }
    }
}

impl QuotaSettings {
    pub fn policy(&self) -> QuotaPolicy {
        QuotaPolicy::new(self.free_daily_limit, self.premium_daily_limit, self.utc_offset_minutes)
    }
}

fn default_free_daily_limit() -> u32 { 5 }
fn default_premium_daily_limit() -> u32 { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with STUDYBUDDY__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., STUDYBUDDY__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("STUDYBUDDY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings = apply_database_url(settings, std::env::var("DATABASE_URL").ok())?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("STUDYBUDDY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// `DATABASE_URL` wins over the configured database URL when set
fn apply_database_url(settings: Config, database_url: Option<String>) -> Result<Config, ConfigError> {
    match database_url {
        Some(url) => Config::builder()
            .add_source(settings)
            .set_override("database.url", url)?
            .build(),
        None => Ok(settings),
    }
}
