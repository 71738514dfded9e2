//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.feedboard.toml` files. The resulting [`Config`] is built once in
//! `main` and each API client receives its own section.

use crate::models::{Condition, IconTable};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = ".feedboard.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Weather dashboard settings.
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Quote service settings.
    #[serde(default)]
    pub quotes: QuotesConfig,

    /// News CMS settings.
    #[serde(default)]
    pub news: NewsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Per-request timeout in seconds, applied to every client.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}

/// WeatherAPI.com settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// API base URL.
    #[serde(default = "default_weather_url")]
    pub base_url: String,

    /// API key. Usually supplied through `FEEDBOARD_WEATHER_KEY`.
    #[serde(default)]
    pub api_key: String,

    /// Country appended to every city query.
    #[serde(default = "default_country")]
    pub country: String,

    /// Cities shown on the dashboard, in display order.
    #[serde(default = "default_cities")]
    pub cities: Vec<String>,

    /// Degrees added/subtracted from the current temperature for highs/lows.
    #[serde(default = "default_spread")]
    pub spread_degrees: f64,

    /// Asset shown for unrecognised conditions.
    #[serde(default = "default_fallback_icon")]
    pub fallback_icon: String,

    /// Per-condition icon overrides, keyed like `partly_cloudy_night`.
    #[serde(default)]
    pub icons: BTreeMap<String, String>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_url(),
            api_key: String::new(),
            country: default_country(),
            cities: default_cities(),
            spread_degrees: default_spread(),
            fallback_icon: default_fallback_icon(),
            icons: BTreeMap::new(),
        }
    }
}

fn default_weather_url() -> String {
    "https://api.weatherapi.com/v1".to_string()
}

fn default_country() -> String {
    "Uganda".to_string()
}

fn default_cities() -> Vec<String> {
    vec![
        "Kampala",
        "Entebbe",
        "Jinja",
        "Mbale",
        "Gulu",
        "Lira",
        "Mbarara",
        "Fort Portal",
        "Masaka",
        "Arua",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_spread() -> f64 {
    3.0
}

fn default_fallback_icon() -> String {
    IconTable::default().fallback
}

impl WeatherConfig {
    /// Build the icon table from the defaults plus configured overrides.
    pub fn icon_table(&self) -> IconTable {
        let overrides = self.icons.iter().filter_map(|(key, icon)| {
            match Condition::from_key(key) {
                Some(condition) => Some((condition, icon.clone())),
                None => {
                    warn!("Ignoring icon for unknown condition '{}'", key);
                    None
                }
            }
        });

        let mut table = IconTable::default().with_overrides(overrides);
        table.fallback = self.fallback_icon.clone();
        table
    }
}

/// Quote service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotesConfig {
    /// API base URL.
    #[serde(default = "default_quotes_url")]
    pub base_url: String,
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            base_url: default_quotes_url(),
        }
    }
}

fn default_quotes_url() -> String {
    "https://dummyjson.com".to_string()
}

/// Strapi news CMS settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    /// REST API base URL.
    #[serde(default = "default_news_url")]
    pub base_url: String,

    /// Base URL prepended to media paths such as cover images.
    #[serde(default = "default_media_url")]
    pub media_base_url: String,

    /// Static bearer token. Usually supplied through `FEEDBOARD_NEWS_TOKEN`.
    #[serde(default)]
    pub api_token: String,

    /// Posts per feed page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            base_url: default_news_url(),
            media_base_url: default_media_url(),
            api_token: String::new(),
            page_size: default_page_size(),
        }
    }
}

fn default_news_url() -> String {
    "http://localhost:1337/api".to_string()
}

fn default_media_url() -> String {
    "http://localhost:1337".to_string()
}

fn default_page_size() -> u32 {
    6
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from `dir/.feedboard.toml`.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE_NAME);

        if path.exists() {
            Ok(Some(Self::load(&path)?))
        } else {
            Ok(None)
        }
    }

    /// Try to load configuration from the current directory.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(timeout) = args.timeout {
            self.general.timeout_seconds = timeout;
        }

        if args.verbose {
            self.general.verbose = true;
        }

        if let Some(ref key) = args.weather_key {
            self.weather.api_key = key.clone();
        }

        if let Some(ref token) = args.news_token {
            self.news.api_token = token.clone();
        }

        if let crate::cli::Command::Weather {
            ref cities,
            ref country,
        } = args.command
        {
            if !cities.is_empty() {
                self.weather.cities = cities.clone();
            }
            if let Some(country) = country {
                self.weather.country = country.clone();
            }
        }
    }

    /// Check that the merged configuration is usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.general.timeout_seconds == 0 {
            return Err("Timeout must be at least 1 second".to_string());
        }

        for (name, url) in [
            ("weather.base_url", &self.weather.base_url),
            ("quotes.base_url", &self.quotes.base_url),
            ("news.base_url", &self.news.base_url),
            ("news.media_base_url", &self.news.media_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("{} must start with 'http://' or 'https://'", name));
            }
        }

        if self.news.page_size == 0 {
            return Err("news.page_size must be at least 1".to_string());
        }

        if !self.weather.spread_degrees.is_finite() || self.weather.spread_degrees < 0.0 {
            return Err("weather.spread_degrees must be a non-negative number".to_string());
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
